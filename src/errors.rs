pub type Result<T> = core::result::Result<T, Error>;

/// Error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A cursor or substring operation walked past the end of a buffer.
    OutOfBounds,
    /// A textual hex string contained a non-hexadecimal character.
    InvalidHexString,
    /// A negative big integer was given where only non-negative values
    /// are meaningful.
    NegativeBignum,
    /// A path operation expected at least one '/' in its input.
    NoSlashFound,
    /// A filename did not end with the expected extension.
    BadExtension,

    /// The input is not valid DER.
    DerInvalidFile { reason: String },
    /// An ASN.1 SEQUENCE was expected.
    DerSequenceExpected,
    /// An ASN.1 SET was expected.
    DerSetExpected,
    /// An ASN.1 OBJECT IDENTIFIER was expected.
    DerOidExpected,
    /// A certificate-level structure could not be interpreted.
    InvalidCertificate { reason: String },

    /// Invalid cryptographic parameters.
    BadParameter { reason: String },
    /// The persistent generator state file could not be read or written.
    PrngState { path: String },
    /// A cryptographic invariant was violated; the operation must abort.
    InternalMayhem { reason: String },

    /// The functionality is deliberately not supported.
    NotImplemented { reason: String },
    /// A condition that should be unreachable was reached.
    Unexpected { reason: String },
    /// An error of unknown origin.
    Unknown,
}

impl std::error::Error for Error {}
impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Error::OutOfBounds => write!(f, "out of bounds buffer operation"),
            Error::InvalidHexString => write!(f, "invalid hexadecimal string"),
            Error::NegativeBignum => write!(f, "negative big integer"),
            Error::NoSlashFound => write!(f, "no '/' found in path"),
            Error::BadExtension => write!(f, "unexpected file extension"),
            Error::DerInvalidFile { reason } => write!(f, "invalid DER: {}", reason),
            Error::DerSequenceExpected => write!(f, "DER sequence expected"),
            Error::DerSetExpected => write!(f, "DER set expected"),
            Error::DerOidExpected => write!(f, "DER object identifier expected"),
            Error::InvalidCertificate { reason } => write!(f, "invalid certificate: {}", reason),
            Error::BadParameter { reason } => write!(f, "bad parameter: {}", reason),
            Error::PrngState { path } => write!(f, "generator state file error: {}", path),
            Error::InternalMayhem { reason } => write!(f, "internal mayhem: {}", reason),
            Error::NotImplemented { reason } => write!(f, "not implemented: {}", reason),
            Error::Unexpected { reason } => write!(f, "unexpected error: {}", reason),
            Error::Unknown => write!(f, "unknown error"),
        }
    }
}

impl Error {
    pub(crate) fn bad_parameter(reason: &str) -> Self {
        Error::BadParameter {
            reason: reason.into(),
        }
    }

    pub(crate) fn mayhem(reason: &str) -> Self {
        Error::InternalMayhem {
            reason: reason.into(),
        }
    }

    pub(crate) fn not_implemented(reason: &str) -> Self {
        Error::NotImplemented {
            reason: reason.into(),
        }
    }

    pub(crate) fn unexpected(reason: &str) -> Self {
        Error::Unexpected {
            reason: reason.into(),
        }
    }

    pub(crate) fn der_invalid(reason: &str) -> Self {
        Error::DerInvalidFile {
            reason: reason.into(),
        }
    }
}
