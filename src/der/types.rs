//! Typed wrappers over the raw TLV layer: integers, algorithm
//! identifiers, distinguished names, validity windows and extensions.

use num_bigint::BigUint;

use crate::buffer::SecBuf;
use crate::der::oid::{self, Expected, OidEntry};
use crate::der::{
    date_to_string, decapsulate, encapsulate, Class, Method, Node, B_FALSE, B_TRUE, T_BOOL,
    T_IA5_STR, T_INT, T_NULL, T_OCTET_STR, T_OID, T_PRINTABLE_STR, T_SEQ, T_SET, T_T61_STR,
    T_UTC_TIME, T_UTF8_STR,
};
use crate::errors::{Error, Result};
use crate::hash::HashAlgo;

/// A DER INTEGER holding a non-negative big integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asn1Integer {
    pub node: Node,
}

impl Asn1Integer {
    pub fn from_biguint(n: &BigUint) -> Self {
        let bytes = n.to_bytes_be();
        let value = if bytes[0] & 0x80 != 0 {
            let mut padded = Vec::with_capacity(bytes.len() + 1);
            padded.push(0);
            padded.extend_from_slice(&bytes);
            SecBuf::from(padded)
        } else {
            SecBuf::from(bytes)
        };

        Asn1Integer {
            node: Node {
                class: Class::Universal,
                method: Method::Primitive,
                tag: T_INT,
                value,
            },
        }
    }

    /// Uses `raw` as the content octets without normalisation.
    pub fn from_raw(raw: SecBuf) -> Self {
        Asn1Integer {
            node: Node {
                class: Class::Universal,
                method: Method::Primitive,
                tag: T_INT,
                value: raw,
            },
        }
    }

    pub fn to_der(&self) -> SecBuf {
        self.node.to_der()
    }
}

/// An (OBJECT IDENTIFIER, value) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asn1Object {
    pub object_type: Node,
    pub object: Node,
}

impl Asn1Object {
    pub fn new(entry: &OidEntry, value: &[u8], tag: u8) -> Self {
        Asn1Object {
            object_type: Node::new(
                Class::Universal,
                Method::Primitive,
                T_OID,
                SecBuf::from(entry.bytes),
            ),
            object: Node::new(Class::Universal, Method::Primitive, tag, SecBuf::from(value)),
        }
    }

    /// Parses the pair and, when the OID is known, checks that the value
    /// element has the kind the tables expect after it.
    pub fn parse(src: &mut SecBuf) -> Result<Self> {
        let object_type = Node::expect(
            src,
            Class::Universal,
            Method::Primitive,
            T_OID,
            Error::DerOidExpected,
        )?;
        let object = Node::parse(src)?;

        if let Some(entry) = oid::lookup(object_type.value.as_bytes()) {
            let is_universal_primitive =
                object.class == Class::Universal && object.method == Method::Primitive;
            match entry.expected {
                Expected::Null => {
                    if !is_universal_primitive || object.tag != T_NULL {
                        return Err(Error::der_invalid("null object expected"));
                    }
                }
                Expected::Str => {
                    let string_tag = matches!(
                        object.tag,
                        T_PRINTABLE_STR | T_IA5_STR | T_T61_STR | T_UTF8_STR
                    );
                    if !is_universal_primitive || !string_tag {
                        return Err(Error::der_invalid("character string object expected"));
                    }
                }
                Expected::OctetString => {
                    return Err(Error::not_implemented(
                        "parsing an object with an octet string payload",
                    ));
                }
            }
        }

        Ok(Asn1Object {
            object_type,
            object,
        })
    }

    pub fn to_der(&self) -> SecBuf {
        &self.object_type.to_der() + &self.object.to_der()
    }

    pub fn display(&self) -> Result<String> {
        Ok(format!(
            "{} : {}",
            self.object_type.display()?,
            self.object.display()?
        ))
    }
}

/// Signature algorithms: a hash paired with RSA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignAlgo {
    Sha1WithRsa,
    Sha256WithRsa,
    Sha512WithRsa,
}

/// Public-key algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PubKeyAlgo {
    Rsa,
}

impl SignAlgo {
    fn index(self) -> usize {
        match self {
            SignAlgo::Sha1WithRsa => 0,
            SignAlgo::Sha256WithRsa => 1,
            SignAlgo::Sha512WithRsa => 2,
        }
    }

    /// The hash component of the signature algorithm.
    pub fn hash(self) -> HashAlgo {
        match self {
            SignAlgo::Sha1WithRsa => HashAlgo::Sha1,
            SignAlgo::Sha256WithRsa => HashAlgo::Sha256,
            SignAlgo::Sha512WithRsa => HashAlgo::Sha512,
        }
    }

    /// The public-key component of the signature algorithm.
    pub fn pubkey(self) -> PubKeyAlgo {
        PubKeyAlgo::Rsa
    }

    /// Combines a hash and a public-key algorithm.
    pub fn from_parts(hash: HashAlgo, pubkey: PubKeyAlgo) -> Result<SignAlgo> {
        match pubkey {
            PubKeyAlgo::Rsa => match hash {
                HashAlgo::Sha1 => Ok(SignAlgo::Sha1WithRsa),
                HashAlgo::Sha256 => Ok(SignAlgo::Sha256WithRsa),
                HashAlgo::Sha512 => Ok(SignAlgo::Sha512WithRsa),
                HashAlgo::Sha384 => Err(Error::not_implemented(
                    "no signature algorithm pairs SHA-384 with RSA here",
                )),
            },
        }
    }
}

/// AlgorithmIdentifier body for a signature algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asn1SignAlgo {
    pub object: Asn1Object,
    pub algo: SignAlgo,
}

impl Asn1SignAlgo {
    pub fn new(algo: SignAlgo) -> Self {
        Asn1SignAlgo {
            object: Asn1Object::new(&oid::SIGN_ALGO_OIDS[algo.index()], &[], T_NULL),
            algo,
        }
    }

    pub fn parse(src: &mut SecBuf) -> Result<Self> {
        let object = Asn1Object::parse(src)?;
        for (i, entry) in oid::SIGN_ALGO_OIDS.iter().enumerate() {
            if object.object_type.value.as_bytes() == entry.bytes {
                let algo = match i {
                    0 => SignAlgo::Sha1WithRsa,
                    1 => SignAlgo::Sha256WithRsa,
                    _ => SignAlgo::Sha512WithRsa,
                };
                return Ok(Asn1SignAlgo { object, algo });
            }
        }
        Err(Error::not_implemented("unknown signature algorithm"))
    }

    pub fn to_der(&self) -> SecBuf {
        self.object.to_der()
    }
}

/// AlgorithmIdentifier body for a bare hash function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asn1HashAlgo {
    pub object: Asn1Object,
    pub algo: HashAlgo,
}

impl Asn1HashAlgo {
    pub fn new(algo: HashAlgo) -> Result<Self> {
        let index = match algo {
            HashAlgo::Sha1 => 0,
            HashAlgo::Sha256 => 1,
            HashAlgo::Sha512 => 2,
            HashAlgo::Sha384 => {
                return Err(Error::not_implemented("no identifier for SHA-384 here"))
            }
        };
        Ok(Asn1HashAlgo {
            object: Asn1Object::new(&oid::HASH_ALGO_OIDS[index], &[], T_NULL),
            algo,
        })
    }

    pub fn parse(src: &mut SecBuf) -> Result<Self> {
        let object = Asn1Object::parse(src)?;
        for (i, entry) in oid::HASH_ALGO_OIDS.iter().enumerate() {
            if object.object_type.value.as_bytes() == entry.bytes {
                let algo = match i {
                    0 => HashAlgo::Sha1,
                    1 => HashAlgo::Sha256,
                    _ => HashAlgo::Sha512,
                };
                return Ok(Asn1HashAlgo { object, algo });
            }
        }
        Err(Error::not_implemented("unknown hash algorithm"))
    }

    pub fn to_der(&self) -> SecBuf {
        self.object.to_der()
    }
}

/// AlgorithmIdentifier body for a public-key algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asn1EncryptAlgo {
    pub object: Asn1Object,
    pub algo: PubKeyAlgo,
}

impl Asn1EncryptAlgo {
    pub fn new(algo: PubKeyAlgo) -> Self {
        let PubKeyAlgo::Rsa = algo;
        Asn1EncryptAlgo {
            object: Asn1Object::new(&oid::PUBKEY_ALGO_OIDS[0], &[], T_NULL),
            algo,
        }
    }

    pub fn parse(src: &mut SecBuf) -> Result<Self> {
        let object = Asn1Object::parse(src)?;
        if object.object_type.value.as_bytes() == oid::PUBKEY_ALGO_OIDS[0].bytes {
            return Ok(Asn1EncryptAlgo {
                object,
                algo: PubKeyAlgo::Rsa,
            });
        }
        Err(Error::not_implemented("unknown public key algorithm"))
    }

    pub fn to_der(&self) -> SecBuf {
        self.object.to_der()
    }
}

/// X.509 version marker: a context-specific [0] wrapper around an
/// INTEGER holding version - 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub node: Node,
    pub version: u8,
}

impl Version {
    fn out_of_range() -> Error {
        Error::InvalidCertificate {
            reason: "only X.509 versions 1 to 3 are accepted".into(),
        }
    }

    pub fn new(version: u8) -> Result<Self> {
        if version == 0 || version > 3 {
            return Err(Self::out_of_range());
        }

        let inner = Node::new(
            Class::Universal,
            Method::Primitive,
            T_INT,
            SecBuf::from(&[version - 1][..]),
        )
        .to_der();

        Ok(Version {
            node: Node {
                class: Class::ContextSpecific,
                method: Method::Constructed,
                tag: 0,
                value: inner,
            },
            version,
        })
    }

    pub fn parse(src: &mut SecBuf) -> Result<Self> {
        let node = Node::expect(
            src,
            Class::ContextSpecific,
            Method::Constructed,
            0,
            Error::InvalidCertificate {
                reason: "the version field is absent".into(),
            },
        )?;

        let mut content = node.value.clone();
        let inner = Node::expect(
            &mut content,
            Class::Universal,
            Method::Primitive,
            T_INT,
            Error::InvalidCertificate {
                reason: "the version field is incorrect".into(),
            },
        )?;
        if inner.value.len() != 1 {
            return Err(Error::InvalidCertificate {
                reason: "the version field is incorrect".into(),
            });
        }

        let version = inner.value.as_bytes()[0].wrapping_add(1);
        if version == 0 || version > 3 {
            return Err(Self::out_of_range());
        }

        Ok(Version { node, version })
    }

    pub fn to_der(&self) -> SecBuf {
        self.node.to_der()
    }

    pub fn display(&self) -> String {
        format!("Version: {}\n", self.version)
    }
}

pub const MAX_DN_ATTRIBUTES: usize = 30;

/// A distinguished name: an ordered list of attribute objects.
#[derive(Debug, Clone, Default)]
pub struct Dn {
    fields: Vec<Asn1Object>,
    unknown_fields: bool,
}

impl Dn {
    pub fn new() -> Self {
        Dn {
            fields: Vec::new(),
            unknown_fields: false,
        }
    }

    fn add(&mut self, object: Asn1Object) -> Result<()> {
        if self.fields.len() >= MAX_DN_ATTRIBUTES {
            return Err(Error::unexpected(
                "the distinguished name holds too many attributes",
            ));
        }
        self.fields.push(object);
        Ok(())
    }

    pub fn add_country(&mut self, value: &[u8], tag: u8) -> Result<()> {
        self.add(Asn1Object::new(&oid::DN_OIDS[oid::DN_COUNTRY], value, tag))
    }

    pub fn add_state(&mut self, value: &[u8], tag: u8) -> Result<()> {
        self.add(Asn1Object::new(&oid::DN_OIDS[oid::DN_STATE], value, tag))
    }

    pub fn add_locality(&mut self, value: &[u8], tag: u8) -> Result<()> {
        self.add(Asn1Object::new(&oid::DN_OIDS[oid::DN_LOCALITY], value, tag))
    }

    pub fn add_organization(&mut self, value: &[u8], tag: u8) -> Result<()> {
        self.add(Asn1Object::new(
            &oid::DN_OIDS[oid::DN_ORGANIZATION],
            value,
            tag,
        ))
    }

    pub fn add_organizational_unit(&mut self, value: &[u8], tag: u8) -> Result<()> {
        self.add(Asn1Object::new(
            &oid::DN_OIDS[oid::DN_ORGANIZATIONAL_UNIT],
            value,
            tag,
        ))
    }

    pub fn add_common_name(&mut self, value: &[u8], tag: u8) -> Result<()> {
        self.add(Asn1Object::new(
            &oid::DN_OIDS[oid::DN_COMMON_NAME],
            value,
            tag,
        ))
    }

    pub fn add_email(&mut self, value: &[u8], tag: u8) -> Result<()> {
        self.add(Asn1Object::new(&oid::DN_OIDS[oid::DN_EMAIL], value, tag))
    }

    /// Parses `SEQUENCE OF SET { SEQUENCE { OID, value } }`. Attributes
    /// with unknown OIDs are skipped and only flagged.
    pub fn parse(src: &mut SecBuf) -> Result<Self> {
        let run = |src: &mut SecBuf| -> Result<Dn> {
            let mut dn = Dn::new();
            let mut content = decapsulate(src, T_SEQ)?;

            while !content.eof() {
                let mut set = decapsulate(&mut content, T_SET)?;
                let mut seq = decapsulate(&mut set, T_SEQ)?;
                let object = Asn1Object::parse(&mut seq)?;

                let known = oid::DN_OIDS
                    .iter()
                    .any(|entry| entry.bytes == object.object_type.value.as_bytes());
                if known {
                    dn.add(object)?;
                } else {
                    dn.unknown_fields = true;
                }
            }
            Ok(dn)
        };

        run(src).map_err(|e| match e {
            Error::DerOidExpected | Error::DerSequenceExpected | Error::DerSetExpected => {
                Error::der_invalid("malformed distinguished name field")
            }
            other => Error::unexpected(&other.to_string()),
        })
    }

    pub fn unknown_fields(&self) -> bool {
        self.unknown_fields
    }

    pub fn fields(&self) -> &[Asn1Object] {
        &self.fields
    }

    pub fn to_der(&self) -> SecBuf {
        let mut body = SecBuf::new();
        for field in &self.fields {
            body += &encapsulate(&encapsulate(&field.to_der(), T_SEQ), T_SET);
        }
        encapsulate(&body, T_SEQ)
    }

    /// RFC 1779 short rendering: `CN=...,O=...,C=...`.
    pub fn to_dn_string(&self) -> String {
        let mut out = String::new();
        for field in &self.fields {
            let oid_bytes = field.object_type.value.as_bytes();
            let prefix = if oid_bytes == oid::DN_OIDS[oid::DN_COMMON_NAME].bytes {
                "CN="
            } else if oid_bytes == oid::DN_OIDS[oid::DN_COUNTRY].bytes {
                "C="
            } else if oid_bytes == oid::DN_OIDS[oid::DN_LOCALITY].bytes {
                "L="
            } else if oid_bytes == oid::DN_OIDS[oid::DN_STATE].bytes {
                "ST="
            } else if oid_bytes == oid::DN_OIDS[oid::DN_ORGANIZATION].bytes {
                "O="
            } else if oid_bytes == oid::DN_OIDS[oid::DN_ORGANIZATIONAL_UNIT].bytes {
                "OU="
            } else if oid_bytes == oid::DN_OIDS[oid::DN_EMAIL].bytes {
                "MAIL="
            } else if oid_bytes == oid::DN_OIDS[oid::DN_DOMAIN_COMPONENT].bytes {
                "DC="
            } else {
                ""
            };

            if !out.is_empty() {
                out.push(',');
            }
            out.push_str(prefix);
            out.push_str(&String::from_utf8_lossy(field.object.value.as_bytes()));
        }
        out
    }

    pub fn display(&self) -> Result<String> {
        let mut out = String::new();
        for field in &self.fields {
            out.push_str("  ");
            out.push_str(&field.display()?);
            out.push('\n');
        }
        if self.unknown_fields {
            out.push_str("  warning: the distinguished name holds uninterpreted attributes\n");
        }
        Ok(out)
    }
}

/// A validity window made of two UTCTime bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validity {
    pub start: SecBuf,
    pub end: SecBuf,
}

impl Validity {
    pub fn new(start: &[u8], end: &[u8]) -> Result<Self> {
        // The pretty printer leaves malformed dates unchanged.
        let start_text = String::from_utf8_lossy(start).into_owned();
        let end_text = String::from_utf8_lossy(end).into_owned();
        if date_to_string(start) == start_text || date_to_string(end) == end_text {
            return Err(Error::unexpected("invalid date format"));
        }

        Ok(Validity {
            start: SecBuf::from(start),
            end: SecBuf::from(end),
        })
    }

    pub fn parse(src: &mut SecBuf) -> Result<Self> {
        let run = |src: &mut SecBuf| -> Result<Validity> {
            let mut seq = decapsulate(src, T_SEQ)?;
            let start = Node::expect(
                &mut seq,
                Class::Universal,
                Method::Primitive,
                T_UTC_TIME,
                Error::InvalidCertificate {
                    reason: "the start of the validity window is incorrect".into(),
                },
            )?;
            let end = Node::expect(
                &mut seq,
                Class::Universal,
                Method::Primitive,
                T_UTC_TIME,
                Error::InvalidCertificate {
                    reason: "the end of the validity window is incorrect".into(),
                },
            )?;
            Ok(Validity {
                start: start.value,
                end: end.value,
            })
        };

        run(src).map_err(|e| match e {
            Error::DerSequenceExpected => Error::der_invalid("invalid validity field"),
            other => Error::unexpected(&other.to_string()),
        })
    }

    pub fn to_der(&self) -> SecBuf {
        let start = Node::new(
            Class::Universal,
            Method::Primitive,
            T_UTC_TIME,
            self.start.clone(),
        );
        let end = Node::new(
            Class::Universal,
            Method::Primitive,
            T_UTC_TIME,
            self.end.clone(),
        );
        encapsulate(&(&start.to_der() + &end.to_der()), T_SEQ)
    }

    pub fn display(&self) -> String {
        format!(
            "Validity window:\n  not before {}\n  not after {}\n",
            date_to_string(self.start.as_bytes()),
            date_to_string(self.end.as_bytes())
        )
    }
}

/// An X.509 extension: OID, optional criticality, value wrapped in an
/// OCTET STRING.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub extn_id: Node,
    pub critical: Option<bool>,
    pub extn_value: Node,
}

impl Extension {
    pub fn new(extn_id: Node, critical: Option<bool>, value: &Node) -> Self {
        Extension {
            extn_id,
            critical,
            extn_value: Node::new(
                Class::Universal,
                Method::Primitive,
                T_OCTET_STR,
                value.to_der(),
            ),
        }
    }

    pub fn to_der(&self) -> SecBuf {
        let mut body = self.extn_id.to_der();
        if let Some(critical) = self.critical {
            let content = if critical { B_TRUE } else { B_FALSE };
            body += &Node::new(
                Class::Universal,
                Method::Primitive,
                T_BOOL,
                SecBuf::from(&[content][..]),
            )
            .to_der();
        }
        body += &self.extn_value.to_der();

        encapsulate(&body, T_SEQ)
    }

    pub fn display(&self) -> Result<String> {
        let mut out = String::from("  ");
        out.push_str(&self.extn_id.display()?);
        match self.critical {
            Some(true) => out.push_str(" (critical) : "),
            Some(false) => out.push_str(" (not critical) : "),
            None => out.push_str(" : "),
        }
        out.push_str(&self.extn_value.display()?);
        Ok(out)
    }
}

/// Encodes a flags word of `length` significant bits as BIT STRING
/// content octets: unused-bit count, then the flags with bit 0 of the
/// word mapped to the first transmitted bit.
pub fn flags_to_bit_string(flags: u32, length: usize) -> Result<SecBuf> {
    if length > 32 {
        return Err(Error::unexpected("a flags word holds at most 32 bits"));
    }

    let mut significant = length;
    while significant > 0 && flags & (1 << (significant - 1)) == 0 {
        significant -= 1;
    }
    let padding = (8 - significant % 8) % 8;

    let mut packed: u32 = 0;
    for i in (1..=significant).rev() {
        if flags & (1 << (i - 1)) != 0 {
            packed |= 1 << (padding + significant - i);
        }
    }

    let content_len = 1 + (significant + padding) / 8;
    let mut out = Vec::with_capacity(content_len);
    out.push(padding as u8);
    let packed_bytes = packed.to_le_bytes();
    for i in (0..content_len - 1).rev() {
        out.push(packed_bytes[i]);
    }

    Ok(SecBuf::from(out))
}

/// Decodes BIT STRING content octets back into a flags word, returning
/// the word and the number of significant bits.
pub fn bit_string_to_flags(content: &SecBuf) -> Result<(u32, usize)> {
    let bytes = content.as_bytes();
    if bytes.is_empty() {
        return Err(Error::der_invalid("empty bit string"));
    }

    let padding = bytes[0] as usize;
    let body = &bytes[1..];
    let length = body
        .len()
        .checked_mul(8)
        .and_then(|bits| bits.checked_sub(padding))
        .ok_or_else(|| Error::der_invalid("inconsistent bit string padding"))?;
    if length > 32 {
        return Err(Error::unexpected("a flags word holds at most 32 bits"));
    }

    let mut flags: u32 = 0;
    for i in (1..=length).rev() {
        let bit = body[(i - 1) / 8] & (1 << ((8 - (i % 8)) % 8));
        if bit != 0 {
            flags |= 1 << (i - 1);
        }
    }

    Ok((flags, length))
}
