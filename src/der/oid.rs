//! Compiled object identifier tables.
//!
//! Each entry carries the raw DER encoding of the OID, a description for
//! rendering, and the kind of element expected to follow it inside an
//! (OID, value) pair.

/// The kind of object that should follow an OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// A character string (Printable, IA5, T61 or UTF8).
    Str,
    /// A NULL element (algorithm identifiers).
    Null,
    /// An OCTET STRING (X.509 extensions).
    OctetString,
}

#[derive(Debug)]
pub struct OidEntry {
    pub bytes: &'static [u8],
    pub desc: &'static str,
    pub expected: Expected,
}

/* Distinguished-name attribute types. */
pub const DN_COMMON_NAME: usize = 0;
pub const DN_COUNTRY: usize = 1;
pub const DN_LOCALITY: usize = 2;
pub const DN_STATE: usize = 3;
pub const DN_ORGANIZATION: usize = 4;
pub const DN_ORGANIZATIONAL_UNIT: usize = 5;
pub const DN_EMAIL: usize = 6;
pub const DN_DOMAIN_COMPONENT: usize = 7;

pub const DN_OIDS: [OidEntry; 8] = [
    OidEntry {
        bytes: &[0x55, 0x04, 0x03], // 2.5.4.3
        desc: "Common name",
        expected: Expected::Str,
    },
    OidEntry {
        bytes: &[0x55, 0x04, 0x06], // 2.5.4.6
        desc: "Country",
        expected: Expected::Str,
    },
    OidEntry {
        bytes: &[0x55, 0x04, 0x07], // 2.5.4.7
        desc: "Locality",
        expected: Expected::Str,
    },
    OidEntry {
        bytes: &[0x55, 0x04, 0x08], // 2.5.4.8
        desc: "State or province",
        expected: Expected::Str,
    },
    OidEntry {
        bytes: &[0x55, 0x04, 0x0a], // 2.5.4.10
        desc: "Organization",
        expected: Expected::Str,
    },
    OidEntry {
        bytes: &[0x55, 0x04, 0x0b], // 2.5.4.11
        desc: "Organizational unit",
        expected: Expected::Str,
    },
    OidEntry {
        // 1.2.840.113549.1.9.1
        bytes: &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x01],
        desc: "Email address",
        expected: Expected::Str,
    },
    OidEntry {
        // 0.9.2342.19200300.100.1.25
        bytes: &[0x09, 0x92, 0x26, 0x89, 0x93, 0xf2, 0x2c, 0x64, 0x01, 0x19],
        desc: "Domain component",
        expected: Expected::Str,
    },
];

pub const SIGN_ALGO_OIDS: [OidEntry; 3] = [
    OidEntry {
        // 1.2.840.113549.1.1.5
        bytes: &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x05],
        desc: "SHA-1 with RSA",
        expected: Expected::Null,
    },
    OidEntry {
        // 1.2.840.113549.1.1.11
        bytes: &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b],
        desc: "SHA-256 with RSA",
        expected: Expected::Null,
    },
    OidEntry {
        // 1.2.840.113549.1.1.13
        bytes: &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0d],
        desc: "SHA-512 with RSA",
        expected: Expected::Null,
    },
];

pub const HASH_ALGO_OIDS: [OidEntry; 3] = [
    OidEntry {
        bytes: &[0x2b, 0x0e, 0x03, 0x02, 0x1a], // 1.3.14.3.2.26
        desc: "SHA-1",
        expected: Expected::Null,
    },
    OidEntry {
        // 2.16.840.1.101.3.4.2.1
        bytes: &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01],
        desc: "SHA-256",
        expected: Expected::Null,
    },
    OidEntry {
        // 2.16.840.1.101.3.4.2.3
        bytes: &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03],
        desc: "SHA-512",
        expected: Expected::Null,
    },
];

pub const PUBKEY_ALGO_OIDS: [OidEntry; 1] = [OidEntry {
    // 1.2.840.113549.1.1.1
    bytes: &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01],
    desc: "RSA encryption",
    expected: Expected::Null,
}];

pub const EXTENSION_OIDS: [OidEntry; 7] = [
    OidEntry {
        bytes: &[0x55, 0x1d, 0x13], // 2.5.29.19
        desc: "Basic constraints",
        expected: Expected::OctetString,
    },
    OidEntry {
        bytes: &[0x55, 0x1d, 0x0f], // 2.5.29.15
        desc: "Key usage",
        expected: Expected::OctetString,
    },
    OidEntry {
        bytes: &[0x55, 0x1d, 0x20], // 2.5.29.32
        desc: "Certificate policies",
        expected: Expected::OctetString,
    },
    OidEntry {
        bytes: &[0x55, 0x1d, 0x23], // 2.5.29.35
        desc: "Authority key identifier",
        expected: Expected::OctetString,
    },
    OidEntry {
        bytes: &[0x55, 0x1d, 0x0e], // 2.5.29.14
        desc: "Subject key identifier",
        expected: Expected::OctetString,
    },
    OidEntry {
        bytes: &[0x55, 0x1d, 0x25], // 2.5.29.37
        desc: "Extended key usage",
        expected: Expected::OctetString,
    },
    OidEntry {
        bytes: &[0x55, 0x1d, 0x11], // 2.5.29.17
        desc: "Subject alternative name",
        expected: Expected::OctetString,
    },
];

/// Finds a known OID by its raw encoding, across all tables.
pub fn lookup(bytes: &[u8]) -> Option<&'static OidEntry> {
    DN_OIDS
        .iter()
        .chain(SIGN_ALGO_OIDS.iter())
        .chain(HASH_ALGO_OIDS.iter())
        .chain(PUBKEY_ALGO_OIDS.iter())
        .chain(EXTENSION_OIDS.iter())
        .find(|entry| entry.bytes == bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_spans_every_table() {
        assert_eq!(lookup(&[0x55, 0x04, 0x03]).unwrap().desc, "Common name");
        assert_eq!(
            lookup(&[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01])
                .unwrap()
                .desc,
            "RSA encryption"
        );
        assert_eq!(lookup(&[0x55, 0x1d, 0x0f]).unwrap().desc, "Key usage");
        assert!(lookup(&[0x55, 0x55, 0x55]).is_none());
    }
}
