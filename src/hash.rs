use digest::Digest;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

/// The hash functions understood by the signing and encoding layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgo {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgo {
    /// Length in bytes of a digest.
    pub fn size(self) -> usize {
        match self {
            HashAlgo::Sha1 => 20,
            HashAlgo::Sha256 => 32,
            HashAlgo::Sha384 => 48,
            HashAlgo::Sha512 => 64,
        }
    }

    /// The literal DigestInfo prefix from PKCS#1: the DER of
    /// `SEQUENCE { SEQUENCE { OID hash, NULL }, OCTET STRING }` up to and
    /// excluding the digest bytes themselves.
    pub fn digest_info_header(self) -> &'static [u8] {
        match self {
            HashAlgo::Sha1 => &[
                0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00,
                0x04, 0x14,
            ],
            HashAlgo::Sha256 => &[
                0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04,
                0x02, 0x01, 0x05, 0x00, 0x04, 0x20,
            ],
            HashAlgo::Sha384 => &[
                0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04,
                0x02, 0x02, 0x05, 0x00, 0x04, 0x30,
            ],
            HashAlgo::Sha512 => &[
                0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04,
                0x02, 0x03, 0x05, 0x00, 0x04, 0x40,
            ],
        }
    }

    /// One-shot digest of `msg`.
    pub fn digest(self, msg: &[u8]) -> Vec<u8> {
        match self {
            HashAlgo::Sha1 => Sha1::digest(msg).to_vec(),
            HashAlgo::Sha256 => Sha256::digest(msg).to_vec(),
            HashAlgo::Sha384 => Sha384::digest(msg).to_vec(),
            HashAlgo::Sha512 => Sha512::digest(msg).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn sha1_abc() {
        assert_eq!(
            HashAlgo::Sha1.digest(b"abc"),
            hex!("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
    }

    #[test]
    fn sha1_million_a() {
        let input = vec![b'a'; 1_000_000];
        assert_eq!(
            HashAlgo::Sha1.digest(&input),
            hex!("34aa973cd4c4daa4f61eeb2bdbad27316534016f")
        );
    }

    #[test]
    fn sha256_abc() {
        assert_eq!(
            HashAlgo::Sha256.digest(b"abc"),
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn digest_sizes_match_headers() {
        for algo in [
            HashAlgo::Sha1,
            HashAlgo::Sha256,
            HashAlgo::Sha384,
            HashAlgo::Sha512,
        ] {
            assert_eq!(algo.digest(b"x").len(), algo.size());
            // The trailing header byte is the digest length.
            assert_eq!(
                *algo.digest_info_header().last().unwrap() as usize,
                algo.size()
            );
        }
    }
}
