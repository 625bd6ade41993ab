//! The to-be-signed capability.
//!
//! Anything that can emit its own DER and declares a signature algorithm
//! can be signed; the signed container appends the algorithm identifier
//! and the signature bit string around the payload.

use crate::buffer::SecBuf;
use crate::der::{encapsulate, Asn1SignAlgo, Class, Method, Node, SignAlgo, T_BIT_STR, T_SEQ};
use crate::errors::Result;

pub trait ToBeSigned {
    /// DER of the payload to be signed.
    fn to_der(&self) -> SecBuf;

    /// The signature algorithm this payload declares.
    fn sign_algo(&self) -> SignAlgo;

    /// Human-readable rendering of the decoded payload.
    fn display(&self) -> Result<String>;

    /// Emits `SEQUENCE { tbs, SEQUENCE { OID, NULL }, BIT STRING }` with
    /// the signature prefixed by a zero unused-bits octet.
    fn append_signature(&self, signature: &SecBuf) -> SecBuf {
        let padded = &SecBuf::with_len(1) + signature;
        let sig_node = Node::new(Class::Universal, Method::Primitive, T_BIT_STR, padded);

        let algo = encapsulate(&Asn1SignAlgo::new(self.sign_algo()).to_der(), T_SEQ);
        let body = &(&self.to_der() + &algo) + &sig_node.to_der();
        encapsulate(&body, T_SEQ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der::{decapsulate, T_NULL, T_OID};

    struct EmptyPayload;

    impl ToBeSigned for EmptyPayload {
        fn to_der(&self) -> SecBuf {
            encapsulate(&SecBuf::new(), T_SEQ)
        }

        fn sign_algo(&self) -> SignAlgo {
            SignAlgo::Sha256WithRsa
        }

        fn display(&self) -> Result<String> {
            Ok("empty payload\n".into())
        }
    }

    #[test]
    fn signed_container_shape() {
        let signature = SecBuf::from(&[0xabu8; 16][..]);
        let mut der = EmptyPayload.append_signature(&signature);

        let mut body = decapsulate(&mut der, T_SEQ).unwrap();

        let payload = Node::parse(&mut body).unwrap();
        assert_eq!(payload.tag, T_SEQ);

        let mut algo = decapsulate(&mut body, T_SEQ).unwrap();
        assert_eq!(Node::parse(&mut algo).unwrap().tag, T_OID);
        assert_eq!(Node::parse(&mut algo).unwrap().tag, T_NULL);

        let sig = Node::parse(&mut body).unwrap();
        assert_eq!(sig.tag, T_BIT_STR);
        assert_eq!(sig.value.len(), 17);
        assert_eq!(sig.value.as_bytes()[0], 0);
        assert!(body.eof());
    }
}
