use lazy_static::lazy_static;
use num_bigint::{BigUint, IntoBigUint, ModInverse, RandBigInt};
use num_traits::{One, Zero};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use zeroize::{Zeroize, Zeroizing};

use crate::buffer::SecBuf;
use crate::der::tbs::ToBeSigned;
use crate::der::{
    decapsulate, encapsulate, parse_uint, Asn1EncryptAlgo, Asn1HashAlgo, Asn1Integer, Class,
    Method, Node, PubKeyAlgo, T_BIT_STR, T_OCTET_STR, T_SEQ,
};
use crate::errors::{Error, Result};
use crate::hash::HashAlgo;
use crate::prime::PrimeEngine;
use crate::prng::Prng;

/// Bound of the independent sieve used by the post-generation self-test.
const TRIVIAL_SIEVE_SIZE: usize = 100_000;

/// Number of encrypt/decrypt round trips performed by the self-test.
const ENCRYPTION_CHECKS: usize = 10;

/// The self-test generator is seeded with 256 bits from the caller.
pub const CHECK_SEED_BYTES: usize = 32;

lazy_static! {
    static ref TRIVIAL_SIEVE_PRIMES: Vec<u32> = {
        let mut composite = vec![false; TRIVIAL_SIEVE_SIZE];
        for i in 2..TRIVIAL_SIEVE_SIZE {
            if !composite[i] {
                let mut j = 2 * i;
                while j < TRIVIAL_SIEVE_SIZE {
                    composite[j] = true;
                    j += i;
                }
            }
        }
        (2..TRIVIAL_SIEVE_SIZE)
            .filter(|&i| !composite[i])
            .map(|i| i as u32)
            .collect()
    };
}

/// Independent screen, deliberately naive: does any prime below the
/// sieve bound divide n?
fn has_small_prime_factor(n: &BigUint) -> bool {
    TRIVIAL_SIEVE_PRIMES
        .iter()
        .any(|&p| (n % (p as u64)).is_zero())
}

/// An RSA key: modulus, both exponents and both prime factors. All
/// fields are wiped when the key is dropped.
pub struct RsaPrivateKey {
    n: BigUint,
    e: BigUint,
    d: BigUint,
    p: BigUint,
    q: BigUint,
}

impl Zeroize for RsaPrivateKey {
    fn zeroize(&mut self) {
        self.n.zeroize();
        self.e.zeroize();
        self.d.zeroize();
        self.p.zeroize();
        self.q.zeroize();
    }
}

impl Drop for RsaPrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl PartialEq for RsaPrivateKey {
    fn eq(&self, other: &RsaPrivateKey) -> bool {
        self.n == other.n
            && self.e == other.e
            && self.d == other.d
            && self.p == other.p
            && self.q == other.q
    }
}

impl Eq for RsaPrivateKey {}

impl core::fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "RsaPrivateKey({} bits)", self.n.bits())
    }
}

impl RsaPrivateKey {
    /// Generates a fresh key of exactly `n_bits`.
    ///
    /// Both factors come out of the strong-prime search; the pair is
    /// redrawn while |p - q| <= 2^(n_bits/2 - 20). With `use_f4` the
    /// public exponent is 65537 and the key is regenerated if
    /// d <= 2^(n_bits/2); otherwise e is drawn uniformly below
    /// 2^n_bits, forced odd, and both exponents must exceed
    /// 2^(n_bits - 10).
    pub fn generate(
        engine: &mut PrimeEngine,
        prng: &mut dyn Prng,
        n_bits: usize,
        use_f4: bool,
    ) -> Result<Self> {
        if n_bits % 2 != 0 {
            return Err(Error::bad_parameter("modulus size must be even"));
        }
        let half = n_bits / 2;
        if half < 21 {
            return Err(Error::bad_parameter("modulus size too small"));
        }

        engine.reseed(prng)?;

        let diff_min = BigUint::one() << (half - 20);
        let min_d_with_f4 = BigUint::one() << half;
        let min_exp_without_f4 = BigUint::one() << (n_bits - 10);

        let key = loop {
            // Factors too close to each other would surrender the
            // modulus to a square-root search.
            let (p, q) = loop {
                let p = engine.find_rsa_factor(half, prng)?;
                let q = engine.find_rsa_factor(half, prng)?;
                let diff = if p > q { &p - &q } else { &q - &p };
                if diff > diff_min {
                    break (p, q);
                }
            };

            let n = &p * &q;
            let p_minus_1 = Zeroizing::new(&p - 1u32);
            let q_minus_1 = Zeroizing::new(&q - 1u32);
            let phi = Zeroizing::new(&*p_minus_1 * &*q_minus_1);

            if use_f4 {
                let e = BigUint::from(65537u32);
                let d = (&e)
                    .mod_inverse(&*phi)
                    .and_then(|inv| inv.into_biguint())
                    .ok_or_else(|| Error::mayhem("65537 and phi are not coprime"))?;

                // A tiny k in ed = 1 + k*phi is exploitable. Highly
                // improbable, but regenerate the modulus if so.
                if d <= min_d_with_f4 {
                    continue;
                }

                break RsaPrivateKey { n, e, d, p, q };
            }

            // Random public exponent: drawn over the full n_bits width
            // (top bit not forced), made odd, and kept only when it is
            // an invertible residue large enough that neither exponent
            // is attackably small.
            let (e, d) = loop {
                let mut e = prng.gen_uint_at_most(n_bits)?;
                e |= BigUint::one();

                if e >= n || e <= min_exp_without_f4 {
                    continue;
                }
                let d = match (&e).mod_inverse(&*phi).and_then(|inv| inv.into_biguint()) {
                    Some(d) => d,
                    None => continue,
                };
                if d <= min_exp_without_f4 {
                    continue;
                }
                break (e, d);
            };

            break RsaPrivateKey { n, e, d, p, q };
        };

        let mut seed = [0u8; CHECK_SEED_BYTES];
        prng.fill_bytes(&mut seed)?;
        key.check_key(n_bits, &seed)?;
        seed.zeroize();

        Ok(key)
    }

    /// Assembles a key from its parts and runs the self-test.
    pub fn from_components(
        prng: &mut dyn Prng,
        n: BigUint,
        d: BigUint,
        e: BigUint,
        p: BigUint,
        q: BigUint,
    ) -> Result<Self> {
        let key = RsaPrivateKey { n, e, d, p, q };

        let mut seed = [0u8; CHECK_SEED_BYTES];
        prng.fill_bytes(&mut seed)?;
        key.check_key(key.n.bits(), &seed)?;
        seed.zeroize();

        Ok(key)
    }

    /// Reads a PKCS#1 RSAPrivateKey and runs the self-test.
    pub fn from_asn1_private_key(prng: &mut dyn Prng, der: &SecBuf) -> Result<Self> {
        let key = Self::set_from_asn1_private_key(der)?;

        let mut seed = [0u8; CHECK_SEED_BYTES];
        prng.fill_bytes(&mut seed)?;
        key.check_key(key.n.bits(), &seed)?;
        seed.zeroize();

        Ok(key)
    }

    /// Trusted import of a PKCS#1 RSAPrivateKey: the integers are
    /// accepted as found, without the self-test. Callers wanting
    /// verification re-run [`RsaPrivateKey::check_key`].
    pub fn set_from_asn1_private_key(der: &SecBuf) -> Result<Self> {
        let mut src = der.clone();
        let mut content = decapsulate(&mut src, T_SEQ)?;

        let _version = Node::parse(&mut content)?;
        let n = parse_uint(&mut content)?;
        let e = parse_uint(&mut content)?;
        let d = parse_uint(&mut content)?;
        let p = parse_uint(&mut content)?;
        let q = parse_uint(&mut content)?;

        Ok(RsaPrivateKey { n, e, d, p, q })
    }

    /// Trusted import of a PKCS#8 v1 PrivateKeyInfo.
    pub fn set_from_asn1_private_key_info(der: &SecBuf) -> Result<Self> {
        let mut src = der.clone();
        let mut content = decapsulate(&mut src, T_SEQ)?;

        let _version = Node::parse(&mut content)?;
        let _algorithm = decapsulate(&mut content, T_SEQ)?;
        let key = decapsulate(&mut content, T_OCTET_STR)?;

        Self::set_from_asn1_private_key(&key)
    }

    pub fn n(&self) -> &BigUint {
        &self.n
    }

    pub fn e(&self) -> &BigUint {
        &self.e
    }

    pub fn d(&self) -> &BigUint {
        &self.d
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn q(&self) -> &BigUint {
        &self.q
    }

    /// Size of the modulus in bytes.
    pub fn modulus_len(&self) -> usize {
        (self.n.bits() + 7) / 8
    }

    /// Correctness checks on a freshly built key. Any violation means a
    /// broken invariant somewhere below us, and aborts the operation.
    pub fn check_key(&self, n_bits: usize, seed: &[u8; CHECK_SEED_BYTES]) -> Result<()> {
        // Negative values cannot be represented here; the sign checks of
        // the import path collapse into the type.
        if self.e >= self.n {
            return Err(Error::mayhem("the public exponent is not reduced"));
        }
        if self.d >= self.n {
            return Err(Error::mayhem("the private exponent is not reduced"));
        }

        // Both factors carry their two top bits, so the product cannot
        // lose a bit: the modulus has exactly the requested size.
        if self.n.bits() != n_bits {
            return Err(Error::mayhem("the modulus does not have the expected size"));
        }

        if has_small_prime_factor(&self.n) {
            return Err(Error::mayhem("the modulus has a small prime factor"));
        }

        let mut rng = ChaCha20Rng::from_seed(*seed);
        for _ in 0..ENCRYPTION_CHECKS {
            let m = rng.gen_biguint_below(&self.n);
            let c = m.modpow(&self.e, &self.n);
            let x = c.modpow(&self.d, &self.n);
            if x != m {
                return Err(Error::mayhem(
                    "encrypting then decrypting is not the identity",
                ));
            }
        }

        Ok(())
    }

    /// data^d mod n. The operand must be reduced modulo n.
    pub fn private_exp(&self, data: &BigUint) -> Result<BigUint> {
        if data >= &self.n {
            return Err(Error::bad_parameter("operand not reduced modulo n"));
        }
        Ok(data.modpow(&self.d, &self.n))
    }

    /// data^e mod n. The operand must be reduced modulo n.
    pub fn public_exp(&self, data: &BigUint) -> Result<BigUint> {
        if data >= &self.n {
            return Err(Error::bad_parameter("operand not reduced modulo n"));
        }
        Ok(data.modpow(&self.e, &self.n))
    }

    /// Big-endian byte form of [`RsaPrivateKey::private_exp`].
    pub fn private_exp_bytes(&self, data: &[u8]) -> Result<SecBuf> {
        let res = self.private_exp(&BigUint::from_bytes_be(data))?;
        Ok(SecBuf::from_biguint(&res))
    }

    /// Big-endian byte form of [`RsaPrivateKey::public_exp`].
    pub fn public_exp_bytes(&self, data: &[u8]) -> Result<SecBuf> {
        let res = self.public_exp(&BigUint::from_bytes_be(data))?;
        Ok(SecBuf::from_biguint(&res))
    }

    /// Whether sig^e mod n recovers msg.
    pub fn verify(&self, msg: &BigUint, sig: &BigUint) -> bool {
        sig.modpow(&self.e, &self.n) == *msg
    }

    /// EMSA-PKCS1-v1_5 encoding into `em_len` bytes:
    /// `00 01 FF..FF 00 DigestInfoHeader(hash) data`, with at least
    /// eight FF octets. `None` selects the empty header (raw RSA).
    pub fn pkcs1_v1_5_encode(
        em_len: usize,
        data: &[u8],
        hash: Option<HashAlgo>,
    ) -> Result<SecBuf> {
        let header: &[u8] = match hash {
            Some(hash) => hash.digest_info_header(),
            None => &[],
        };

        let t_len = data.len() + header.len();
        if em_len < t_len + 11 {
            return Err(Error::bad_parameter("encoded message length too small"));
        }

        let mut out = SecBuf::with_len(em_len);
        out.push_u8(0x00)?;
        out.push_u8(0x01)?;
        for _ in 0..(em_len - t_len - 3) {
            out.push_u8(0xff)?;
        }
        out.push_u8(0x00)?;
        out.push_bytes(header)?;
        out.push_bytes(data)?;

        Ok(out)
    }

    /// Signs a to-be-signed payload: hash its DER under the hash of its
    /// declared algorithm, wrap the digest in a DigestInfo, pad, raise
    /// to the private exponent and hand the signature back to the
    /// payload's signed emission.
    pub fn sign(&self, tbs: &dyn ToBeSigned) -> Result<SecBuf> {
        let hash = tbs.sign_algo().hash();
        let tbs_der = tbs.to_der();
        let digest = hash.digest(tbs_der.as_bytes());

        /*
          SEQUENCE
          | SEQUENCE
          | | OBJECT IDENTIFIER : hash algorithm
          | | NULL
          | OCTET STRING : digest of the payload
        */
        let digest_node = Node::new(
            Class::Universal,
            Method::Primitive,
            T_OCTET_STR,
            SecBuf::from(digest),
        );
        let digest_info = encapsulate(
            &(&encapsulate(&Asn1HashAlgo::new(hash)?.to_der(), T_SEQ) + &digest_node.to_der()),
            T_SEQ,
        );

        let modulus_len = self.modulus_len();

        // The padding must leave room for at least eight FF octets plus
        // the 00 01 prefix and 00 separator.
        if digest_info.len() + 11 > modulus_len {
            return Err(Error::unexpected("the hashed block to sign is too large"));
        }

        let mut em = SecBuf::with_len(modulus_len);
        em.push_u8(0x00)?;
        em.push_u8(0x01)?;
        for _ in 2..(modulus_len - digest_info.len() - 1) {
            em.push_u8(0xff)?;
        }
        em.push_u8(0x00)?;
        em.push_bytes(digest_info.as_bytes())?;

        let msg = Zeroizing::new(em.to_biguint());
        if *msg >= self.n {
            return Err(Error::unexpected("the hashed block to sign is too large"));
        }

        let sig = Zeroizing::new(msg.modpow(&self.d, &self.n));
        let sig_bytes = SecBuf::from_biguint(&sig);

        // Left-pad the signature back to the modulus length.
        let mut padded = SecBuf::with_len(modulus_len);
        padded.seek(modulus_len - sig_bytes.len())?;
        padded.push_bytes(sig_bytes.as_bytes())?;

        Ok(tbs.append_signature(&padded))
    }

    /*
       SEQUENCE
       | INTEGER (modulus)
       | INTEGER (public exponent)
    */
    pub fn asn1_public_key(&self) -> SecBuf {
        let n = Asn1Integer::from_biguint(&self.n);
        let e = Asn1Integer::from_biguint(&self.e);
        encapsulate(&(&n.to_der() + &e.to_der()), T_SEQ)
    }

    /*
       SEQUENCE
       | SEQUENCE
       | | OBJECT IDENTIFIER : rsaEncryption
       | | NULL
       | BIT STRING
       | | SEQUENCE
       | | | INTEGER (modulus)
       | | | INTEGER (public exponent)
    */
    pub fn asn1_pub_key_info(&self) -> SecBuf {
        let algo = encapsulate(&Asn1EncryptAlgo::new(PubKeyAlgo::Rsa).to_der(), T_SEQ);

        let padding = SecBuf::with_len(1);
        let pub_key = Node::new(
            Class::Universal,
            Method::Primitive,
            T_BIT_STR,
            &padding + &self.asn1_public_key(),
        );

        encapsulate(&(&algo + &pub_key.to_der()), T_SEQ)
    }

    /*
       SEQUENCE
       | INTEGER (version)
       | INTEGER (n) | INTEGER (e) | INTEGER (d) | INTEGER (p) | INTEGER (q)
       | INTEGER (d mod (p-1)) | INTEGER (d mod (q-1)) | INTEGER (q^-1 mod p)
    */
    pub fn asn1_private_key(&self) -> Result<SecBuf> {
        let p_minus_1 = Zeroizing::new(&self.p - 1u32);
        let q_minus_1 = Zeroizing::new(&self.q - 1u32);

        let d_mod_p_minus_1 = Zeroizing::new(
            (&self.e)
                .mod_inverse(&*p_minus_1)
                .and_then(|inv| inv.into_biguint())
                .ok_or_else(|| Error::mayhem("the public exponent is not invertible modulo p-1"))?,
        );
        let d_mod_q_minus_1 = Zeroizing::new(
            (&self.e)
                .mod_inverse(&*q_minus_1)
                .and_then(|inv| inv.into_biguint())
                .ok_or_else(|| Error::mayhem("the public exponent is not invertible modulo q-1"))?,
        );
        let q_inv = Zeroizing::new(
            (&self.q)
                .mod_inverse(&self.p)
                .and_then(|inv| inv.into_biguint())
                .ok_or_else(|| Error::mayhem("q is not invertible modulo p"))?,
        );

        let mut body = Asn1Integer::from_biguint(&BigUint::zero()).to_der();
        for part in [
            &self.n,
            &self.e,
            &self.d,
            &self.p,
            &self.q,
            &*d_mod_p_minus_1,
            &*d_mod_q_minus_1,
            &*q_inv,
        ] {
            body += &Asn1Integer::from_biguint(part).to_der();
        }

        Ok(encapsulate(&body, T_SEQ))
    }

    /*
       SEQUENCE
       | INTEGER (version)
       | SEQUENCE
       | | OBJECT IDENTIFIER : rsaEncryption
       | | NULL
       | OCTET STRING
       | | PKCS#1 RSAPrivateKey
    */
    pub fn asn1_private_key_info(&self) -> Result<SecBuf> {
        let version = Asn1Integer::from_biguint(&BigUint::zero()).to_der();
        let algo = encapsulate(&Asn1EncryptAlgo::new(PubKeyAlgo::Rsa).to_der(), T_SEQ);
        let key = Node::new(
            Class::Universal,
            Method::Primitive,
            T_OCTET_STR,
            self.asn1_private_key()?,
        );

        Ok(encapsulate(&(&(&version + &algo) + &key.to_der()), T_SEQ))
    }

    /// SHA-1 of the public structure, used as the key identifier in the
    /// subject/authority key identifier extensions.
    pub fn key_identifier_hash(&self) -> SecBuf {
        let public = self.asn1_public_key();
        SecBuf::from(HashAlgo::Sha1.digest(public.as_bytes()))
    }

    /// Wipes the secret fields and consumes the key.
    pub fn forget(mut self) {
        self.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    // The textbook 16-bit key: p = 61, q = 53, e = 17.
    fn tiny_key() -> RsaPrivateKey {
        RsaPrivateKey {
            n: BigUint::from_u64(3233).unwrap(),
            e: BigUint::from_u64(17).unwrap(),
            d: BigUint::from_u64(2753).unwrap(),
            p: BigUint::from_u64(61).unwrap(),
            q: BigUint::from_u64(53).unwrap(),
        }
    }

    #[test]
    fn small_factor_screen() {
        assert!(has_small_prime_factor(&BigUint::from_u64(3233).unwrap()));

        let p = BigUint::parse_bytes(
            b"98920366548084643601728869055592650835572950932266967461790948584315647051443",
            10,
        )
        .unwrap();
        assert!(!has_small_prime_factor(&p));
    }

    #[test]
    fn check_key_rejects_a_smooth_modulus() {
        let key = tiny_key();
        let seed = [7u8; CHECK_SEED_BYTES];
        match key.check_key(12, &seed) {
            Err(Error::InternalMayhem { .. }) => (),
            other => panic!("expected mayhem, got {:?}", other),
        }
    }

    #[test]
    fn exponentiation_bounds() {
        let key = tiny_key();
        let too_big = BigUint::from_u64(5000).unwrap();
        assert!(key.private_exp(&too_big).is_err());
        assert!(key.public_exp(&too_big).is_err());

        let m = BigUint::from_u64(42).unwrap();
        let c = key.public_exp(&m).unwrap();
        assert_eq!(key.private_exp(&c).unwrap(), m);
        assert!(key.verify(&c, &m));
    }

    #[test]
    fn byte_exponentiation_round_trip() {
        let key = tiny_key();
        let c = key.public_exp_bytes(&[0x02, 0x2a]).unwrap();
        let m = key.private_exp_bytes(c.as_bytes()).unwrap();
        assert_eq!(m.as_bytes(), &[0x02, 0x2a]);
    }

    #[test]
    fn pkcs1_block_layout() {
        let digest = [0x11u8; 32];
        let em = RsaPrivateKey::pkcs1_v1_5_encode(128, &digest, Some(HashAlgo::Sha256)).unwrap();

        let bytes = em.as_bytes();
        assert_eq!(bytes.len(), 128);
        assert_eq!(&bytes[..2], &[0x00, 0x01]);

        let header = HashAlgo::Sha256.digest_info_header();
        let ps_len = 128 - digest.len() - header.len() - 3;
        assert!(ps_len >= 8);
        assert!(bytes[2..2 + ps_len].iter().all(|&b| b == 0xff));
        assert_eq!(bytes[2 + ps_len], 0x00);
        assert_eq!(&bytes[3 + ps_len..3 + ps_len + header.len()], header);
        assert_eq!(&bytes[128 - digest.len()..], &digest);
    }

    #[test]
    fn pkcs1_raw_block_has_no_header() {
        let data = [0x22u8; 16];
        let em = RsaPrivateKey::pkcs1_v1_5_encode(64, &data, None).unwrap();
        let bytes = em.as_bytes();
        assert_eq!(&bytes[..2], &[0x00, 0x01]);
        assert_eq!(bytes[64 - 17], 0x00);
        assert_eq!(&bytes[64 - 16..], &data);
    }

    #[test]
    fn pkcs1_block_too_small() {
        let digest = [0u8; 32];
        assert!(RsaPrivateKey::pkcs1_v1_5_encode(32, &digest, Some(HashAlgo::Sha256)).is_err());
    }

    #[test]
    fn private_key_der_round_trip() {
        let key = tiny_key();
        let der = key.asn1_private_key().unwrap();

        // The trusted import takes the integers as found.
        let back = RsaPrivateKey::set_from_asn1_private_key(&der).unwrap();
        assert_eq!(back, key);

        // Re-emission is byte identical.
        assert_eq!(back.asn1_private_key().unwrap(), der);
    }

    #[test]
    fn private_key_info_round_trip() {
        let key = tiny_key();
        let der = key.asn1_private_key_info().unwrap();
        let back = RsaPrivateKey::set_from_asn1_private_key_info(&der).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn checked_import_screens_the_key() {
        // The tiny key is consistent but its modulus is tiny and
        // smooth, which the checked import must refuse.
        let der = tiny_key().asn1_private_key().unwrap();
        let mut prng = crate::prng::BarakHalevi::new();
        prng.refresh(b"import test").unwrap();
        match RsaPrivateKey::from_asn1_private_key(&mut prng, &der) {
            Err(Error::InternalMayhem { .. }) => (),
            other => panic!("expected mayhem, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn key_identifier_is_sha1_of_the_public_structure() {
        let key = tiny_key();
        let public = key.asn1_public_key();
        assert_eq!(
            key.key_identifier_hash().as_bytes(),
            HashAlgo::Sha1.digest(public.as_bytes()).as_slice()
        );
        assert_eq!(key.key_identifier_hash().len(), 20);
    }
}
