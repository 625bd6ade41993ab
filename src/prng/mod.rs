//! Random bit generators.
//!
//! Everything that produces random material implements [`Prng`]: a thin
//! wrapper over the system entropy device, a hash-based generator with a
//! 32-byte refreshable state, a persistent variant of the latter, and a
//! combiner that xors two independent sources.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use zeroize::Zeroizing;

use crate::buffer::SecBuf;
use crate::errors::{Error, Result};

mod barak_halevi;
mod combined;
#[cfg(unix)]
mod stateful;
mod urandom;

pub use self::barak_halevi::BarakHalevi;
pub use self::combined::CombinedPrng;
#[cfg(unix)]
pub use self::stateful::StatefulBarakHalevi;
pub use self::urandom::DevUrandom;

/// A source of random bytes and wide random integers.
pub trait Prng {
    /// Incorporates external entropy into the generator state. Sources
    /// without an internal state ignore the input.
    fn refresh(&mut self, input: &[u8]) -> Result<()>;

    /// Fills `out` with fresh random bytes.
    fn fill_bytes(&mut self, out: &mut [u8]) -> Result<()>;

    /// Flushes any persistent state. A no-op for memory-only sources.
    fn save_state(&mut self) -> Result<()> {
        Ok(())
    }

    /// Returns `len` random bytes in an owning buffer.
    fn random_bytes(&mut self, len: usize) -> Result<SecBuf> {
        let mut out = SecBuf::with_len(len);
        self.fill_bytes(out.as_bytes_mut())?;
        Ok(out)
    }

    /// Returns an integer drawn uniformly from `[0, 2^bits)`: the unused
    /// leading bits of the top byte are masked off, the top bit stays as
    /// drawn.
    fn gen_uint_at_most(&mut self, bits: usize) -> Result<BigUint> {
        if bits == 0 {
            return Err(Error::bad_parameter("cannot draw a zero-bit integer"));
        }

        let len = (bits + 7) / 8;
        let mut raw = Zeroizing::new(vec![0u8; len]);
        self.fill_bytes(&mut raw)?;

        raw[0] &= 0xff >> (len * 8 - bits);

        Ok(BigUint::from_bytes_be(&raw))
    }

    /// Returns an integer of exactly `bits` bits: as
    /// [`Prng::gen_uint_at_most`], with the most significant bit forced
    /// to one.
    fn gen_uint(&mut self, bits: usize) -> Result<BigUint> {
        let mut n = self.gen_uint_at_most(bits)?;
        n |= BigUint::one() << (bits - 1);
        Ok(n)
    }

    /// Returns an integer uniformly distributed in `[0, q)`, by drawing
    /// 64 bits more than the size of `q` and reducing.
    fn gen_uint_below(&mut self, q: &BigUint) -> Result<BigUint> {
        if q.is_zero() {
            return Err(Error::bad_parameter("modulus must be positive"));
        }
        let wide = self.gen_uint(q.bits() + 64)?;
        Ok(wide % q)
    }

    /// Pulls `len` bytes from another generator and feeds them in.
    fn refresh_from(&mut self, src: &mut dyn Prng, len: usize) -> Result<()> {
        let seed = src.random_bytes(len)?;
        self.refresh(seed.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gen_uint_exact_bit_length() {
        let mut rng = BarakHalevi::new();
        rng.refresh(b"seed material").unwrap();

        for bits in [1usize, 7, 8, 9, 64, 65, 255, 256, 1023] {
            let n = rng.gen_uint(bits).unwrap();
            assert_eq!(n.bits(), bits, "requested {} bits", bits);
        }
        assert!(rng.gen_uint(0).is_err());
    }

    #[test]
    fn gen_uint_at_most_leaves_the_top_bit_free() {
        let mut rng = BarakHalevi::new();
        rng.refresh(b"unforced draws").unwrap();

        let bound = BigUint::one() << 16;
        let mut saw_short = false;
        for _ in 0..50 {
            let n = rng.gen_uint_at_most(16).unwrap();
            assert!(n < bound);
            if n.bits() < 16 {
                saw_short = true;
            }
        }
        // Fifty draws with the top bit always set would be a broken mask.
        assert!(saw_short);
        assert!(rng.gen_uint_at_most(0).is_err());
    }

    #[test]
    fn gen_uint_below_bound() {
        let mut rng = BarakHalevi::new();
        rng.refresh(b"another seed").unwrap();

        let q = rng.gen_uint(100).unwrap();
        for _ in 0..32 {
            assert!(rng.gen_uint_below(&q).unwrap() < q);
        }
        assert!(rng.gen_uint_below(&BigUint::zero()).is_err());
    }

    #[test]
    fn refresh_from_pulls_from_source() {
        let mut src = BarakHalevi::new();
        src.refresh(b"source").unwrap();

        let mut a = BarakHalevi::new();
        let mut b = BarakHalevi::new();
        a.refresh_from(&mut src, 16).unwrap();
        // A second pull advances the source, so b diverges from a.
        b.refresh_from(&mut src, 16).unwrap();

        assert_ne!(a.state(), b.state());
    }
}
