use zeroize::Zeroizing;

use crate::errors::Result;
use crate::prng::Prng;

/// Xors the streams of two independent generators. Refreshes and state
/// saves fan out to both sources.
///
/// Taking both sources by value makes aliasing them unrepresentable, so
/// no identity check is needed at construction.
pub struct CombinedPrng {
    src1: Box<dyn Prng>,
    src2: Box<dyn Prng>,
}

impl CombinedPrng {
    pub fn new(src1: Box<dyn Prng>, src2: Box<dyn Prng>) -> Self {
        CombinedPrng { src1, src2 }
    }
}

impl Prng for CombinedPrng {
    fn refresh(&mut self, input: &[u8]) -> Result<()> {
        self.src1.refresh(input)?;
        self.src2.refresh(input)
    }

    fn fill_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        self.src1.fill_bytes(out)?;

        let mut other = Zeroizing::new(vec![0u8; out.len()]);
        self.src2.fill_bytes(&mut other)?;
        for (o, x) in out.iter_mut().zip(other.iter()) {
            *o ^= x;
        }
        Ok(())
    }

    fn save_state(&mut self) -> Result<()> {
        self.src1.save_state()?;
        self.src2.save_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::BarakHalevi;

    fn seeded(tag: &[u8]) -> BarakHalevi {
        let mut rng = BarakHalevi::new();
        rng.refresh(tag).unwrap();
        rng
    }

    #[test]
    fn output_is_the_xor_of_both_sources() {
        let mut expected_a = [0u8; 48];
        let mut expected_b = [0u8; 48];
        seeded(b"one").fill_bytes(&mut expected_a).unwrap();
        seeded(b"two").fill_bytes(&mut expected_b).unwrap();

        let mut combined = CombinedPrng::new(
            Box::new(seeded(b"one")),
            Box::new(seeded(b"two")),
        );
        let mut out = [0u8; 48];
        combined.fill_bytes(&mut out).unwrap();

        for i in 0..out.len() {
            assert_eq!(out[i], expected_a[i] ^ expected_b[i]);
        }
    }

    #[test]
    fn refresh_fans_out() {
        let mut combined = CombinedPrng::new(
            Box::new(seeded(b"one")),
            Box::new(seeded(b"two")),
        );
        let mut same = CombinedPrng::new(
            Box::new(seeded(b"one")),
            Box::new(seeded(b"two")),
        );

        combined.refresh(b"more entropy").unwrap();
        same.refresh(b"more entropy").unwrap();

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        combined.fill_bytes(&mut a).unwrap();
        same.fill_bytes(&mut b).unwrap();
        assert_eq!(a, b);
    }
}
