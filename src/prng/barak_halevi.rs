//! Extractor-then-iterator generator over SHA-256.
//!
//! The construction keeps a 32-byte state S. Refreshing with input x sets
//! S ← G′(S ⊕ Extract(x)); extraction iterates (out ‖ S) ← G(S). The three
//! functions are domain-separated instances of the hash:
//!
//!   G(S)       = H(0x00 ‖ S) ‖ H(0x01 ‖ S)
//!   Extract(x) = H(0x02 ‖ x)
//!   G′(S)      = H(0x03 ‖ S)

use digest::Digest;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::Result;
use crate::prng::Prng;

/// Size in bytes of the internal state, one SHA-256 block of output.
pub const STATE_LEN: usize = 32;

pub struct BarakHalevi {
    state: [u8; STATE_LEN],
}

/// H(prefix ‖ input).
fn prefixed_hash(prefix: u8, input: &[u8]) -> [u8; STATE_LEN] {
    let mut hasher = Sha256::new();
    hasher.update([prefix]);
    hasher.update(input);
    hasher.finalize().into()
}

pub(crate) fn g(state: &[u8; STATE_LEN]) -> [u8; 2 * STATE_LEN] {
    let mut out = [0u8; 2 * STATE_LEN];
    out[..STATE_LEN].copy_from_slice(&prefixed_hash(0, state));
    out[STATE_LEN..].copy_from_slice(&prefixed_hash(1, state));
    out
}

pub(crate) fn extract(input: &[u8]) -> [u8; STATE_LEN] {
    prefixed_hash(2, input)
}

pub(crate) fn g_prime(state: &[u8; STATE_LEN]) -> [u8; STATE_LEN] {
    prefixed_hash(3, state)
}

impl BarakHalevi {
    /// Starts from the all-zero state. The generator produces nothing
    /// useful until it has been refreshed with real entropy.
    pub fn new() -> Self {
        BarakHalevi {
            state: [0u8; STATE_LEN],
        }
    }

    pub(crate) fn state(&self) -> &[u8; STATE_LEN] {
        &self.state
    }

    pub(crate) fn set_state(&mut self, state: [u8; STATE_LEN]) {
        self.state = state;
    }
}

impl Default for BarakHalevi {
    fn default() -> Self {
        BarakHalevi::new()
    }
}

impl Prng for BarakHalevi {
    fn refresh(&mut self, input: &[u8]) -> Result<()> {
        let extracted = Zeroizing::new(extract(input));
        for (s, e) in self.state.iter_mut().zip(extracted.iter()) {
            *s ^= e;
        }

        self.state = g_prime(&self.state);
        Ok(())
    }

    fn fill_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        while offset < out.len() {
            let block = Zeroizing::new(g(&self.state));

            let take = (out.len() - offset).min(STATE_LEN);
            out[offset..offset + take].copy_from_slice(&block[..take]);
            self.state.copy_from_slice(&block[STATE_LEN..]);

            offset += take;
        }
        Ok(())
    }
}

impl Drop for BarakHalevi {
    fn drop(&mut self) {
        self.state.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_follows_the_schedule() {
        let mut rng = BarakHalevi::new();
        assert_eq!(rng.state(), &[0u8; STATE_LEN]);

        rng.refresh(b"").unwrap();

        // From the zero state, S' = G'(0 ^ Extract("")).
        let mut expected = [0u8; STATE_LEN];
        for (s, e) in expected.iter_mut().zip(extract(b"").iter()) {
            *s ^= e;
        }
        let expected = g_prime(&expected);
        assert_eq!(rng.state(), &expected);
    }

    #[test]
    fn refresh_is_deterministic_per_input() {
        let mut a = BarakHalevi::new();
        let mut b = BarakHalevi::new();
        let mut c = BarakHalevi::new();
        a.refresh(b"same input").unwrap();
        b.refresh(b"same input").unwrap();
        c.refresh(b"other input").unwrap();

        assert_eq!(a.state(), b.state());
        assert_ne!(a.state(), c.state());
    }

    #[test]
    fn extraction_schedule_and_final_state() {
        let mut rng = BarakHalevi::new();
        rng.refresh(b"Tititoto").unwrap();
        let s0 = *rng.state();

        let mut out = [0u8; 40];
        rng.fill_bytes(&mut out).unwrap();

        // First block: 32 output bytes, next state from the tail of G.
        let t0 = g(&s0);
        assert_eq!(&out[..32], &t0[..32]);
        let mut s1 = [0u8; STATE_LEN];
        s1.copy_from_slice(&t0[32..]);

        // Second block is truncated to the remaining 8 bytes.
        let t1 = g(&s1);
        assert_eq!(&out[32..], &t1[..8]);

        // The state after extraction is the tail of the final G output.
        assert_eq!(&rng.state()[..], &t1[32..]);
    }

    #[test]
    fn truncated_request_consumes_one_block() {
        let mut a = BarakHalevi::new();
        a.refresh(b"x").unwrap();
        let mut b = BarakHalevi::new();
        b.refresh(b"x").unwrap();

        let mut small = [0u8; 5];
        let mut full = [0u8; 32];
        a.fill_bytes(&mut small).unwrap();
        b.fill_bytes(&mut full).unwrap();

        assert_eq!(small, full[..5]);
        assert_eq!(a.state(), b.state());
    }
}
