use std::fs::File;
use std::io::Read;

use crate::errors::{Error, Result};
use crate::prng::Prng;

const URANDOM_PATH: &str = "/dev/urandom";

/// Thin wrapper over the non-blocking system entropy device.
pub struct DevUrandom {
    source: File,
}

impl DevUrandom {
    pub fn new() -> Result<Self> {
        let source = File::open(URANDOM_PATH).map_err(|_| Error::PrngState {
            path: URANDOM_PATH.into(),
        })?;
        Ok(DevUrandom { source })
    }
}

impl Prng for DevUrandom {
    /// The device cannot be written to; external entropy is ignored.
    fn refresh(&mut self, _input: &[u8]) -> Result<()> {
        Ok(())
    }

    fn fill_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        // read_exact retries short reads and interrupted syscalls.
        self.source.read_exact(out).map_err(|_| Error::PrngState {
            path: URANDOM_PATH.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_requested_length() {
        let mut rng = DevUrandom::new().unwrap();
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        rng.fill_bytes(&mut a).unwrap();
        rng.fill_bytes(&mut b).unwrap();
        // Two independent 128-bit draws collide with negligible probability.
        assert_ne!(a, b);
    }

    #[test]
    fn wide_integers_come_out_sized() {
        let mut rng = DevUrandom::new().unwrap();
        let n = rng.gen_uint(256).unwrap();
        assert_eq!(n.bits(), 256);
    }
}
