//! Generation of high-assurance RSA signing keys and of the DER
//! structures that hold them.
//!
//! The building blocks are a seeded, stateful deterministic random bit
//! generator (an extractor-then-iterator construction over SHA-256), a
//! prime engine tuned for RSA factor selection (sieve + Miller-Rabin +
//! Lucas, plus a uniform prime sampler), an RSA keypair generator
//! enforcing structural safety properties on the modulus, and a strict
//! DER layer emitting PKCS#1 / PKCS#8 / SubjectPublicKeyInfo forms and
//! PKCS#1 v1.5 signatures.
//!
//! ```no_run
//! use rsagen::{DevUrandom, PrimeEngine, RsaPrivateKey};
//!
//! # fn main() -> rsagen::Result<()> {
//! let mut rng = DevUrandom::new()?;
//! let mut engine = PrimeEngine::new(&mut rng)?;
//! let key = RsaPrivateKey::generate(&mut engine, &mut rng, 2048, true)?;
//! print!("{}", rsagen::pem::encode("RSA PRIVATE KEY", &key.asn1_private_key_info()?));
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod der;
pub mod errors;
pub mod hash;
pub mod key;
mod math;
pub mod pem;
pub mod prime;
pub mod prng;

pub use crate::buffer::SecBuf;
pub use crate::errors::{Error, Result};
pub use crate::hash::HashAlgo;
pub use crate::key::RsaPrivateKey;
pub use crate::prime::PrimeEngine;
#[cfg(unix)]
pub use crate::prng::StatefulBarakHalevi;
pub use crate::prng::{BarakHalevi, CombinedPrng, DevUrandom, Prng};
