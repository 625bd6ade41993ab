//! Persistent variant of the hash-based generator.
//!
//! The 32-byte state lives in a flat file (no header), created mode 0600
//! and accessed under an advisory shared lock. The lock keeps concurrent
//! readers coherent; concurrent writers may interleave, which callers
//! accept by using the shared-lock discipline.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;

use crate::errors::{Error, Result};
use crate::prng::barak_halevi::{BarakHalevi, STATE_LEN};
use crate::prng::Prng;

/// Default number of extractions between two state flushes.
pub const DEFAULT_AUTOSAVE_EVERY: u32 = 10_000;

pub struct StatefulBarakHalevi {
    inner: BarakHalevi,
    path: String,
    autosave_every: u32,
    counter: u32,
}

fn flock_retry(file: &File, operation: libc::c_int) -> std::io::Result<()> {
    loop {
        if unsafe { libc::flock(file.as_raw_fd(), operation) } == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

impl StatefulBarakHalevi {
    fn state_error(path: &str) -> Error {
        Error::PrngState { path: path.into() }
    }

    /// Reopens a previously saved state. Any I/O failure or a short file
    /// is reported as [`Error::PrngState`] carrying the filename.
    pub fn open(path: &str, autosave_every: u32) -> Result<Self> {
        let read_state = || -> std::io::Result<[u8; STATE_LEN]> {
            let mut file = File::open(path)?;
            flock_retry(&file, libc::LOCK_SH)?;
            let mut state = [0u8; STATE_LEN];
            let outcome = file.read_exact(&mut state);
            let unlock = flock_retry(&file, libc::LOCK_UN);
            outcome?;
            unlock?;
            Ok(state)
        };

        let state = read_state().map_err(|_| Self::state_error(path))?;
        let mut inner = BarakHalevi::new();
        inner.set_state(state);

        Ok(StatefulBarakHalevi {
            inner,
            path: path.into(),
            autosave_every,
            counter: 0,
        })
    }

    /// Creates a state seeded from another generator and persists it.
    pub fn create(path: &str, source: &mut dyn Prng, autosave_every: u32) -> Result<Self> {
        let mut state = [0u8; STATE_LEN];
        source.fill_bytes(&mut state)?;

        let mut inner = BarakHalevi::new();
        inner.set_state(state);

        let mut prng = StatefulBarakHalevi {
            inner,
            path: path.into(),
            autosave_every,
            counter: 0,
        };
        prng.save_state()?;
        Ok(prng)
    }

    /// Creates a state by refreshing the zero state with `seed`, then
    /// persists it.
    pub fn create_from_seed(path: &str, seed: &[u8], autosave_every: u32) -> Result<Self> {
        let mut prng = StatefulBarakHalevi {
            inner: BarakHalevi::new(),
            path: path.into(),
            autosave_every,
            counter: 0,
        };
        prng.refresh(seed)?;
        Ok(prng)
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &[u8; STATE_LEN] {
        self.inner.state()
    }
}

impl Prng for StatefulBarakHalevi {
    /// Refreshing always persists the post-refresh state.
    fn refresh(&mut self, input: &[u8]) -> Result<()> {
        self.inner.refresh(input)?;
        self.save_state()
    }

    fn fill_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        self.inner.fill_bytes(out)?;
        self.counter += 1;
        if self.counter >= self.autosave_every {
            self.save_state()?;
            self.counter = 0;
        }
        Ok(())
    }

    fn save_state(&mut self) -> Result<()> {
        let write_state = || -> std::io::Result<()> {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .mode(0o600)
                .open(&self.path)?;
            flock_retry(&file, libc::LOCK_SH)?;
            let outcome = file.set_len(0).and_then(|_| file.write_all(self.inner.state()));
            let unlock = flock_retry(&file, libc::LOCK_UN);
            outcome?;
            unlock?;
            Ok(())
        };

        write_state().map_err(|_| Self::state_error(&self.path))
    }
}

impl Drop for StatefulBarakHalevi {
    fn drop(&mut self) {
        let _ = self.save_state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_file(tag: &str) -> String {
        let mut path = PathBuf::from(std::env::temp_dir());
        path.push(format!("rsagen-prng-{}-{}", tag, std::process::id()));
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn state_survives_reopen() {
        let path = scratch_file("reopen");
        let state = {
            let mut prng = StatefulBarakHalevi::create_from_seed(&path, b"seed", 100).unwrap();
            let mut out = [0u8; 8];
            prng.fill_bytes(&mut out).unwrap();
            *prng.inner.state()
        };

        let reopened = StatefulBarakHalevi::open(&path, 100).unwrap();
        assert_eq!(reopened.state(), &state);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn file_holds_exactly_the_state() {
        let path = scratch_file("raw");
        let mut prng = StatefulBarakHalevi::create_from_seed(&path, b"seed", 100).unwrap();

        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk.len(), STATE_LEN);
        assert_eq!(&on_disk[..], &prng.inner.state()[..]);

        // Below the autosave threshold the file stays put.
        let mut out = [0u8; 8];
        prng.fill_bytes(&mut out).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), on_disk);

        drop(prng);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn autosave_counter_flushes() {
        let path = scratch_file("autosave");
        let mut prng = StatefulBarakHalevi::create_from_seed(&path, b"seed", 2).unwrap();

        let mut out = [0u8; 8];
        prng.fill_bytes(&mut out).unwrap();
        prng.fill_bytes(&mut out).unwrap();

        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(&on_disk[..], &prng.inner.state()[..]);

        drop(prng);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn truncated_state_is_refused() {
        let path = scratch_file("short");
        std::fs::write(&path, [0u8; STATE_LEN - 1]).unwrap();

        match StatefulBarakHalevi::open(&path, 100) {
            Err(Error::PrngState { path: reported }) => assert_eq!(reported, path),
            other => panic!("expected a state error, got {:?}", other.map(|_| ())),
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_state_is_refused() {
        let path = scratch_file("missing");
        assert!(StatefulBarakHalevi::open(&path, 100).is_err());
    }
}
