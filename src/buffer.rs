//! Owning byte buffer with a read/write cursor and a wiping release.
//!
//! `SecBuf` is the working container for every byte string that may carry
//! secret material: DER fragments, generator output, serialized keys. The
//! backing storage is overwritten (all ones, then all zeros) before it is
//! returned to the allocator.

use core::fmt;
use core::ops::{Add, AddAssign};

use num_bigint::{BigInt, BigUint, Sign};
use zeroize::Zeroize;

use crate::errors::{Error, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

pub struct SecBuf {
    bytes: Vec<u8>,
    index: usize,
}

impl SecBuf {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        SecBuf {
            bytes: Vec::new(),
            index: 0,
        }
    }

    /// Creates a zero-filled buffer of `len` bytes.
    pub fn with_len(len: usize) -> Self {
        SecBuf {
            bytes: vec![0u8; len],
            index: 0,
        }
    }

    /// Creates a buffer holding the decimal representation of `val`,
    /// left-padded with zeros to at least `min` characters.
    pub fn from_decimal(val: u64, min: usize) -> Self {
        let mut digits = 0;
        let mut v = val;
        while v != 0 {
            digits += 1;
            v /= 10;
        }
        if digits < min {
            digits = min;
        }

        let mut out = vec![0u8; digits];
        v = val;
        for i in 0..digits {
            out[digits - 1 - i] = b'0' + (v % 10) as u8;
            v /= 10;
        }
        SecBuf {
            bytes: out,
            index: 0,
        }
    }

    /// Creates a buffer holding the big-endian binary form of `n`.
    pub fn from_biguint(n: &BigUint) -> Self {
        SecBuf {
            bytes: n.to_bytes_be(),
            index: 0,
        }
    }

    /// Creates a buffer holding the printable hexadecimal form of `n`.
    pub fn from_biguint_hex(n: &BigUint) -> Self {
        SecBuf::from_biguint(n).to_ascii_hex(None)
    }

    /// Creates a buffer from a signed big integer. Negative values are
    /// refused with [`Error::NegativeBignum`].
    pub fn from_bigint(n: &BigInt) -> Result<Self> {
        if n.sign() == Sign::Minus {
            return Err(Error::NegativeBignum);
        }
        let magnitude = n.to_biguint().ok_or(Error::NegativeBignum)?;
        Ok(SecBuf::from_biguint(&magnitude))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Interprets the content as a big-endian unsigned integer.
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.bytes)
    }

    /// Returns `self[start..start + len]` as a fresh buffer.
    pub fn substring(&self, start: usize, len: usize) -> Result<SecBuf> {
        let end = start.checked_add(len).ok_or(Error::OutOfBounds)?;
        if end > self.bytes.len() {
            return Err(Error::OutOfBounds);
        }
        Ok(SecBuf::from(&self.bytes[start..end]))
    }

    /* Cursor handling */

    /// Positions the cursor. The cursor may sit one past the last byte,
    /// which is the end-of-buffer state.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.bytes.len() {
            return Err(Error::OutOfBounds);
        }
        self.index = pos;
        Ok(())
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn eof(&self) -> bool {
        self.index >= self.bytes.len()
    }

    /// Reads the byte under the cursor without advancing.
    pub fn get_u8(&self) -> Result<u8> {
        self.bytes.get(self.index).copied().ok_or(Error::OutOfBounds)
    }

    /// Reads the byte under the cursor and advances.
    pub fn pop_u8(&mut self) -> Result<u8> {
        let b = self.get_u8()?;
        self.index += 1;
        Ok(b)
    }

    /// Reads `len` bytes from the cursor into a fresh buffer and advances.
    pub fn pop_sub(&mut self, len: usize) -> Result<SecBuf> {
        let out = self.substring(self.index, len)?;
        self.index += len;
        Ok(out)
    }

    /// Reads up to, but not including, the next '\n'. The newline itself
    /// is consumed. Without a newline, the rest of the buffer is returned.
    pub fn pop_line(&mut self) -> Result<SecBuf> {
        if self.index > self.bytes.len() {
            return Err(Error::OutOfBounds);
        }
        let rest = &self.bytes[self.index..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(nl) => {
                let out = SecBuf::from(&rest[..nl]);
                self.index += nl + 1;
                Ok(out)
            }
            None => {
                let out = SecBuf::from(rest);
                self.index = self.bytes.len();
                Ok(out)
            }
        }
    }

    /// Overwrites the byte under the cursor and advances. The buffer
    /// never grows through the cursor.
    pub fn push_u8(&mut self, b: u8) -> Result<()> {
        if self.index >= self.bytes.len() {
            return Err(Error::OutOfBounds);
        }
        self.bytes[self.index] = b;
        self.index += 1;
        Ok(())
    }

    /// Overwrites from the cursor with the whole content of `src`.
    pub fn push_bytes(&mut self, src: &[u8]) -> Result<()> {
        let end = self.index.checked_add(src.len()).ok_or(Error::OutOfBounds)?;
        if end > self.bytes.len() {
            return Err(Error::OutOfBounds);
        }
        self.bytes[self.index..end].copy_from_slice(src);
        self.index = end;
        Ok(())
    }

    /* Filename helpers */

    fn last_slash(&self) -> Result<usize> {
        self.bytes
            .iter()
            .rposition(|&b| b == b'/')
            .ok_or(Error::NoSlashFound)
    }

    /// Part after the last '/'; the whole input if there is none.
    pub fn basename(&self) -> SecBuf {
        match self.last_slash() {
            Ok(pos) => SecBuf::from(&self.bytes[pos + 1..]),
            Err(_) => self.clone(),
        }
    }

    /// Part up to and including the last '/'; "./" if there is none.
    pub fn dirname(&self) -> SecBuf {
        match self.last_slash() {
            Ok(pos) => SecBuf::from(&self.bytes[..pos + 1]),
            Err(_) => SecBuf::from(&b"./"[..]),
        }
    }

    pub fn check_extension(&self, ext: &[u8]) -> bool {
        self.bytes.ends_with(ext)
    }

    /// Replaces the trailing `old` extension with `new`.
    pub fn change_extension(&self, old: &[u8], new: &[u8]) -> Result<SecBuf> {
        if !self.check_extension(old) {
            return Err(Error::BadExtension);
        }
        let stem = &self.bytes[..self.bytes.len() - old.len()];
        let mut out = Vec::with_capacity(stem.len() + new.len());
        out.extend_from_slice(stem);
        out.extend_from_slice(new);
        Ok(SecBuf::from(out))
    }

    /* Hexadecimal conversions */

    /// Printable hexadecimal copy, with an optional delimiter between
    /// the representation of each byte.
    pub fn to_ascii_hex(&self, delimiter: Option<u8>) -> SecBuf {
        let per_byte = if delimiter.is_some() { 3 } else { 2 };
        let mut out = Vec::with_capacity(self.bytes.len() * per_byte);
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                if let Some(d) = delimiter {
                    out.push(d);
                }
            }
            out.push(HEX_DIGITS[(b >> 4) as usize]);
            out.push(HEX_DIGITS[(b & 0xf) as usize]);
        }
        SecBuf::from(out)
    }

    /// In-place variant of [`SecBuf::to_ascii_hex`].
    pub fn ascii_hex_in_place(&mut self, delimiter: Option<u8>) {
        let hexed = self.to_ascii_hex(delimiter);
        *self = hexed;
    }

    /// Reinterprets a printable hexadecimal content as binary, in place.
    /// An odd-length input is read with an implicit leading zero digit.
    pub fn hex_to_binary_in_place(&mut self) -> Result<()> {
        fn nibble(c: u8) -> Result<u8> {
            match c {
                b'0'..=b'9' => Ok(c - b'0'),
                b'a'..=b'f' => Ok(c - b'a' + 10),
                b'A'..=b'F' => Ok(c - b'A' + 10),
                _ => Err(Error::InvalidHexString),
            }
        }

        let mut out = Vec::with_capacity(self.bytes.len() / 2 + 1);
        let mut chunk = self.bytes.as_slice();
        if chunk.len() % 2 == 1 {
            out.push(nibble(chunk[0])?);
            chunk = &chunk[1..];
        }
        for pair in chunk.chunks_exact(2) {
            out.push((nibble(pair[0])? << 4) | nibble(pair[1])?);
        }
        *self = SecBuf::from(out);
        Ok(())
    }
}

impl Default for SecBuf {
    fn default() -> Self {
        SecBuf::new()
    }
}

impl From<&[u8]> for SecBuf {
    fn from(src: &[u8]) -> Self {
        SecBuf {
            bytes: src.to_vec(),
            index: 0,
        }
    }
}

impl<const N: usize> From<&[u8; N]> for SecBuf {
    fn from(src: &[u8; N]) -> Self {
        SecBuf::from(&src[..])
    }
}

impl From<Vec<u8>> for SecBuf {
    fn from(bytes: Vec<u8>) -> Self {
        SecBuf { bytes, index: 0 }
    }
}

impl Clone for SecBuf {
    fn clone(&self) -> Self {
        // The cursor is not part of the value.
        SecBuf {
            bytes: self.bytes.clone(),
            index: 0,
        }
    }
}

/// Length plus byte-exact comparison. Behaves like `memcmp`, and is not
/// safe against timing attacks.
impl PartialEq for SecBuf {
    fn eq(&self, other: &SecBuf) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for SecBuf {}

impl Add<&SecBuf> for &SecBuf {
    type Output = SecBuf;

    fn add(self, rhs: &SecBuf) -> SecBuf {
        let mut out = Vec::with_capacity(self.bytes.len() + rhs.bytes.len());
        out.extend_from_slice(&self.bytes);
        out.extend_from_slice(&rhs.bytes);
        SecBuf::from(out)
    }
}

impl AddAssign<&SecBuf> for SecBuf {
    fn add_assign(&mut self, rhs: &SecBuf) {
        let mut out = Vec::with_capacity(self.bytes.len() + rhs.bytes.len());
        out.extend_from_slice(&self.bytes);
        out.extend_from_slice(&rhs.bytes);
        *self = SecBuf::from(out);
    }
}

impl fmt::Debug for SecBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecBuf({} bytes)", self.bytes.len())
    }
}

impl Drop for SecBuf {
    fn drop(&mut self) {
        // Ones pass through a volatile view, then the zeroising wipe.
        for b in self.bytes.iter_mut() {
            unsafe { core::ptr::write_volatile(b, 0xff) };
        }
        self.bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn decimal_padding() {
        assert_eq!(SecBuf::from_decimal(7, 3).as_bytes(), b"007");
        assert_eq!(SecBuf::from_decimal(1234, 2).as_bytes(), b"1234");
        assert_eq!(SecBuf::from_decimal(0, 0).as_bytes(), b"");
        assert_eq!(SecBuf::from_decimal(0, 2).as_bytes(), b"00");
    }

    #[test]
    fn bignum_constructors() {
        let n = BigUint::from_u64(0x1234).unwrap();
        assert_eq!(SecBuf::from_biguint(&n).as_bytes(), &[0x12, 0x34]);
        assert_eq!(SecBuf::from_biguint_hex(&n).as_bytes(), b"1234");

        let neg = BigInt::from_i64(-5).unwrap();
        assert_eq!(SecBuf::from_bigint(&neg), Err(Error::NegativeBignum));
        let pos = BigInt::from_i64(5).unwrap();
        assert_eq!(SecBuf::from_bigint(&pos).unwrap().as_bytes(), &[5]);
    }

    #[test]
    fn cursor_bounds() {
        let mut buf = SecBuf::from(&b"abc"[..]);
        assert_eq!(buf.pop_u8().unwrap(), b'a');
        assert_eq!(buf.pop_sub(2).unwrap().as_bytes(), b"bc");
        assert!(buf.eof());
        assert_eq!(buf.pop_u8(), Err(Error::OutOfBounds));

        buf.seek(0).unwrap();
        assert_eq!(buf.pop_sub(4), Err(Error::OutOfBounds));
        assert_eq!(buf.seek(4), Err(Error::OutOfBounds));
    }

    #[test]
    fn cursor_writes() {
        let mut buf = SecBuf::with_len(4);
        buf.push_u8(0xde).unwrap();
        buf.push_bytes(&[0xad, 0xbe, 0xef]).unwrap();
        assert_eq!(buf.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(buf.push_u8(0), Err(Error::OutOfBounds));
    }

    #[test]
    fn line_pop() {
        let mut buf = SecBuf::from(&b"one\ntwo\nlast"[..]);
        assert_eq!(buf.pop_line().unwrap().as_bytes(), b"one");
        assert_eq!(buf.pop_line().unwrap().as_bytes(), b"two");
        assert_eq!(buf.pop_line().unwrap().as_bytes(), b"last");
        assert!(buf.eof());
    }

    #[test]
    fn substring_bounds() {
        let buf = SecBuf::from(&b"hello"[..]);
        assert_eq!(buf.substring(1, 3).unwrap().as_bytes(), b"ell");
        assert_eq!(buf.substring(3, 3), Err(Error::OutOfBounds));
        assert_eq!(buf.substring(5, 0).unwrap().as_bytes(), b"");
    }

    #[test]
    fn path_helpers() {
        let path = SecBuf::from(&b"/var/tmp/state.bin"[..]);
        assert_eq!(path.basename().as_bytes(), b"state.bin");
        assert_eq!(path.dirname().as_bytes(), b"/var/tmp/");

        let bare = SecBuf::from(&b"state.bin"[..]);
        assert_eq!(bare.basename().as_bytes(), b"state.bin");
        assert_eq!(bare.dirname().as_bytes(), b"./");
    }

    #[test]
    fn extensions() {
        let path = SecBuf::from(&b"key.der"[..]);
        assert!(path.check_extension(b".der"));
        assert!(!path.check_extension(b".pem"));
        assert_eq!(
            path.change_extension(b".der", b".pem").unwrap().as_bytes(),
            b"key.pem"
        );
        assert_eq!(path.change_extension(b".pem", b".der"), Err(Error::BadExtension));
    }

    #[test]
    fn hex_round_trip() {
        let buf = SecBuf::from(&[0x12u8, 0x34, 0xab][..]);
        assert_eq!(buf.to_ascii_hex(None).as_bytes(), b"1234ab");
        assert_eq!(buf.to_ascii_hex(Some(b':')).as_bytes(), b"12:34:ab");

        let mut hexed = buf.to_ascii_hex(None);
        hexed.hex_to_binary_in_place().unwrap();
        assert_eq!(hexed, buf);

        let mut odd = SecBuf::from(&b"fab"[..]);
        odd.hex_to_binary_in_place().unwrap();
        assert_eq!(odd.as_bytes(), &[0x0f, 0xab]);

        let mut bad = SecBuf::from(&b"zz"[..]);
        assert_eq!(bad.hex_to_binary_in_place(), Err(Error::InvalidHexString));
    }

    #[test]
    fn concat_and_equality() {
        let a = SecBuf::from(&b"ab"[..]);
        let b = SecBuf::from(&b"cd"[..]);
        let mut ab = &a + &b;
        assert_eq!(ab.as_bytes(), b"abcd");
        ab += &a;
        assert_eq!(ab.as_bytes(), b"abcdab");
        assert_eq!(a, SecBuf::from(&b"ab"[..]));
        assert_ne!(a, b);
    }
}
