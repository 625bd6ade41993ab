//! Strict DER encoding and parsing.
//!
//! The encoder always emits the shortest form; the parser accepts exactly
//! what the encoder produces: definite lengths only, at most four length
//! bytes, tag numbers up to 30. Everything is built from [`Node`], a
//! single (class, method, tag, value) TLV element.

use num_bigint::BigUint;

use crate::buffer::SecBuf;
use crate::errors::{Error, Result};

pub mod oid;
pub mod tbs;
mod types;

pub use self::types::{
    bit_string_to_flags, flags_to_bit_string, Asn1EncryptAlgo, Asn1HashAlgo, Asn1Integer,
    Asn1Object, Asn1SignAlgo, Dn, Extension, PubKeyAlgo, SignAlgo, Validity, Version,
    MAX_DN_ATTRIBUTES,
};

/* Universal tag numbers. */
pub const T_BOOL: u8 = 1;
pub const T_INT: u8 = 2;
pub const T_BIT_STR: u8 = 3;
pub const T_OCTET_STR: u8 = 4;
pub const T_NULL: u8 = 5;
pub const T_OID: u8 = 6;
pub const T_UTF8_STR: u8 = 12;
pub const T_SEQ: u8 = 16;
pub const T_SET: u8 = 17;
pub const T_PRINTABLE_STR: u8 = 19;
pub const T_T61_STR: u8 = 20;
pub const T_IA5_STR: u8 = 22;
pub const T_UTC_TIME: u8 = 23;
pub const T_GENERALIZED_TIME: u8 = 24;

/// DER boolean TRUE content octet.
pub const B_TRUE: u8 = 0xff;
/// DER boolean FALSE content octet.
pub const B_FALSE: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Universal = 0,
    Application = 1,
    ContextSpecific = 2,
    Private = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Primitive = 0,
    Constructed = 1,
}

/// One TLV element. The value of a constructed element is the raw DER of
/// its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub class: Class,
    pub method: Method,
    pub tag: u8,
    pub value: SecBuf,
}

/// Cursor exhaustion inside the parser surfaces as a DER-level error.
fn eof_to_der(err: Error) -> Error {
    match err {
        Error::OutOfBounds => Error::der_invalid("reached end of input too early"),
        other => Error::unexpected(&other.to_string()),
    }
}

/// Extracts and validates the tag number of an identifier octet. Tag
/// numbers above 30 (high form) are not supported; universal tags must
/// belong to the known set.
fn tag_number(class: Class, id_octet: u8) -> Result<u8> {
    if id_octet & 0x1f == 0x1f {
        return Err(Error::not_implemented("unknown object type"));
    }

    let tag = id_octet & 0x1f;
    if class == Class::Universal {
        match tag {
            T_BOOL | T_INT | T_BIT_STR | T_OCTET_STR | T_NULL | T_OID | T_UTF8_STR | T_SEQ
            | T_SET | T_PRINTABLE_STR | T_T61_STR | T_IA5_STR | T_UTC_TIME
            | T_GENERALIZED_TIME => Ok(tag),
            _ => Err(Error::not_implemented("unknown object type")),
        }
    } else {
        Ok(tag)
    }
}

/// Reads a length field and leaves the cursor on the content. Long forms
/// of five or more bytes (lengths beyond 32 bits) are refused.
fn parse_length(src: &mut SecBuf) -> Result<usize> {
    let run = |src: &mut SecBuf| -> Result<usize> {
        let first = src.get_u8()?;
        let mut count = if first & 0x80 != 0 {
            src.pop_u8()?;
            first & 0x7f
        } else {
            1
        };

        if count >= 5 {
            return Err(Error::not_implemented("ASN.1 object is too big"));
        }

        let mut size = 0usize;
        while count > 0 {
            count -= 1;
            size |= (src.pop_u8()? as usize) << (8 * count as usize);
        }
        Ok(size)
    };

    run(src).map_err(|e| match e {
        Error::NotImplemented { .. } => e,
        other => eof_to_der(other),
    })
}

/// Emits a length field in shortest form.
fn push_length(out: &mut Vec<u8>, len: usize) {
    if len < 128 {
        out.push(len as u8);
        return;
    }

    let mut count = 0;
    let mut tmp = len;
    while tmp != 0 {
        count += 1;
        tmp >>= 8;
    }

    out.push(0x80 | count as u8);
    for i in (0..count).rev() {
        out.push((len >> (8 * i)) as u8);
    }
}

impl Node {
    /// Builds an element. A universal primitive INTEGER value is
    /// normalised on the way in: leading zero bytes are stripped, then a
    /// single zero byte is prepended iff the top bit of the remaining
    /// leading byte is set (only non-negative integers exist here).
    pub fn new(class: Class, method: Method, tag: u8, value: SecBuf) -> Node {
        let value = if class == Class::Universal && method == Method::Primitive && tag == T_INT {
            let bytes = value.as_bytes();
            let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
            let stripped = &bytes[start..];
            if !stripped.is_empty() && stripped[0] & 0x80 != 0 {
                let mut padded = Vec::with_capacity(stripped.len() + 1);
                padded.push(0);
                padded.extend_from_slice(stripped);
                SecBuf::from(padded)
            } else {
                SecBuf::from(stripped)
            }
        } else {
            value
        };

        Node {
            class,
            method,
            tag,
            value,
        }
    }

    pub fn null() -> Node {
        Node::new(Class::Universal, Method::Primitive, T_NULL, SecBuf::new())
    }

    /// Reads one element from the cursor of `src`, advancing past it.
    pub fn parse(src: &mut SecBuf) -> Result<Node> {
        let id_octet = src.pop_u8().map_err(eof_to_der)?;
        let class = match id_octet >> 6 {
            0 => Class::Universal,
            1 => Class::Application,
            2 => Class::ContextSpecific,
            _ => Class::Private,
        };
        let method = if id_octet & 0x20 != 0 {
            Method::Constructed
        } else {
            Method::Primitive
        };
        let tag = tag_number(class, id_octet)?;

        let len = parse_length(src)?;
        let value = src.pop_sub(len).map_err(eof_to_der)?;

        Ok(Node {
            class,
            method,
            tag,
            value,
        })
    }

    /// Parses one element and insists on its identity, reporting `err`
    /// on mismatch.
    pub fn expect(
        src: &mut SecBuf,
        class: Class,
        method: Method,
        tag: u8,
        err: Error,
    ) -> Result<Node> {
        let node = Node::parse(src)?;
        if node.class != class || node.method != method || node.tag != tag {
            return Err(err);
        }
        Ok(node)
    }

    /// As [`Node::expect`], additionally pinning the content bytes.
    pub fn expect_value(
        src: &mut SecBuf,
        class: Class,
        method: Method,
        tag: u8,
        value: &[u8],
        err: Error,
    ) -> Result<Node> {
        let node = Node::expect(src, class, method, tag, err.clone())?;
        if node.value.as_bytes() != value {
            return Err(err);
        }
        Ok(node)
    }

    pub fn to_der(&self) -> SecBuf {
        let mut out = Vec::with_capacity(self.value.len() + 6);
        out.push(
            ((self.class as u8 & 0x03) << 6) | ((self.method as u8 & 0x01) << 5) | (self.tag & 0x1f),
        );
        push_length(&mut out, self.value.len());
        out.extend_from_slice(self.value.as_bytes());
        SecBuf::from(out)
    }

    /// Human-readable rendering of the element.
    pub fn display(&self) -> Result<String> {
        match self.tag {
            T_NULL => Ok("<empty element>".into()),
            T_INT | T_OCTET_STR => {
                let hexed = self.value.to_ascii_hex(Some(b':'));
                Ok(String::from_utf8_lossy(hexed.as_bytes()).into_owned())
            }
            T_SEQ => Ok("sequence".into()),
            T_SET => Ok("set".into()),
            T_BIT_STR => Ok("bit string".into()),
            T_OID => {
                if let Some(entry) = oid::lookup(self.value.as_bytes()) {
                    return Ok(entry.desc.into());
                }
                dotted_oid(self.value.as_bytes())
            }
            T_PRINTABLE_STR | T_IA5_STR | T_T61_STR | T_UTF8_STR => {
                Ok(String::from_utf8_lossy(self.value.as_bytes()).into_owned())
            }
            T_UTC_TIME | T_GENERALIZED_TIME => Ok(date_to_string(self.value.as_bytes())),
            _ => Err(Error::not_implemented("cannot render this tag number")),
        }
    }
}

/// Renders an unknown OID as its dotted numeric arcs.
fn dotted_oid(value: &[u8]) -> Result<String> {
    if value.len() < 2 {
        return Err(Error::unexpected("reached an invalid object identifier"));
    }

    let first = value[0];
    let mut out = format!("{}.{}", first / 40, first % 40);

    let mut arc: u64 = 0;
    for &byte in &value[1..] {
        arc += (byte & 0x7f) as u64;
        if byte & 0x80 != 0 {
            arc *= 0x80;
        } else {
            out.push('.');
            out.push_str(&arc.to_string());
            arc = 0;
        }
    }
    if arc != 0 {
        // A continuation byte announced more arcs than were present.
        return Err(Error::unexpected("reached an invalid object identifier"));
    }

    Ok(out)
}

/// Readable form of a UTCTime value (YYMMDDhhmm[ss]Z). Anything else is
/// returned unchanged.
fn date_to_string(raw: &[u8]) -> String {
    let unchanged = || String::from_utf8_lossy(raw).into_owned();

    let text = match core::str::from_utf8(raw) {
        Ok(text) => text,
        Err(_) => return unchanged(),
    };
    if !text.is_ascii() {
        return unchanged();
    }

    let (body, seconds) = match text.len() {
        11 => (&text[..10], "00"),
        13 => (&text[..12], &text[10..12]),
        _ => return unchanged(),
    };
    if !text.ends_with('Z') || !body.bytes().all(|b| b.is_ascii_digit()) {
        return unchanged();
    }

    format!(
        "{}/{}/20{} {}:{}:{}",
        &body[4..6],
        &body[2..4],
        &body[..2],
        &body[6..8],
        &body[8..10],
        seconds
    )
}

/// Opens the constructed element under the cursor and returns its
/// content; only SEQUENCE and SET containers can be opened.
pub fn decapsulate(src: &mut SecBuf, tag: u8) -> Result<SecBuf> {
    let run = |src: &mut SecBuf| -> Result<SecBuf> {
        let id_octet = src.pop_u8()?;
        if tag_number(Class::Universal, id_octet)? != tag {
            return match tag {
                T_SET => Err(Error::DerSetExpected),
                T_SEQ => Err(Error::DerSequenceExpected),
                _ => Err(Error::not_implemented(
                    "decapsulate expects SET or SEQUENCE",
                )),
            };
        }
        let len = parse_length(src)?;
        src.pop_sub(len)
    };

    run(src).map_err(|e| match e {
        Error::OutOfBounds => eof_to_der(e),
        other => other,
    })
}

/// Wraps `content` in a constructed element.
pub fn encapsulate(content: &SecBuf, tag: u8) -> SecBuf {
    encapsulate_in(content, tag, Class::Universal)
}

pub fn encapsulate_in(content: &SecBuf, tag: u8, class: Class) -> SecBuf {
    Node::new(class, Method::Constructed, tag, content.clone()).to_der()
}

/// Reads a big-endian unsigned INTEGER-shaped element. The element is
/// taken as found, without tag enforcement; checked callers wrap it.
pub(crate) fn parse_uint(src: &mut SecBuf) -> Result<BigUint> {
    let node = Node::parse(src)?;
    Ok(node.value.to_biguint())
}
