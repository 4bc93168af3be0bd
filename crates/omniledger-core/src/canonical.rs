//! Deterministic CBOR (RFC 8949 §4.2.1) for everything that gets hashed or
//! signed: darc ids, instruction payloads and transaction hashes.
//!
//! Heads use the shortest argument form, lengths are always definite, and map
//! entries are ordered by the bytes of their encoded keys. Strings carry their
//! length in the head, so adjacent fields cannot be re-split.
//!
//! Plain wire messages go through serde instead, see [`to_cbor`] and
//! [`from_cbor`].

use ciborium::value::{Integer, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, Result};

const MAJOR_UINT: u8 = 0;
const MAJOR_NINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;

const FALSE: u8 = 0xf4;
const TRUE: u8 = 0xf5;
const NULL: u8 = 0xf6;
const UNDEFINED: u8 = 0xf7;
const FLOAT64: u8 = 0xfb;

/// Canonical bytes of `value`.
pub fn encode_canonical(value: &Value) -> Vec<u8> {
    let mut out = Encoder::default();
    out.value(value);
    out.0
}

/// Serialize a wire type to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    Ok(out)
}

/// Deserialize a wire type from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| CoreError::DecodingError(e.to_string()))
}

pub fn uint(n: u64) -> Value {
    Value::Integer(n.into())
}

pub fn bytes(b: &[u8]) -> Value {
    Value::Bytes(b.to_vec())
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_owned())
}

#[derive(Default)]
struct Encoder(Vec<u8>);

impl Encoder {
    /// Major type plus argument, in the shortest form that holds `arg`.
    fn head(&mut self, major: u8, arg: u64) {
        let major = major << 5;
        match arg {
            0..=23 => self.0.push(major | arg as u8),
            24..=0xff => self.0.extend_from_slice(&[major | 24, arg as u8]),
            0x100..=0xffff => {
                self.0.push(major | 25);
                self.0.extend_from_slice(&(arg as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.0.push(major | 26);
                self.0.extend_from_slice(&(arg as u32).to_be_bytes());
            }
            _ => {
                self.0.push(major | 27);
                self.0.extend_from_slice(&arg.to_be_bytes());
            }
        }
    }

    fn string(&mut self, major: u8, data: &[u8]) {
        self.head(major, data.len() as u64);
        self.0.extend_from_slice(data);
    }

    fn integer(&mut self, i: Integer) {
        let n = i128::from(i);
        if n < 0 {
            // -1 - n fits in u64 for every value ciborium can hold.
            self.head(MAJOR_NINT, (-1 - n) as u64);
        } else {
            self.head(MAJOR_UINT, n as u64);
        }
    }

    fn map(&mut self, entries: &[(Value, Value)]) {
        let mut keyed: Vec<(Vec<u8>, &Value)> = entries
            .iter()
            .map(|(k, v)| (encode_canonical(k), v))
            .collect();
        keyed.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        self.head(MAJOR_MAP, keyed.len() as u64);
        for (key, value) in keyed {
            self.0.extend_from_slice(&key);
            self.value(value);
        }
    }

    fn value(&mut self, value: &Value) {
        match value {
            Value::Integer(i) => self.integer(*i),
            Value::Bytes(b) => self.string(MAJOR_BYTES, b),
            Value::Text(s) => self.string(MAJOR_TEXT, s.as_bytes()),
            Value::Array(items) => {
                self.head(MAJOR_ARRAY, items.len() as u64);
                items.iter().for_each(|item| self.value(item));
            }
            Value::Map(entries) => self.map(entries),
            Value::Tag(tag, inner) => {
                self.head(MAJOR_TAG, *tag);
                self.value(inner);
            }
            Value::Bool(b) => self.0.push(if *b { TRUE } else { FALSE }),
            Value::Null => self.0.push(NULL),
            Value::Float(f) => {
                self.0.push(FLOAT64);
                self.0.extend_from_slice(&f.to_be_bytes());
            }
            _ => self.0.push(UNDEFINED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn head(major: u8, arg: u64) -> Vec<u8> {
        let mut enc = Encoder::default();
        enc.head(major, arg);
        enc.0
    }

    #[test]
    fn test_heads_are_shortest() {
        assert_eq!(head(MAJOR_UINT, 10), [0x0a]);
        assert_eq!(head(MAJOR_UINT, 24), [0x18, 0x18]);
        assert_eq!(head(MAJOR_UINT, 500), [0x19, 0x01, 0xf4]);
        assert_eq!(head(MAJOR_UINT, 70_000), [0x1a, 0x00, 0x01, 0x11, 0x70]);
        assert_eq!(head(MAJOR_BYTES, 1 << 40).len(), 9);
        assert_eq!(head(MAJOR_MAP, 3), [0xa3]);
    }

    #[test]
    fn test_negative_integers() {
        assert_eq!(encode_canonical(&Value::Integer((-10i64).into())), [0x29]);
        assert_eq!(encode_canonical(&Value::Integer((-100i64).into())), [0x38, 0x63]);
    }

    #[test]
    fn test_strings_carry_their_length() {
        assert_eq!(encode_canonical(&bytes(&[9, 9, 9])), [0x43, 9, 9, 9]);
        assert_eq!(encode_canonical(&text("_sign")), b"\x65_sign");
        assert_ne!(
            encode_canonical(&Value::Array(vec![text("ab"), text("c")])),
            encode_canonical(&Value::Array(vec![text("a"), text("bc")]))
        );
    }

    #[test]
    fn test_map_order_ignores_insertion_order() {
        let rules = [
            ("spawn:value", 1),
            ("_sign", 2),
            ("invoke:evolve", 3),
            ("_evolve", 4),
        ];
        let forward = Value::Map(rules.iter().map(|(k, v)| (text(k), uint(*v))).collect());
        let backward = Value::Map(
            rules
                .iter()
                .rev()
                .map(|(k, v)| (text(k), uint(*v)))
                .collect(),
        );

        let encoded = encode_canonical(&forward);
        assert_eq!(encoded, encode_canonical(&backward));
        // Shortest key first: "_sign" has the smallest head.
        assert_eq!(&encoded[1..7], b"\x65_sign");
    }

    #[test]
    fn test_integer_keys_sort_numerically_within_a_width() {
        let map = Value::Map(vec![
            (uint(4), bytes(b"d")),
            (uint(0), bytes(b"a")),
            (uint(2), bytes(b"c")),
        ]);
        assert_eq!(
            encode_canonical(&map),
            [0xa3, 0x00, 0x41, b'a', 0x02, 0x41, b'c', 0x04, 0x41, b'd']
        );
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Envelope {
        kind: String,
        body: Vec<u8>,
    }

    #[test]
    fn test_serde_wire_helpers() {
        let env = Envelope {
            kind: "darc".into(),
            body: vec![0xde, 0xad],
        };
        let back: Envelope = from_cbor(&to_cbor(&env).unwrap()).unwrap();
        assert_eq!(back, env);

        assert!(matches!(
            from_cbor::<Envelope>(&[0xff, 0x00]),
            Err(CoreError::DecodingError(_))
        ));
    }
}
