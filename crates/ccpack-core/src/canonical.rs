//! Canonical CBOR encoding for deterministic serialization.
//!
//! Every record in this crate is encoded as a CBOR map with small integer
//! keys, following RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! The same record always produces identical bytes, so digest records and
//! packages hash the same on every platform.
//!
//! Decoding goes through `ciborium` into a [`Value`] and then through
//! [`MapView`], which performs the typed field extraction. Unknown keys are
//! ignored; duplicate keys and trailing bytes are rejected.

use ciborium::value::{Integer, Value};

use crate::error::{CoreError, Result};

/// Records that can be encoded to canonical CBOR.
pub trait CanonicalEncode {
    /// Convert to a CBOR value (a map with integer keys).
    fn to_cbor_value(&self) -> Value;

    /// Encode to canonical bytes.
    fn canonical_bytes(&self) -> Vec<u8> {
        encode_canonical(&self.to_cbor_value())
    }
}

/// Records that can be decoded from canonical CBOR.
pub trait CanonicalDecode: Sized {
    /// Record name used in decode errors.
    const RECORD: &'static str;

    /// Convert from a decoded CBOR value.
    fn from_cbor_value(value: &Value) -> Result<Self>;

    /// Decode from bytes. The input must hold exactly one CBOR item.
    fn from_canonical_bytes(bytes: &[u8]) -> Result<Self> {
        let value = decode_value(bytes, Self::RECORD)?;
        Self::from_cbor_value(&value)
    }
}

/// Build a map entry with an integer key.
pub(crate) fn entry(key: u64, value: Value) -> (Value, Value) {
    (Value::Integer(key.into()), value)
}

/// Build a byte-string value.
pub(crate) fn bytes_value(bytes: &[u8]) -> Value {
    Value::Bytes(bytes.to_vec())
}

/// Parse a single CBOR item from `bytes`.
pub fn decode_value(bytes: &[u8], record: &'static str) -> Result<Value> {
    if bytes.is_empty() {
        return Err(CoreError::decoding(record, "empty input"));
    }

    let mut cursor = std::io::Cursor::new(bytes);
    let value: Value = ciborium::from_reader(&mut cursor)
        .map_err(|e| CoreError::decoding(record, e.to_string()))?;

    if cursor.position() != bytes.len() as u64 {
        return Err(CoreError::decoding(
            record,
            format!(
                "{} trailing bytes after record",
                bytes.len() as u64 - cursor.position()
            ),
        ));
    }

    Ok(value)
}

/// Typed read access to a decoded CBOR map with integer keys.
pub(crate) struct MapView<'a> {
    record: &'static str,
    entries: &'a [(Value, Value)],
}

impl<'a> MapView<'a> {
    /// Wrap a value that must be a map with unique integer keys.
    pub(crate) fn new(value: &'a Value, record: &'static str) -> Result<Self> {
        let entries = match value {
            Value::Map(entries) => entries.as_slice(),
            _ => return Err(CoreError::decoding(record, "expected map")),
        };

        let mut seen = Vec::with_capacity(entries.len());
        for (key, _) in entries {
            let key = match key {
                Value::Integer(i) => i128::from(*i),
                _ => return Err(CoreError::decoding(record, "map keys must be integers")),
            };
            if seen.contains(&key) {
                return Err(CoreError::decoding(record, format!("duplicate key {}", key)));
            }
            seen.push(key);
        }

        Ok(Self { record, entries })
    }

    fn get(&self, key: u64) -> Option<&'a Value> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == i128::from(key)))
            .map(|(_, v)| v)
    }

    fn error(&self, reason: impl Into<String>) -> CoreError {
        CoreError::decoding(self.record, reason)
    }

    /// Whether the key is present.
    pub(crate) fn contains(&self, key: u64) -> bool {
        self.get(key).is_some()
    }

    /// A required byte string.
    pub(crate) fn bytes(&self, key: u64, field: &str) -> Result<Vec<u8>> {
        match self.get(key) {
            Some(Value::Bytes(b)) => Ok(b.clone()),
            Some(_) => Err(self.error(format!("{} must be a byte string", field))),
            None => Err(self.error(format!("missing {}", field))),
        }
    }

    /// An optional byte string; absent means empty.
    pub(crate) fn bytes_or_empty(&self, key: u64, field: &str) -> Result<Vec<u8>> {
        if self.contains(key) {
            self.bytes(key, field)
        } else {
            Ok(Vec::new())
        }
    }

    /// An optional text string; absent means empty.
    pub(crate) fn text_or_empty(&self, key: u64, field: &str) -> Result<String> {
        match self.get(key) {
            Some(Value::Text(s)) => Ok(s.clone()),
            Some(_) => Err(self.error(format!("{} must be a text string", field))),
            None => Ok(String::new()),
        }
    }

    /// An optional integer; absent means zero.
    pub(crate) fn int_or_zero<T>(&self, key: u64, field: &str) -> Result<T>
    where
        T: TryFrom<Integer> + Default,
    {
        match self.get(key) {
            Some(Value::Integer(i)) => {
                T::try_from(*i).map_err(|_| self.error(format!("{} out of range", field)))
            }
            Some(_) => Err(self.error(format!("{} must be an integer", field))),
            None => Ok(T::default()),
        }
    }

    /// A required nested map.
    pub(crate) fn nested(&self, key: u64, field: &str) -> Result<&'a Value> {
        match self.get(key) {
            Some(v @ Value::Map(_)) => Ok(v),
            Some(_) => Err(self.error(format!("{} must be a map", field))),
            None => Err(self.error(format!("missing {}", field))),
        }
    }

    /// An optional nested map.
    pub(crate) fn nested_opt(&self, key: u64, field: &str) -> Result<Option<&'a Value>> {
        if self.contains(key) {
            self.nested(key, field).map(Some)
        } else {
            Ok(None)
        }
    }

    /// An optional array; absent means empty.
    pub(crate) fn array_or_empty(&self, key: u64, field: &str) -> Result<&'a [Value]> {
        match self.get(key) {
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(_) => Err(self.error(format!("{} must be an array", field))),
            None => Ok(&[]),
        }
    }
}

/// Encode a CBOR Value to canonical bytes.
///
/// This function ensures:
/// - Map keys are sorted by encoded byte comparison
/// - Integers use smallest encoding
/// - Definite lengths only
pub fn encode_canonical(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        // Records only ever build the variants above.
        other => unreachable!("non-canonical CBOR value: {:?}", other),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n = i128::from(i);

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);

    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        // 0-23: single byte
        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        // 24-255: two bytes
        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        // 256-65535: three bytes
        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_integer(&mut buf, (-1i64).into());
        assert_eq!(buf, vec![0x20]);
    }

    #[test]
    fn test_map_key_ordering() {
        let entries = vec![
            entry(8, Value::Integer(80.into())),
            entry(0, Value::Integer(0.into())),
            entry(5, Value::Integer(50.into())),
        ];
        let buf = encode_canonical(&Value::Map(entries));

        assert_eq!(buf[0], 0xa3);
        assert_eq!(buf[1], 0x00); // key 0
        assert_eq!(buf[2], 0x00);
        assert_eq!(buf[3], 0x05); // key 5
        assert_eq!(&buf[4..6], &[0x18, 50]);
        assert_eq!(buf[6], 0x08); // key 8
        assert_eq!(&buf[7..9], &[0x18, 80]);
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = encode_canonical(&Value::Map(vec![entry(1, bytes_value(b"x"))]));
        bytes.push(0x00);
        let err = decode_value(&bytes, "test").unwrap_err();
        assert!(matches!(err, CoreError::Decoding { record: "test", .. }));
    }

    #[test]
    fn test_decode_rejects_empty_and_garbage() {
        assert!(decode_value(&[], "test").is_err());
        assert!(decode_value(&[0xff, 0x00, 0x13], "test").is_err());
    }

    #[test]
    fn test_map_view_rejects_duplicate_keys() {
        let value = Value::Map(vec![entry(1, bytes_value(b"a")), entry(1, bytes_value(b"b"))]);
        assert!(MapView::new(&value, "test").is_err());
    }

    #[test]
    fn test_map_view_field_kinds() {
        let value = Value::Map(vec![
            entry(1, bytes_value(b"abc")),
            entry(2, Value::Text("name".into())),
            entry(3, Value::Integer(7.into())),
        ]);
        let view = MapView::new(&value, "test").unwrap();

        assert_eq!(view.bytes(1, "b").unwrap(), b"abc");
        assert_eq!(view.text_or_empty(2, "t").unwrap(), "name");
        assert_eq!(view.int_or_zero::<i32>(3, "i").unwrap(), 7);
        assert_eq!(view.int_or_zero::<i32>(9, "i").unwrap(), 0);
        assert!(view.bytes_or_empty(9, "b").unwrap().is_empty());
        assert!(view.bytes(2, "b").is_err());
        assert!(view.bytes(9, "b").is_err());
        assert!(view.nested(1, "n").is_err());
    }
}
