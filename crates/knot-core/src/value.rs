//! Sensor value representation and wire layout.
//!
//! A DATA payload carries raw value bytes whose layout is fixed by the
//! `value_type` declared in the sensor's schema entry. The codec forwards
//! the bytes untouched; this module gives tests and cloud implementations
//! a typed view.

extern crate alloc;
use alloc::vec::Vec;

use crate::constants::RAW_VALUE_MAX;

/// Declared layout of a sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    Int = 1,
    Float = 2,
    Bool = 3,
    Raw = 4,
}

impl ValueType {
    /// `None` for value-type bytes outside the declared set; the schema
    /// validator treats those as invalid entries.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(ValueType::Int),
            2 => Some(ValueType::Float),
            3 => Some(ValueType::Bool),
            4 => Some(ValueType::Raw),
            _ => None,
        }
    }
}

/// A decimal value split into integer and fractional parts.
///
/// Field order gives the derived comparison the lexicographic
/// `(int_part, dec_part)` order the threshold rules are defined over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[must_use]
pub struct FloatValue {
    pub int_part: i32,
    pub dec_part: u32,
}

impl FloatValue {
    /// Encoded size on the wire: int_part(4) + dec_part(4), little-endian.
    pub const WIRE_SIZE: usize = 8;

    pub const fn new(int_part: i32, dec_part: u32) -> Self {
        Self { int_part, dec_part }
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::WIRE_SIZE {
            return None;
        }
        let int_part = i32::from_le_bytes(bytes[..4].try_into().ok()?);
        let dec_part = u32::from_le_bytes(bytes[4..8].try_into().ok()?);
        Some(Self { int_part, dec_part })
    }

    #[must_use = "encoding produces a new Vec without modifying the value"]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_SIZE);
        buf.extend_from_slice(&self.int_part.to_le_bytes());
        buf.extend_from_slice(&self.dec_part.to_le_bytes());
        buf
    }
}

/// A typed sensor value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorValue {
    Bool(bool),
    Int(i32),
    Float(FloatValue),
    Raw(Vec<u8>),
}

impl SensorValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            SensorValue::Bool(_) => ValueType::Bool,
            SensorValue::Int(_) => ValueType::Int,
            SensorValue::Float(_) => ValueType::Float,
            SensorValue::Raw(_) => ValueType::Raw,
        }
    }

    /// Decode raw payload bytes against a declared value type.
    ///
    /// Bool is one byte (zero = false), Int four bytes LE, Float eight
    /// bytes LE, Raw between one and [`RAW_VALUE_MAX`] bytes.
    pub fn decode(value_type: ValueType, bytes: &[u8]) -> Option<Self> {
        match value_type {
            ValueType::Bool => match bytes {
                [b] => Some(SensorValue::Bool(*b != 0)),
                _ => None,
            },
            ValueType::Int => {
                let arr: [u8; 4] = bytes.try_into().ok()?;
                Some(SensorValue::Int(i32::from_le_bytes(arr)))
            }
            ValueType::Float => FloatValue::decode(bytes).map(SensorValue::Float),
            ValueType::Raw => {
                if bytes.is_empty() || bytes.len() > RAW_VALUE_MAX {
                    return None;
                }
                Some(SensorValue::Raw(bytes.to_vec()))
            }
        }
    }

    #[must_use = "encoding produces a new Vec without modifying the value"]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            SensorValue::Bool(b) => alloc::vec![u8::from(*b)],
            SensorValue::Int(i) => i.to_le_bytes().to_vec(),
            SensorValue::Float(fv) => fv.encode(),
            SensorValue::Raw(bytes) => bytes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_value_lexicographic_order() {
        let low = FloatValue::new(1, 999_999);
        let high = FloatValue::new(2, 0);
        assert!(high > low);

        let a = FloatValue::new(3, 10);
        let b = FloatValue::new(3, 11);
        assert!(b > a);
        assert!(a >= a);

        let neg = FloatValue::new(-5, 700);
        assert!(low > neg);
    }

    #[test]
    fn test_float_value_wire_roundtrip() {
        let fv = FloatValue::new(-40, 125_000);
        let encoded = fv.encode();
        assert_eq!(encoded.len(), FloatValue::WIRE_SIZE);
        assert_eq!(FloatValue::decode(&encoded), Some(fv));
    }

    #[test]
    fn test_float_value_decode_wrong_size() {
        assert_eq!(FloatValue::decode(&[0u8; 7]), None);
        assert_eq!(FloatValue::decode(&[0u8; 9]), None);
    }

    #[test]
    fn test_sensor_value_roundtrip() {
        let values = [
            SensorValue::Bool(true),
            SensorValue::Bool(false),
            SensorValue::Int(-273),
            SensorValue::Float(FloatValue::new(21, 5)),
            SensorValue::Raw(alloc::vec![0xDE, 0xAD, 0xBE, 0xEF]),
        ];
        for v in &values {
            let encoded = v.encode();
            let decoded = SensorValue::decode(v.value_type(), &encoded).unwrap();
            assert_eq!(&decoded, v);
        }
    }

    #[test]
    fn test_sensor_value_decode_bounds() {
        assert_eq!(SensorValue::decode(ValueType::Bool, &[]), None);
        assert_eq!(SensorValue::decode(ValueType::Bool, &[1, 2]), None);
        assert_eq!(SensorValue::decode(ValueType::Int, &[0; 3]), None);
        assert_eq!(SensorValue::decode(ValueType::Raw, &[]), None);
        assert_eq!(
            SensorValue::decode(ValueType::Raw, &[0u8; RAW_VALUE_MAX + 1]),
            None
        );
    }

    #[test]
    fn test_value_type_from_u8() {
        assert_eq!(ValueType::from_u8(1), Some(ValueType::Int));
        assert_eq!(ValueType::from_u8(4), Some(ValueType::Raw));
        assert_eq!(ValueType::from_u8(0), None);
        assert_eq!(ValueType::from_u8(5), None);
    }
}
