//! Error types for the knot-core crate.

use core::fmt;

/// Structural PDU decode failures.
///
/// These never produce a protocol reply; the transport decides whether to
/// drop the connection. Semantic failures are expressed as reply result
/// codes instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PduError {
    TooShort { min: usize, actual: usize },
    LengthMismatch { declared: usize, actual: usize },
    UnknownType(u8),
    Truncated { msg_type: u8, min: usize, actual: usize },
    BodyLength { msg_type: u8, expected: usize, actual: usize },
}

impl fmt::Display for PduError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PduError::TooShort { min, actual } => {
                write!(f, "PDU too short: need at least {min} bytes, got {actual}")
            }
            PduError::LengthMismatch { declared, actual } => {
                write!(
                    f,
                    "PDU length mismatch: header declares {declared} bytes total, got {actual}"
                )
            }
            PduError::UnknownType(v) => write!(f, "unknown message type: 0x{v:02x}"),
            PduError::Truncated { msg_type, min, actual } => {
                write!(
                    f,
                    "truncated 0x{msg_type:02x} body: need at least {min} bytes, got {actual}"
                )
            }
            PduError::BodyLength { msg_type, expected, actual } => {
                write!(
                    f,
                    "invalid 0x{msg_type:02x} body length: expected {expected} bytes, got {actual}"
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PduError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_pdu_error_display_all_variants() {
        let variants: &[PduError] = &[
            PduError::TooShort { min: 2, actual: 1 },
            PduError::LengthMismatch {
                declared: 10,
                actual: 7,
            },
            PduError::UnknownType(0x99),
            PduError::Truncated {
                msg_type: 0x10,
                min: 8,
                actual: 3,
            },
            PduError::BodyLength {
                msg_type: 0x40,
                expected: 28,
                actual: 40,
            },
        ];
        for v in variants {
            let msg = v.to_string();
            assert!(!msg.is_empty(), "{v:?} should have non-empty Display");
        }
    }
}
