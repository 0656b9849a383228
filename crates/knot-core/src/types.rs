//! Newtype wrappers for fixed-length protocol fields.
//!
//! Wire strings are fixed-length and zero-padded, never null-terminated.
//! The wrappers keep UUIDs, tokens, and device identifiers from being
//! mixed up while they travel between the codec, the trust store, and the
//! cloud adapter.

extern crate alloc;

use core::fmt;

use crate::constants::{TOKEN_LEN, UUID_LEN};

fn fmt_bytes(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match core::str::from_utf8(bytes) {
        Ok(s) => f.write_str(s),
        Err(_) => {
            for byte in bytes {
                write!(f, "{:02x}", byte)?;
            }
            Ok(())
        }
    }
}

/// A 36-byte cloud-assigned device identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct DeviceUuid(pub(crate) [u8; UUID_LEN]);

impl DeviceUuid {
    pub const fn new(bytes: [u8; UUID_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for DeviceUuid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for DeviceUuid {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; UUID_LEN] = bytes.try_into().map_err(|_| InvalidLength {
            expected: UUID_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl TryFrom<&str> for DeviceUuid {
    type Error = InvalidLength;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_from(s.as_bytes())
    }
}

impl fmt::Display for DeviceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_bytes(&self.0, f)
    }
}

impl fmt::Debug for DeviceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceUuid(")?;
        fmt_bytes(&self.0[..8], f)?;
        write!(f, "..)")
    }
}

/// A 40-byte cloud-assigned authentication token.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct DeviceToken(pub(crate) [u8; TOKEN_LEN]);

impl DeviceToken {
    pub const fn new(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for DeviceToken {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for DeviceToken {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; TOKEN_LEN] = bytes.try_into().map_err(|_| InvalidLength {
            expected: TOKEN_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl TryFrom<&str> for DeviceToken {
    type Error = InvalidLength;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_from(s.as_bytes())
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_bytes(&self.0, f)
    }
}

impl fmt::Debug for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tokens are secrets; only the first bytes reach the logs.
        write!(f, "DeviceToken(")?;
        fmt_bytes(&self.0[..4], f)?;
        write!(f, "..)")
    }
}

/// The 64-bit device identifier a node presents at registration.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct DeviceId(pub(crate) u64);

impl DeviceId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use = "returns the numeric identifier without modifying the DeviceId"]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({:016x})", self.0)
    }
}

/// Error returned when a byte slice has the wrong length for a newtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid length: expected {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidLength {}
