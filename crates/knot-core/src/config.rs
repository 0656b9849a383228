//! Per-sensor configuration entries and their validation rules.
//!
//! Configuration is pushed by the cloud and controls when a node emits
//! data: periodically (`TIME`), on threshold crossings, on change, or on
//! unregistration. The gateway validates every list it receives before
//! trusting it.

use core::fmt;

use crate::constants::{EVT_FLAG_ALL, EVT_FLAG_LOWER_THRESHOLD, EVT_FLAG_TIME, EVT_FLAG_UPPER_THRESHOLD};
use crate::value::FloatValue;

/// One sensor's event configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigEntry {
    pub sensor_id: u8,
    pub event_flags: u8,
    pub time_sec: u16,
    pub lower_limit: FloatValue,
    pub upper_limit: FloatValue,
}

/// First rule violated by a configuration list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A flag bit outside the defined event set is set.
    UnknownFlags(u8),
    /// `TIME` is set but the period is zero.
    TimeWithoutPeriod,
    /// A period is given without the `TIME` flag.
    PeriodWithoutTime,
    /// A threshold flag is set but `upper_limit <= lower_limit`.
    LimitsOutOfOrder,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownFlags(bits) => {
                write!(f, "unknown event flag bits: 0x{bits:02x}")
            }
            ConfigError::TimeWithoutPeriod => write!(f, "TIME flag set with zero period"),
            ConfigError::PeriodWithoutTime => write!(f, "period set without TIME flag"),
            ConfigError::LimitsOutOfOrder => {
                write!(f, "upper limit not greater than lower limit")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Validate a whole configuration list, reporting the first violation.
pub fn validate(entries: &[ConfigEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        let unknown = entry.event_flags & !EVT_FLAG_ALL;
        if unknown != 0 {
            return Err(ConfigError::UnknownFlags(unknown));
        }

        if entry.event_flags & EVT_FLAG_TIME != 0 {
            if entry.time_sec == 0 {
                return Err(ConfigError::TimeWithoutPeriod);
            }
        } else if entry.time_sec > 0 {
            return Err(ConfigError::PeriodWithoutTime);
        }

        if entry.event_flags & (EVT_FLAG_LOWER_THRESHOLD | EVT_FLAG_UPPER_THRESHOLD) != 0
            && entry.upper_limit <= entry.lower_limit
        {
            return Err(ConfigError::LimitsOutOfOrder);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{EVT_FLAG_CHANGE, EVT_FLAG_NONE, EVT_FLAG_UNREGISTERED};
    use alloc::vec;

    fn timed(sensor_id: u8, time_sec: u16) -> ConfigEntry {
        ConfigEntry {
            sensor_id,
            event_flags: EVT_FLAG_TIME,
            time_sec,
            ..ConfigEntry::default()
        }
    }

    fn thresholds(flags: u8, lower: FloatValue, upper: FloatValue) -> ConfigEntry {
        ConfigEntry {
            sensor_id: 1,
            event_flags: flags,
            time_sec: 0,
            lower_limit: lower,
            upper_limit: upper,
        }
    }

    #[test]
    fn test_empty_list_is_valid() {
        assert_eq!(validate(&[]), Ok(()));
    }

    #[test]
    fn test_none_flags_with_zero_period_is_valid() {
        let entry = ConfigEntry {
            event_flags: EVT_FLAG_NONE,
            ..ConfigEntry::default()
        };
        assert_eq!(validate(&[entry]), Ok(()));
    }

    #[test]
    fn test_unknown_flag_bits_rejected() {
        for bits in [0x20u8, 0x40, 0x80, 0x21, 0xFF] {
            let entry = ConfigEntry {
                event_flags: bits,
                time_sec: if bits & EVT_FLAG_TIME != 0 { 10 } else { 0 },
                ..ConfigEntry::default()
            };
            let expected = bits & !EVT_FLAG_ALL;
            assert_eq!(
                validate(&[entry]),
                Err(ConfigError::UnknownFlags(expected)),
                "flags 0x{bits:02x}"
            );
        }
    }

    #[test]
    fn test_every_defined_flag_is_accepted() {
        for flags in [
            EVT_FLAG_CHANGE,
            EVT_FLAG_UNREGISTERED,
            EVT_FLAG_CHANGE | EVT_FLAG_UNREGISTERED,
        ] {
            let entry = ConfigEntry {
                event_flags: flags,
                ..ConfigEntry::default()
            };
            assert_eq!(validate(&[entry]), Ok(()), "flags 0x{flags:02x}");
        }
    }

    #[test]
    fn test_time_flag_requires_period() {
        assert_eq!(validate(&[timed(1, 0)]), Err(ConfigError::TimeWithoutPeriod));
        assert_eq!(validate(&[timed(1, 30)]), Ok(()));
    }

    #[test]
    fn test_period_requires_time_flag() {
        let entry = ConfigEntry {
            event_flags: EVT_FLAG_CHANGE,
            time_sec: 5,
            ..ConfigEntry::default()
        };
        assert_eq!(validate(&[entry]), Err(ConfigError::PeriodWithoutTime));
    }

    #[test]
    fn test_threshold_limits_must_be_ordered() {
        let cases = [
            // (lower, upper, expected)
            (FloatValue::new(0, 0), FloatValue::new(1, 0), Ok(())),
            (FloatValue::new(5, 10), FloatValue::new(5, 11), Ok(())),
            (FloatValue::new(5, 10), FloatValue::new(5, 10), Err(ConfigError::LimitsOutOfOrder)),
            (FloatValue::new(5, 10), FloatValue::new(5, 9), Err(ConfigError::LimitsOutOfOrder)),
            (FloatValue::new(2, 0), FloatValue::new(1, 999), Err(ConfigError::LimitsOutOfOrder)),
            (FloatValue::new(-3, 0), FloatValue::new(-2, 0), Ok(())),
        ];
        for (flags, _) in [(EVT_FLAG_LOWER_THRESHOLD, ()), (EVT_FLAG_UPPER_THRESHOLD, ())] {
            for (lower, upper, expected) in cases {
                assert_eq!(
                    validate(&[thresholds(flags, lower, upper)]),
                    expected,
                    "flags 0x{flags:02x} lower {lower:?} upper {upper:?}"
                );
            }
        }
    }

    #[test]
    fn test_limits_ignored_without_threshold_flags() {
        // Out-of-order limits are fine when no threshold event is armed.
        let entry = ConfigEntry {
            event_flags: EVT_FLAG_CHANGE,
            lower_limit: FloatValue::new(9, 0),
            upper_limit: FloatValue::new(1, 0),
            ..ConfigEntry::default()
        };
        assert_eq!(validate(&[entry]), Ok(()));
    }

    #[test]
    fn test_first_failure_is_reported() {
        let entries = vec![
            timed(1, 10),
            timed(2, 0),
            ConfigEntry {
                event_flags: 0x80,
                ..ConfigEntry::default()
            },
        ];
        assert_eq!(validate(&entries), Err(ConfigError::TimeWithoutPeriod));
    }
}
