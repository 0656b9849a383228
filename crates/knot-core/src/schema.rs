//! Sensor schema entries and the type/unit compatibility table.

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::constants::{
    TYPE_ID_ANGLE, TYPE_ID_AREA, TYPE_ID_CURRENT, TYPE_ID_DENSITY, TYPE_ID_DISTANCE,
    TYPE_ID_ENERGY, TYPE_ID_LATITUDE, TYPE_ID_LOGIC, TYPE_ID_LONGITUDE, TYPE_ID_LUMINOSITY,
    TYPE_ID_NONE, TYPE_ID_POWER, TYPE_ID_PRESSURE, TYPE_ID_RAIN, TYPE_ID_RELATIVE_HUMIDITY,
    TYPE_ID_RESISTANCE, TYPE_ID_SPEED, TYPE_ID_SWITCH, TYPE_ID_TEMPERATURE, TYPE_ID_TIME,
    TYPE_ID_VOLTAGE, TYPE_ID_VOLUME, TYPE_ID_VOLUMEFLOW,
};
use crate::pdu::SchemaMsg;
use crate::value::ValueType;

/// One sensor declaration accepted from a node.
///
/// Uniquely keyed by `sensor_id` within its list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub sensor_id: u8,
    pub type_id: u16,
    pub value_type: u8,
    pub unit: u8,
    pub name: String,
}

impl SchemaEntry {
    pub fn is_valid(&self) -> bool {
        is_valid(self.type_id, self.value_type, self.unit)
    }
}

impl From<&SchemaMsg> for SchemaEntry {
    fn from(msg: &SchemaMsg) -> Self {
        // Wire names are zero-padded; everything from the first NUL on is
        // padding.
        let end = msg.name.iter().position(|&b| b == 0).unwrap_or(msg.name.len());
        SchemaEntry {
            sensor_id: msg.sensor_id,
            type_id: msg.type_id,
            value_type: msg.value_type,
            unit: msg.unit,
            name: String::from_utf8_lossy(&msg.name[..end]).into_owned(),
        }
    }
}

/// Number of defined units for a numeric sensor type, or `None` if the
/// type has no numeric unit family.
fn unit_count(type_id: u16) -> Option<u8> {
    Some(match type_id {
        TYPE_ID_VOLTAGE => 3,           // V, mV, kV
        TYPE_ID_CURRENT => 2,           // A, mA
        TYPE_ID_RESISTANCE => 1,        // ohm
        TYPE_ID_POWER => 3,             // W, mW, kW
        TYPE_ID_TEMPERATURE => 3,       // Celsius, Fahrenheit, Kelvin
        TYPE_ID_RELATIVE_HUMIDITY => 1, // percent
        TYPE_ID_LUMINOSITY => 3,        // lux, candela, lumen
        TYPE_ID_TIME => 3,              // s, ms, us
        TYPE_ID_PRESSURE => 3,          // Pa, psi, bar
        TYPE_ID_DISTANCE => 4,          // m, cm, mi, in
        TYPE_ID_ANGLE => 2,             // rad, deg
        TYPE_ID_VOLUME => 4,
        TYPE_ID_AREA => 3,
        TYPE_ID_RAIN => 1,
        TYPE_ID_DENSITY => 1,
        TYPE_ID_LATITUDE => 1,
        TYPE_ID_LONGITUDE => 1,
        TYPE_ID_SPEED => 4,
        TYPE_ID_VOLUMEFLOW => 5,
        TYPE_ID_ENERGY => 4,
        _ => return None,
    })
}

/// Whether a `(type_id, value_type, unit)` triple is a defined combination.
///
/// Numeric types accept integer or decimal values with a unit inside the
/// type's family; presence types are unitless booleans; `NONE` carries raw
/// payloads with no unit.
pub fn is_valid(type_id: u16, value_type: u8, unit: u8) -> bool {
    let Some(value_type) = ValueType::from_u8(value_type) else {
        return false;
    };
    match type_id {
        TYPE_ID_NONE => value_type == ValueType::Raw && unit == 0,
        TYPE_ID_SWITCH | TYPE_ID_LOGIC => value_type == ValueType::Bool && unit == 0,
        _ => match unit_count(type_id) {
            Some(units) => {
                matches!(value_type, ValueType::Int | ValueType::Float)
                    && unit >= 1
                    && unit <= units
            }
            None => false,
        },
    }
}

/// Linear search for a sensor's schema entry. The list carries no ordering
/// guarantee.
pub fn find_sensor(entries: &[SchemaEntry], sensor_id: u8) -> Option<&SchemaEntry> {
    entries.iter().find(|e| e.sensor_id == sensor_id)
}

/// Append `entry` unless an entry with the same sensor id is already
/// present (first write wins). Returns whether the entry was added.
pub fn stage_unique(entries: &mut Vec<SchemaEntry>, entry: SchemaEntry) -> bool {
    if find_sensor(entries, entry.sensor_id).is_some() {
        return false;
    }
    entries.push(entry);
    true
}
