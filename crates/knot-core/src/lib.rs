//! Core types, constants, and wire formats for the KNOT protocol.
//!
//! This crate defines the protocol constants, newtype wrappers for
//! fixed-length wire strings, the PDU codec, sensor values, and the schema
//! and configuration entry types shared by the gateway and the cloud
//! adapter. It performs no I/O and holds no session state.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
pub mod constants;
pub mod error;
pub mod pdu;
pub mod schema;
pub mod types;
pub mod value;

pub use constants::{MessageType, ResultCode};
pub use error::PduError;
pub use pdu::KnotMsg;
pub use schema::SchemaEntry;
pub use types::{DeviceId, DeviceToken, DeviceUuid, InvalidLength};
pub use value::{FloatValue, SensorValue, ValueType};
