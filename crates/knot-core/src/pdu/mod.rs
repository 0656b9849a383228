//! KNOT protocol data units.
//!
//! Every PDU is a two-byte header (`type`, `payload_len`) followed by a
//! variant body. The C reference models the bodies as a union; here each
//! message type carries its typed body in one arm of [`KnotMsg`], and the
//! codec returns the tag and body in one step.

pub mod wire;

extern crate alloc;
use alloc::vec::Vec;

use crate::constants::MessageType;
use crate::types::{DeviceId, DeviceToken, DeviceUuid};
use crate::ResultCode;

/// REGISTER_REQ body: device id plus a 1..=63 byte device name.
///
/// The name is stored exactly as received; an empty or NUL-leading name is
/// a semantic rejection, not a decode failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterMsg {
    pub device_id: DeviceId,
    pub name: Vec<u8>,
}

/// Credential body used by REGISTER_RESP: result, uuid, token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialMsg {
    pub result: ResultCode,
    pub uuid: DeviceUuid,
    pub token: DeviceToken,
}

/// AUTH_REQ body: the credential pair assigned at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMsg {
    pub uuid: DeviceUuid,
    pub token: DeviceToken,
}

/// SCHEMA / SCHEMA_END body: one schema entry for one sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMsg {
    pub sensor_id: u8,
    pub type_id: u16,
    pub value_type: u8,
    pub unit: u8,
    pub name: Vec<u8>,
}

/// DATA / DATA_RESP body: sensor id plus raw value bytes.
///
/// The value layout is fixed by the schema's `value_type`; the codec only
/// bounds its length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMsg {
    pub sensor_id: u8,
    pub value: Vec<u8>,
}

/// Single-sensor reference body (CONFIG_RESP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemMsg {
    pub sensor_id: u8,
}

/// Result-only response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseMsg {
    pub result: ResultCode,
}

/// A decoded KNOT PDU: the message tag plus its typed body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum KnotMsg {
    RegisterReq(RegisterMsg),
    RegisterResp(CredentialMsg),
    UnregisterReq,
    UnregisterResp(ResponseMsg),
    AuthReq(AuthMsg),
    AuthResp(ResponseMsg),
    Schema(SchemaMsg),
    SchemaEnd(SchemaMsg),
    SchemaResp(ResponseMsg),
    SchemaEndResp(ResponseMsg),
    PushData(DataMsg),
    SetDataResp(DataMsg),
    ConfigResp(ItemMsg),
}

impl KnotMsg {
    pub fn msg_type(&self) -> MessageType {
        match self {
            KnotMsg::RegisterReq(_) => MessageType::RegisterReq,
            KnotMsg::RegisterResp(_) => MessageType::RegisterResp,
            KnotMsg::UnregisterReq => MessageType::UnregisterReq,
            KnotMsg::UnregisterResp(_) => MessageType::UnregisterResp,
            KnotMsg::AuthReq(_) => MessageType::AuthReq,
            KnotMsg::AuthResp(_) => MessageType::AuthResp,
            KnotMsg::Schema(_) => MessageType::Schema,
            KnotMsg::SchemaEnd(_) => MessageType::SchemaEnd,
            KnotMsg::SchemaResp(_) => MessageType::SchemaResp,
            KnotMsg::SchemaEndResp(_) => MessageType::SchemaEndResp,
            KnotMsg::PushData(_) => MessageType::PushData,
            KnotMsg::SetDataResp(_) => MessageType::DataResp,
            KnotMsg::ConfigResp(_) => MessageType::ConfigResp,
        }
    }
}
