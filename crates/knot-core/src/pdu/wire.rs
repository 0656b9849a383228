//! PDU wire format parsing and serialization.
//!
//! Layout rules: byte 0 is the message type, byte 1 the payload length
//! (excluding the header); multi-byte integers are little-endian; string
//! fields are fixed-length and zero-padded, never null-terminated. The
//! decoder performs structural length checks only — semantic validation
//! belongs to the dispatcher.

extern crate alloc;
use alloc::vec::Vec;

use crate::constants::{
    AUTH_PAYLOAD, CREDENTIAL_PAYLOAD, DEVICE_NAME_MAX, HEADER_SIZE, MessageType, RAW_VALUE_MAX,
    SCHEMA_FIXED_SIZE, SCHEMA_NAME_MAX, TOKEN_LEN, UUID_LEN,
};
use crate::error::PduError;
use crate::pdu::{
    AuthMsg, CredentialMsg, DataMsg, ItemMsg, KnotMsg, RegisterMsg, ResponseMsg, SchemaMsg,
};
use crate::types::{DeviceId, DeviceToken, DeviceUuid};
use crate::ResultCode;

impl KnotMsg {
    /// Parse a PDU from wire bytes.
    #[must_use = "parsing may fail; check the Result"]
    pub fn decode(raw: &[u8]) -> Result<Self, PduError> {
        if raw.len() < HEADER_SIZE {
            return Err(PduError::TooShort {
                min: HEADER_SIZE,
                actual: raw.len(),
            });
        }

        let msg_type = raw[0];
        let declared = HEADER_SIZE + raw[1] as usize;
        if raw.len() != declared {
            return Err(PduError::LengthMismatch {
                declared,
                actual: raw.len(),
            });
        }

        let body = &raw[HEADER_SIZE..];
        match MessageType::from_u8(msg_type)? {
            MessageType::Invalid => Err(PduError::UnknownType(msg_type)),
            MessageType::RegisterReq => {
                if body.len() < 8 {
                    return Err(PduError::Truncated {
                        msg_type,
                        min: 8,
                        actual: body.len(),
                    });
                }
                let device_id =
                    u64::from_le_bytes(body[..8].try_into().expect("slice is exactly 8 bytes"));
                let name = &body[8..];
                if name.len() > DEVICE_NAME_MAX {
                    return Err(PduError::BodyLength {
                        msg_type,
                        expected: 8 + DEVICE_NAME_MAX,
                        actual: body.len(),
                    });
                }
                Ok(KnotMsg::RegisterReq(RegisterMsg {
                    device_id: DeviceId::new(device_id),
                    name: name.to_vec(),
                }))
            }
            MessageType::RegisterResp => {
                if body.len() != CREDENTIAL_PAYLOAD {
                    return Err(PduError::BodyLength {
                        msg_type,
                        expected: CREDENTIAL_PAYLOAD,
                        actual: body.len(),
                    });
                }
                let uuid = DeviceUuid::try_from(&body[1..1 + UUID_LEN])
                    .expect("slice is exactly UUID_LEN bytes");
                let token = DeviceToken::try_from(&body[1 + UUID_LEN..])
                    .expect("slice is exactly TOKEN_LEN bytes");
                Ok(KnotMsg::RegisterResp(CredentialMsg {
                    result: ResultCode::from_byte(body[0]),
                    uuid,
                    token,
                }))
            }
            MessageType::UnregisterReq => {
                if !body.is_empty() {
                    return Err(PduError::BodyLength {
                        msg_type,
                        expected: 0,
                        actual: body.len(),
                    });
                }
                Ok(KnotMsg::UnregisterReq)
            }
            MessageType::AuthReq => {
                if body.len() != AUTH_PAYLOAD {
                    return Err(PduError::BodyLength {
                        msg_type,
                        expected: AUTH_PAYLOAD,
                        actual: body.len(),
                    });
                }
                let uuid = DeviceUuid::try_from(&body[..UUID_LEN])
                    .expect("slice is exactly UUID_LEN bytes");
                let token = DeviceToken::try_from(&body[UUID_LEN..])
                    .expect("slice is exactly TOKEN_LEN bytes");
                Ok(KnotMsg::AuthReq(AuthMsg { uuid, token }))
            }
            MessageType::Schema | MessageType::SchemaEnd => {
                if body.len() < SCHEMA_FIXED_SIZE {
                    return Err(PduError::Truncated {
                        msg_type,
                        min: SCHEMA_FIXED_SIZE,
                        actual: body.len(),
                    });
                }
                let name = &body[SCHEMA_FIXED_SIZE..];
                if name.len() > SCHEMA_NAME_MAX {
                    return Err(PduError::BodyLength {
                        msg_type,
                        expected: SCHEMA_FIXED_SIZE + SCHEMA_NAME_MAX,
                        actual: body.len(),
                    });
                }
                let entry = SchemaMsg {
                    sensor_id: body[0],
                    type_id: u16::from_le_bytes([body[1], body[2]]),
                    value_type: body[3],
                    unit: body[4],
                    name: name.to_vec(),
                };
                if msg_type == MessageType::SchemaEnd as u8 {
                    Ok(KnotMsg::SchemaEnd(entry))
                } else {
                    Ok(KnotMsg::Schema(entry))
                }
            }
            MessageType::PushData | MessageType::DataResp => {
                if body.is_empty() {
                    return Err(PduError::Truncated {
                        msg_type,
                        min: 1,
                        actual: 0,
                    });
                }
                let value = &body[1..];
                if value.len() > RAW_VALUE_MAX {
                    return Err(PduError::BodyLength {
                        msg_type,
                        expected: 1 + RAW_VALUE_MAX,
                        actual: body.len(),
                    });
                }
                let data = DataMsg {
                    sensor_id: body[0],
                    value: value.to_vec(),
                };
                if msg_type == MessageType::PushData as u8 {
                    Ok(KnotMsg::PushData(data))
                } else {
                    Ok(KnotMsg::SetDataResp(data))
                }
            }
            MessageType::ConfigResp => {
                if body.len() != 1 {
                    return Err(PduError::BodyLength {
                        msg_type,
                        expected: 1,
                        actual: body.len(),
                    });
                }
                Ok(KnotMsg::ConfigResp(ItemMsg { sensor_id: body[0] }))
            }
            MessageType::UnregisterResp
            | MessageType::AuthResp
            | MessageType::SchemaResp
            | MessageType::SchemaEndResp => {
                if body.len() != 1 {
                    return Err(PduError::BodyLength {
                        msg_type,
                        expected: 1,
                        actual: body.len(),
                    });
                }
                let resp = ResponseMsg {
                    result: ResultCode::from_byte(body[0]),
                };
                Ok(match MessageType::from_u8(msg_type)? {
                    MessageType::UnregisterResp => KnotMsg::UnregisterResp(resp),
                    MessageType::AuthResp => KnotMsg::AuthResp(resp),
                    MessageType::SchemaResp => KnotMsg::SchemaResp(resp),
                    _ => KnotMsg::SchemaEndResp(resp),
                })
            }
        }
    }

    /// Serialize the PDU back to wire format.
    #[must_use = "serialization produces a new Vec without modifying the message"]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + 8);
        buf.push(self.msg_type() as u8);
        buf.push(0); // payload length backfilled below

        match self {
            KnotMsg::RegisterReq(m) => {
                buf.extend_from_slice(&m.device_id.value().to_le_bytes());
                buf.extend_from_slice(&m.name);
            }
            KnotMsg::RegisterResp(m) => {
                buf.push(m.result.to_byte());
                buf.extend_from_slice(m.uuid.as_ref());
                buf.extend_from_slice(m.token.as_ref());
            }
            KnotMsg::UnregisterReq => {}
            KnotMsg::AuthReq(m) => {
                buf.extend_from_slice(m.uuid.as_ref());
                buf.extend_from_slice(m.token.as_ref());
            }
            KnotMsg::Schema(m) | KnotMsg::SchemaEnd(m) => {
                buf.push(m.sensor_id);
                buf.extend_from_slice(&m.type_id.to_le_bytes());
                buf.push(m.value_type);
                buf.push(m.unit);
                buf.extend_from_slice(&m.name);
            }
            KnotMsg::PushData(m) | KnotMsg::SetDataResp(m) => {
                buf.push(m.sensor_id);
                buf.extend_from_slice(&m.value);
            }
            KnotMsg::ConfigResp(m) => buf.push(m.sensor_id),
            KnotMsg::UnregisterResp(m)
            | KnotMsg::AuthResp(m)
            | KnotMsg::SchemaResp(m)
            | KnotMsg::SchemaEndResp(m) => buf.push(m.result.to_byte()),
        }

        buf[1] = (buf.len() - HEADER_SIZE) as u8;
        buf
    }
}

/// Write a result-only reply into `buf`, returning the octet count to
/// transmit. `buf` must hold at least [`crate::constants::MSG_MAX_SIZE`]
/// bytes; the dispatcher checks this before any handler runs.
pub fn write_reply(buf: &mut [u8], msg_type: MessageType, result: ResultCode) -> usize {
    debug_assert!(buf.len() >= HEADER_SIZE + 1);
    buf[0] = msg_type as u8;
    buf[1] = 1;
    buf[2] = result.to_byte();
    HEADER_SIZE + 1
}

/// Write a credential-carrying reply (REGISTER_RESP), returning the octet
/// count to transmit.
pub fn write_credential_reply(
    buf: &mut [u8],
    msg_type: MessageType,
    result: ResultCode,
    uuid: &DeviceUuid,
    token: &DeviceToken,
) -> usize {
    debug_assert!(buf.len() >= HEADER_SIZE + CREDENTIAL_PAYLOAD);
    buf[0] = msg_type as u8;
    buf[1] = CREDENTIAL_PAYLOAD as u8;
    buf[2] = result.to_byte();
    buf[3..3 + UUID_LEN].copy_from_slice(uuid.as_ref());
    buf[3 + UUID_LEN..3 + UUID_LEN + TOKEN_LEN].copy_from_slice(token.as_ref());
    HEADER_SIZE + CREDENTIAL_PAYLOAD
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn sample_uuid() -> DeviceUuid {
        DeviceUuid::try_from("aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa").unwrap()
    }

    fn sample_token() -> DeviceToken {
        DeviceToken::new([b't'; TOKEN_LEN])
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert_eq!(
            KnotMsg::decode(&[]),
            Err(PduError::TooShort { min: 2, actual: 0 })
        );
        assert_eq!(
            KnotMsg::decode(&[0x20]),
            Err(PduError::TooShort { min: 2, actual: 1 })
        );
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        // Header declares 5 payload bytes, only 2 present.
        let raw = [0x20, 5, 1, 2];
        assert_eq!(
            KnotMsg::decode(&raw),
            Err(PduError::LengthMismatch {
                declared: 7,
                actual: 4
            })
        );
        // Extra trailing byte.
        let raw = [0x12, 0, 0xFF];
        assert!(matches!(
            KnotMsg::decode(&raw),
            Err(PduError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert_eq!(
            KnotMsg::decode(&[0x99, 1, 0]),
            Err(PduError::UnknownType(0x99))
        );
        assert_eq!(KnotMsg::decode(&[0x00, 0]), Err(PduError::UnknownType(0)));
    }

    #[test]
    fn test_register_req_truncated_device_id() {
        // Payload shorter than the 8-byte device id is structural.
        let raw = [0x10, 4, 1, 2, 3, 4];
        assert_eq!(
            KnotMsg::decode(&raw),
            Err(PduError::Truncated {
                msg_type: 0x10,
                min: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn test_register_req_empty_name_decodes() {
        // Exactly the device id: structurally valid, name left empty for
        // the dispatcher to reject.
        let mut raw = vec![0x10, 8];
        raw.extend_from_slice(&0x0102030405060708u64.to_le_bytes());
        let msg = KnotMsg::decode(&raw).unwrap();
        match msg {
            KnotMsg::RegisterReq(m) => {
                assert_eq!(m.device_id, DeviceId::new(0x0102030405060708));
                assert!(m.name.is_empty());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_register_req_name_too_long() {
        let mut raw = vec![0x10, 8 + 64];
        raw.extend_from_slice(&[0u8; 8]);
        raw.extend_from_slice(&[b'x'; 64]);
        assert!(matches!(
            KnotMsg::decode(&raw),
            Err(PduError::BodyLength { .. })
        ));
    }

    #[test]
    fn test_auth_req_exact_size() {
        let raw = [0x14, 10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            KnotMsg::decode(&raw),
            Err(PduError::BodyLength { .. })
        ));
    }

    #[test]
    fn test_schema_name_bounds() {
        let mut raw = vec![0x40, (SCHEMA_FIXED_SIZE + SCHEMA_NAME_MAX + 1) as u8];
        raw.extend_from_slice(&[1, 5, 0, 2, 1]);
        raw.extend_from_slice(&[b'n'; SCHEMA_NAME_MAX + 1]);
        assert!(matches!(
            KnotMsg::decode(&raw),
            Err(PduError::BodyLength { .. })
        ));
    }

    #[test]
    fn test_data_requires_sensor_id() {
        let raw = [0x20, 0];
        assert_eq!(
            KnotMsg::decode(&raw),
            Err(PduError::Truncated {
                msg_type: 0x20,
                min: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn test_roundtrip_all_variants() {
        let msgs = vec![
            KnotMsg::RegisterReq(RegisterMsg {
                device_id: DeviceId::new(0x0102030405060708),
                name: b"sensor-A".to_vec(),
            }),
            KnotMsg::RegisterResp(CredentialMsg {
                result: ResultCode::Success,
                uuid: sample_uuid(),
                token: sample_token(),
            }),
            KnotMsg::UnregisterReq,
            KnotMsg::UnregisterResp(ResponseMsg {
                result: ResultCode::Success,
            }),
            KnotMsg::AuthReq(AuthMsg {
                uuid: sample_uuid(),
                token: sample_token(),
            }),
            KnotMsg::AuthResp(ResponseMsg {
                result: ResultCode::SchemaEmpty,
            }),
            KnotMsg::Schema(SchemaMsg {
                sensor_id: 1,
                type_id: 0x0005,
                value_type: 2,
                unit: 1,
                name: b"boiler".to_vec(),
            }),
            KnotMsg::SchemaEnd(SchemaMsg {
                sensor_id: 2,
                type_id: 0x0009,
                value_type: 1,
                unit: 1,
                name: Vec::new(),
            }),
            KnotMsg::SchemaResp(ResponseMsg {
                result: ResultCode::Success,
            }),
            KnotMsg::SchemaEndResp(ResponseMsg {
                result: ResultCode::InvalidData,
            }),
            KnotMsg::PushData(DataMsg {
                sensor_id: 1,
                value: vec![0x15, 0, 0, 0],
            }),
            KnotMsg::SetDataResp(DataMsg {
                sensor_id: 3,
                value: vec![1],
            }),
            KnotMsg::ConfigResp(ItemMsg { sensor_id: 7 }),
        ];

        for msg in msgs {
            let raw = msg.encode();
            assert_eq!(raw[1] as usize, raw.len() - HEADER_SIZE);
            let decoded = KnotMsg::decode(&raw).unwrap_or_else(|e| {
                panic!("decode failed for {msg:?}: {e}");
            });
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn test_write_reply_layout() {
        let mut buf = [0u8; crate::constants::MSG_MAX_SIZE];
        let n = write_reply(&mut buf, MessageType::DataResp, ResultCode::InvalidData);
        assert_eq!(n, 3);
        assert_eq!(buf[0], 0x21);
        assert_eq!(buf[1], 1);
        assert_eq!(buf[2], ResultCode::InvalidData.to_byte());
    }

    #[test]
    fn test_write_credential_reply_layout() {
        let mut buf = [0u8; crate::constants::MSG_MAX_SIZE];
        let uuid = sample_uuid();
        let token = sample_token();
        let n = write_credential_reply(
            &mut buf,
            MessageType::RegisterResp,
            ResultCode::Success,
            &uuid,
            &token,
        );
        assert_eq!(n, HEADER_SIZE + CREDENTIAL_PAYLOAD);
        assert_eq!(buf[0], 0x11);
        assert_eq!(buf[1], CREDENTIAL_PAYLOAD as u8);
        assert_eq!(buf[2], 0);
        assert_eq!(&buf[3..3 + UUID_LEN], uuid.as_ref());
        assert_eq!(&buf[3 + UUID_LEN..n], token.as_ref());
    }
}
