//! In-memory cloud implementation.
//!
//! A functional stand-in for the remote service, used by the gateway
//! binary in development setups and demos. Devices, schemas, and pushed
//! readings live in a process-local map; credentials are random and
//! checked on every operation.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use rand::Rng;

use knot_core::constants::{TOKEN_LEN, UUID_LEN};
use knot_core::schema::SchemaEntry;
use knot_core::types::{DeviceId, DeviceToken, DeviceUuid};
use knot_core::ResultCode;

use crate::adapter::{CloudAdapter, CloudResult, Credential, SignIn};

/// One stored sensor reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPoint {
    pub sensor_id: u8,
    pub value_type: u8,
    pub value: Vec<u8>,
}

struct DeviceRecord {
    token: DeviceToken,
    device_id: DeviceId,
    name: String,
    schema: Vec<SchemaEntry>,
    data: Vec<DataPoint>,
    /// Sensors with an unanswered set-data push.
    pending_set: HashSet<u8>,
}

/// Process-local cloud registry.
#[derive(Default)]
pub struct InMemoryCloud {
    devices: Mutex<HashMap<DeviceUuid, DeviceRecord>>,
}

impl InMemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered devices; used by demos and tests.
    pub fn device_count(&self) -> usize {
        self.devices.lock().expect("cloud registry lock poisoned").len()
    }

    /// Stored readings for one device, newest last.
    pub fn readings(&self, uuid: &DeviceUuid) -> Vec<DataPoint> {
        self.devices
            .lock()
            .expect("cloud registry lock poisoned")
            .get(uuid)
            .map(|r| r.data.clone())
            .unwrap_or_default()
    }
}

fn random_uuid<R: Rng>(rng: &mut R) -> DeviceUuid {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut bytes = [0u8; UUID_LEN];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = match i {
            8 | 13 | 18 | 23 => b'-',
            _ => HEX[rng.gen_range(0..16)],
        };
    }
    DeviceUuid::new(bytes)
}

fn random_token<R: Rng>(rng: &mut R) -> DeviceToken {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut bytes = [0u8; TOKEN_LEN];
    for b in bytes.iter_mut() {
        *b = HEX[rng.gen_range(0..16)];
    }
    DeviceToken::new(bytes)
}

fn check_token(record: &DeviceRecord, token: &DeviceToken) -> CloudResult<()> {
    if record.token == *token {
        Ok(())
    } else {
        Err(ResultCode::CredentialUnauthorized)
    }
}

impl CloudAdapter for InMemoryCloud {
    async fn register_device(&self, name: &str, device_id: DeviceId) -> CloudResult<Credential> {
        let mut rng = rand::thread_rng();
        let uuid = random_uuid(&mut rng);
        let token = random_token(&mut rng);
        let record = DeviceRecord {
            token,
            device_id,
            name: name.to_owned(),
            schema: Vec::new(),
            data: Vec::new(),
            pending_set: HashSet::new(),
        };
        self.devices
            .lock()
            .expect("cloud registry lock poisoned")
            .insert(uuid, record);
        tracing::debug!(%uuid, %device_id, name, "registered device in memory cloud");
        Ok(Credential { uuid, token })
    }

    async fn remove_device(&self, uuid: &DeviceUuid, token: &DeviceToken) -> CloudResult<()> {
        let mut devices = self.devices.lock().expect("cloud registry lock poisoned");
        let record = devices.get(uuid).ok_or(ResultCode::InvalidCredential)?;
        check_token(record, token)?;
        tracing::debug!(
            %uuid,
            device_id = %record.device_id,
            name = %record.name,
            "removed device from memory cloud"
        );
        devices.remove(uuid);
        Ok(())
    }

    async fn sign_in(&self, uuid: &DeviceUuid, token: &DeviceToken) -> CloudResult<SignIn> {
        let devices = self.devices.lock().expect("cloud registry lock poisoned");
        let record = devices.get(uuid).ok_or(ResultCode::InvalidCredential)?;
        check_token(record, token)?;
        Ok(SignIn {
            schema: record.schema.clone(),
            config: Vec::new(),
        })
    }

    async fn submit_schema(
        &self,
        uuid: &DeviceUuid,
        token: &DeviceToken,
        entries: &[SchemaEntry],
    ) -> CloudResult<()> {
        let mut devices = self.devices.lock().expect("cloud registry lock poisoned");
        let record = devices.get_mut(uuid).ok_or(ResultCode::InvalidCredential)?;
        check_token(record, token)?;
        if entries.iter().any(|e| !e.is_valid()) {
            return Err(ResultCode::InvalidData);
        }
        record.schema = entries.to_vec();
        Ok(())
    }

    async fn push_data(
        &self,
        uuid: &DeviceUuid,
        token: &DeviceToken,
        sensor_id: u8,
        value_type: u8,
        value: &[u8],
    ) -> CloudResult<()> {
        let mut devices = self.devices.lock().expect("cloud registry lock poisoned");
        let record = devices.get_mut(uuid).ok_or(ResultCode::InvalidCredential)?;
        check_token(record, token)?;
        record.data.push(DataPoint {
            sensor_id,
            value_type,
            value: value.to_vec(),
        });
        Ok(())
    }

    async fn fetch_data(
        &self,
        uuid: &DeviceUuid,
        token: &DeviceToken,
        _sensor_id: u8,
    ) -> CloudResult<()> {
        let devices = self.devices.lock().expect("cloud registry lock poisoned");
        let record = devices.get(uuid).ok_or(ResultCode::InvalidCredential)?;
        check_token(record, token)
    }

    async fn ack_set_data(
        &self,
        uuid: &DeviceUuid,
        token: &DeviceToken,
        sensor_id: u8,
    ) -> CloudResult<()> {
        let mut devices = self.devices.lock().expect("cloud registry lock poisoned");
        let record = devices.get_mut(uuid).ok_or(ResultCode::InvalidCredential)?;
        check_token(record, token)?;
        record.pending_set.remove(&sensor_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knot_core::constants::TYPE_ID_TEMPERATURE;
    use knot_core::value::ValueType;

    #[tokio::test]
    async fn test_register_assigns_wellformed_credentials() {
        let cloud = InMemoryCloud::new();
        let cred = cloud
            .register_device("sensor-A", DeviceId::new(1))
            .await
            .unwrap();
        assert_eq!(cred.uuid.as_ref().len(), UUID_LEN);
        assert_eq!(cred.uuid.as_ref()[8], b'-');
        assert_eq!(cred.token.as_ref().len(), TOKEN_LEN);
        assert_eq!(cloud.device_count(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_token() {
        let cloud = InMemoryCloud::new();
        let cred = cloud
            .register_device("sensor-A", DeviceId::new(1))
            .await
            .unwrap();
        let wrong = DeviceToken::new([b'x'; TOKEN_LEN]);
        assert_eq!(
            cloud.sign_in(&cred.uuid, &wrong).await,
            Err(ResultCode::CredentialUnauthorized)
        );
        assert!(cloud.sign_in(&cred.uuid, &cred.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_schema_and_data_lifecycle() {
        let cloud = InMemoryCloud::new();
        let cred = cloud
            .register_device("sensor-A", DeviceId::new(1))
            .await
            .unwrap();
        let entry = SchemaEntry {
            sensor_id: 1,
            type_id: TYPE_ID_TEMPERATURE,
            value_type: ValueType::Int as u8,
            unit: 1,
            name: "out".into(),
        };
        cloud
            .submit_schema(&cred.uuid, &cred.token, &[entry.clone()])
            .await
            .unwrap();
        let signin = cloud.sign_in(&cred.uuid, &cred.token).await.unwrap();
        assert_eq!(signin.schema, vec![entry]);

        cloud
            .push_data(&cred.uuid, &cred.token, 1, ValueType::Int as u8, &[21, 0, 0, 0])
            .await
            .unwrap();
        assert_eq!(cloud.readings(&cred.uuid).len(), 1);

        cloud.remove_device(&cred.uuid, &cred.token).await.unwrap();
        assert_eq!(cloud.device_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_schema_rejected() {
        let cloud = InMemoryCloud::new();
        let cred = cloud
            .register_device("sensor-A", DeviceId::new(1))
            .await
            .unwrap();
        let entry = SchemaEntry {
            sensor_id: 1,
            type_id: 0x0100,
            value_type: ValueType::Int as u8,
            unit: 1,
            name: "bogus".into(),
        };
        assert_eq!(
            cloud.submit_schema(&cred.uuid, &cred.token, &[entry]).await,
            Err(ResultCode::InvalidData)
        );
    }
}
