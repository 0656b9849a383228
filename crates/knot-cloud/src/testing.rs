//! Scripted cloud mock for deterministic dispatcher tests.
//!
//! `RecordingCloud` answers every operation from a configurable result
//! slot and records the calls it receives, so tests can assert both the
//! reply a node observes and the exact cloud traffic behind it.

use std::sync::Mutex;

use knot_core::schema::SchemaEntry;
use knot_core::types::{DeviceId, DeviceToken, DeviceUuid};

use crate::adapter::{CloudAdapter, CloudResult, Credential, SignIn};

/// One recorded adapter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudCall {
    RegisterDevice { name: String, device_id: DeviceId },
    RemoveDevice { uuid: DeviceUuid },
    SignIn { uuid: DeviceUuid },
    SubmitSchema { uuid: DeviceUuid, entries: Vec<SchemaEntry> },
    PushData { uuid: DeviceUuid, sensor_id: u8, value_type: u8, value: Vec<u8> },
    FetchData { uuid: DeviceUuid, sensor_id: u8 },
    AckSetData { uuid: DeviceUuid, sensor_id: u8 },
}

struct Script {
    calls: Vec<CloudCall>,
    register: CloudResult<Credential>,
    sign_in: CloudResult<SignIn>,
    remove: CloudResult<()>,
    submit_schema: CloudResult<()>,
    push_data: CloudResult<()>,
    fetch_data: CloudResult<()>,
    ack_set_data: CloudResult<()>,
}

/// A cloud whose answers are scripted up front.
///
/// Defaults to success everywhere, handing out an all-zero credential.
pub struct RecordingCloud {
    script: Mutex<Script>,
}

impl Default for RecordingCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingCloud {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                calls: Vec::new(),
                register: Ok(Credential {
                    uuid: DeviceUuid::new([b'0'; 36]),
                    token: DeviceToken::new([b'0'; 40]),
                }),
                sign_in: Ok(SignIn::default()),
                remove: Ok(()),
                submit_schema: Ok(()),
                push_data: Ok(()),
                fetch_data: Ok(()),
                ack_set_data: Ok(()),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("cloud script lock poisoned")
    }

    pub fn set_register_result(&self, result: CloudResult<Credential>) {
        self.lock().register = result;
    }

    pub fn set_sign_in_result(&self, result: CloudResult<SignIn>) {
        self.lock().sign_in = result;
    }

    pub fn set_remove_result(&self, result: CloudResult<()>) {
        self.lock().remove = result;
    }

    pub fn set_submit_schema_result(&self, result: CloudResult<()>) {
        self.lock().submit_schema = result;
    }

    pub fn set_push_data_result(&self, result: CloudResult<()>) {
        self.lock().push_data = result;
    }

    pub fn set_fetch_data_result(&self, result: CloudResult<()>) {
        self.lock().fetch_data = result;
    }

    pub fn set_ack_set_data_result(&self, result: CloudResult<()>) {
        self.lock().ack_set_data = result;
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<CloudCall> {
        self.lock().calls.clone()
    }

    /// Calls matching `pred`, for counting specific traffic.
    pub fn calls_where(&self, pred: impl Fn(&CloudCall) -> bool) -> Vec<CloudCall> {
        self.lock().calls.iter().filter(|c| pred(c)).cloned().collect()
    }
}

impl CloudAdapter for RecordingCloud {
    async fn register_device(&self, name: &str, device_id: DeviceId) -> CloudResult<Credential> {
        let mut script = self.lock();
        script.calls.push(CloudCall::RegisterDevice {
            name: name.to_owned(),
            device_id,
        });
        script.register
    }

    async fn remove_device(&self, uuid: &DeviceUuid, _token: &DeviceToken) -> CloudResult<()> {
        let mut script = self.lock();
        script.calls.push(CloudCall::RemoveDevice { uuid: *uuid });
        script.remove
    }

    async fn sign_in(&self, uuid: &DeviceUuid, _token: &DeviceToken) -> CloudResult<SignIn> {
        let mut script = self.lock();
        script.calls.push(CloudCall::SignIn { uuid: *uuid });
        script.sign_in.clone()
    }

    async fn submit_schema(
        &self,
        uuid: &DeviceUuid,
        _token: &DeviceToken,
        entries: &[SchemaEntry],
    ) -> CloudResult<()> {
        let mut script = self.lock();
        script.calls.push(CloudCall::SubmitSchema {
            uuid: *uuid,
            entries: entries.to_vec(),
        });
        script.submit_schema
    }

    async fn push_data(
        &self,
        uuid: &DeviceUuid,
        _token: &DeviceToken,
        sensor_id: u8,
        value_type: u8,
        value: &[u8],
    ) -> CloudResult<()> {
        let mut script = self.lock();
        script.calls.push(CloudCall::PushData {
            uuid: *uuid,
            sensor_id,
            value_type,
            value: value.to_vec(),
        });
        script.push_data
    }

    async fn fetch_data(
        &self,
        uuid: &DeviceUuid,
        _token: &DeviceToken,
        sensor_id: u8,
    ) -> CloudResult<()> {
        let mut script = self.lock();
        script.calls.push(CloudCall::FetchData {
            uuid: *uuid,
            sensor_id,
        });
        script.fetch_data
    }

    async fn ack_set_data(
        &self,
        uuid: &DeviceUuid,
        _token: &DeviceToken,
        sensor_id: u8,
    ) -> CloudResult<()> {
        let mut script = self.lock();
        script.calls.push(CloudCall::AckSetData {
            uuid: *uuid,
            sensor_id,
        });
        script.ack_set_data
    }
}
