//! The cloud adapter trait and its request/response types.

use std::future::Future;

use knot_core::config::ConfigEntry;
use knot_core::schema::SchemaEntry;
use knot_core::types::{DeviceId, DeviceToken, DeviceUuid};
use knot_core::ResultCode;

/// Credential pair assigned by the cloud at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credential {
    pub uuid: DeviceUuid,
    pub token: DeviceToken,
}

/// State returned by a successful sign-in: the schema the cloud has
/// accepted for the device and its current configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignIn {
    pub schema: Vec<SchemaEntry>,
    pub config: Vec<ConfigEntry>,
}

/// Cloud operation outcome. The `Err` arm carries the protocol result
/// code that is passed through to the node as the reply result.
pub type CloudResult<T> = Result<T, ResultCode>;

/// Capability trait over the remote service.
///
/// Every method is a suspension point from the dispatcher's point of
/// view; callers must not hold borrows into the trust store across these
/// calls.
pub trait CloudAdapter: Send + Sync {
    /// Register a new device, returning its credential pair.
    fn register_device(
        &self,
        name: &str,
        device_id: DeviceId,
    ) -> impl Future<Output = CloudResult<Credential>> + Send;

    /// Remove a registered device.
    fn remove_device(
        &self,
        uuid: &DeviceUuid,
        token: &DeviceToken,
    ) -> impl Future<Output = CloudResult<()>> + Send;

    /// Authenticate a device and fetch its accepted schema and current
    /// configuration.
    fn sign_in(
        &self,
        uuid: &DeviceUuid,
        token: &DeviceToken,
    ) -> impl Future<Output = CloudResult<SignIn>> + Send;

    /// Replace the device's schema with `entries`.
    fn submit_schema(
        &self,
        uuid: &DeviceUuid,
        token: &DeviceToken,
        entries: &[SchemaEntry],
    ) -> impl Future<Output = CloudResult<()>> + Send;

    /// Publish one sensor reading.
    fn push_data(
        &self,
        uuid: &DeviceUuid,
        token: &DeviceToken,
        sensor_id: u8,
        value_type: u8,
        value: &[u8],
    ) -> impl Future<Output = CloudResult<()>> + Send;

    /// Trigger a fetch of pending cloud-to-device data for one sensor.
    fn fetch_data(
        &self,
        uuid: &DeviceUuid,
        token: &DeviceToken,
        sensor_id: u8,
    ) -> impl Future<Output = CloudResult<()>> + Send;

    /// Clear the pending marker after a node answered a set-data push.
    fn ack_set_data(
        &self,
        uuid: &DeviceUuid,
        token: &DeviceToken,
        sensor_id: u8,
    ) -> impl Future<Output = CloudResult<()>> + Send;
}
