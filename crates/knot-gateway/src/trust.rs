//! Per-connection session state ("trust") and the store mapping
//! connections to it.
//!
//! A trust exists exactly while its connection is authenticated: it is
//! created by a successful register or sign-in, consulted by every data
//! and schema handler, and destroyed on unregister or connection
//! teardown. The dispatcher owns the store and is re-entered one PDU at a
//! time, so Rust ownership stands in for the reference counting the C
//! implementation needed; handlers copy the credential pair out before
//! suspending on a cloud call instead of borrowing across it.

use std::collections::HashMap;
use std::fmt;
use std::mem;

use knot_core::config::ConfigEntry;
use knot_core::schema::{self, SchemaEntry};
use knot_core::types::{DeviceId, DeviceToken, DeviceUuid};

/// Opaque transport connection handle. The gateway never interprets it
/// except as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Process id of the local peer that opened the connection.
///
/// Transports report 0 when the peer cannot be resolved; that maps to
/// [`PeerPid::UNKNOWN`] so an unresolved peer can never satisfy the
/// register re-transmit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerPid(i32);

impl PeerPid {
    pub const UNKNOWN: PeerPid = PeerPid(i32::MAX);

    pub fn from_raw(raw: i32) -> Self {
        if raw == 0 { Self::UNKNOWN } else { Self(raw) }
    }

    /// Whether a transport-reported raw pid identifies the same peer.
    pub fn matches(self, raw: i32) -> bool {
        self.0 == raw
    }
}

/// Session state for one authenticated connection.
#[derive(Debug)]
pub struct Trust {
    pub peer_pid: PeerPid,
    pub device_id: DeviceId,
    pub uuid: DeviceUuid,
    pub token: DeviceToken,
    /// True while the device is registered with the cloud but has not yet
    /// confirmed by uploading a schema. Torn-down provisional devices are
    /// removed from the cloud so a cloned device id cannot reuse the
    /// credentials.
    pub rollback: bool,
    /// Schema accepted by the cloud.
    pub schema: Vec<SchemaEntry>,
    /// Entries received since the current schema transfer began.
    schema_staging: Vec<SchemaEntry>,
    /// Configuration last received from the cloud.
    pub config: Vec<ConfigEntry>,
}

impl Trust {
    /// A freshly registered device awaiting its first schema upload.
    pub fn provisional(
        uuid: DeviceUuid,
        token: DeviceToken,
        device_id: DeviceId,
        peer_pid: PeerPid,
    ) -> Self {
        Self {
            peer_pid,
            device_id,
            uuid,
            token,
            rollback: true,
            schema: Vec::new(),
            schema_staging: Vec::new(),
            config: Vec::new(),
        }
    }

    /// A device that signed in with existing credentials.
    pub fn signed_in(
        uuid: DeviceUuid,
        token: DeviceToken,
        schema: Vec<SchemaEntry>,
        config: Vec<ConfigEntry>,
    ) -> Self {
        Self {
            peer_pid: PeerPid::UNKNOWN,
            device_id: DeviceId::new(0),
            uuid,
            token,
            rollback: false,
            schema,
            schema_staging: Vec::new(),
            config,
        }
    }

    /// Schema entry for one sensor, from the committed list.
    pub fn sensor_schema(&self, sensor_id: u8) -> Option<&SchemaEntry> {
        schema::find_sensor(&self.schema, sensor_id)
    }

    /// Stage an entry for the in-progress schema transfer. Re-transmitted
    /// entries for an already-staged sensor are ignored.
    pub fn stage_schema(&mut self, entry: SchemaEntry) -> bool {
        schema::stage_unique(&mut self.schema_staging, entry)
    }

    pub fn staged_schema(&self) -> &[SchemaEntry] {
        &self.schema_staging
    }

    /// Promote the staged entries to the committed schema.
    pub fn commit_schema(&mut self) {
        self.schema = mem::take(&mut self.schema_staging);
    }

    /// Drop the staged entries, leaving the committed schema untouched.
    pub fn discard_staged_schema(&mut self) {
        self.schema_staging.clear();
    }

    /// Drop the config entry the node just acknowledged.
    pub fn ack_config(&mut self, sensor_id: u8) {
        self.config.retain(|c| c.sensor_id != sensor_id);
    }
}

/// Error returned when binding a second trust to a live connection.
#[derive(Debug, thiserror::Error)]
#[error("connection {0} already has a session")]
pub struct AlreadyBound(pub ConnectionId);

/// Maps connection handles to sessions: online devices only.
#[derive(Debug, Default)]
pub struct TrustStore {
    entries: HashMap<ConnectionId, Trust>,
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a trust to a connection. Fails if the connection already has
    /// one; callers decide whether to replace.
    pub fn insert(&mut self, conn: ConnectionId, trust: Trust) -> Result<(), AlreadyBound> {
        match self.entries.entry(conn) {
            std::collections::hash_map::Entry::Occupied(_) => Err(AlreadyBound(conn)),
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(trust);
                Ok(())
            }
        }
    }

    /// Borrow the trust for a connection.
    #[must_use]
    pub fn get(&self, conn: &ConnectionId) -> Option<&Trust> {
        self.entries.get(conn)
    }

    pub fn get_mut(&mut self, conn: &ConnectionId) -> Option<&mut Trust> {
        self.entries.get_mut(conn)
    }

    /// Unbind and take ownership of a connection's trust.
    pub fn remove(&mut self, conn: &ConnectionId) -> Option<Trust> {
        self.entries.remove(conn)
    }

    /// Teardown: take every remaining session, leaving the store empty.
    /// The caller releases each one (applying rollback where due).
    pub fn drain(&mut self) -> Vec<(ConnectionId, Trust)> {
        self.entries.drain().collect()
    }

    #[must_use]
    pub fn contains(&self, conn: &ConnectionId) -> bool {
        self.entries.contains_key(conn)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knot_core::constants::{TYPE_ID_PRESSURE, TYPE_ID_TEMPERATURE};
    use knot_core::value::ValueType;

    fn sample_trust() -> Trust {
        Trust::provisional(
            DeviceUuid::new([b'a'; 36]),
            DeviceToken::new([b't'; 40]),
            DeviceId::new(7),
            PeerPid::from_raw(42),
        )
    }

    fn entry(sensor_id: u8, type_id: u16) -> SchemaEntry {
        SchemaEntry {
            sensor_id,
            type_id,
            value_type: ValueType::Int as u8,
            unit: 1,
            name: "sensor".into(),
        }
    }

    #[test]
    fn test_insert_rejects_duplicate_binding() {
        let mut store = TrustStore::new();
        let conn = ConnectionId::new(3);
        store.insert(conn, sample_trust()).unwrap();
        assert!(store.insert(conn, sample_trust()).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_transfers_ownership() {
        let mut store = TrustStore::new();
        let conn = ConnectionId::new(1);
        store.insert(conn, sample_trust()).unwrap();
        let trust = store.remove(&conn).unwrap();
        assert_eq!(trust.device_id, DeviceId::new(7));
        assert!(store.remove(&conn).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_drain_empties_the_store() {
        let mut store = TrustStore::new();
        store.insert(ConnectionId::new(1), sample_trust()).unwrap();
        store.insert(ConnectionId::new(2), sample_trust()).unwrap();
        let drained = store.drain();
        assert_eq!(drained.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_schema_staging_commit_and_discard() {
        let mut trust = sample_trust();
        assert!(trust.stage_schema(entry(1, TYPE_ID_TEMPERATURE)));
        assert!(!trust.stage_schema(entry(1, TYPE_ID_PRESSURE)));
        assert!(trust.stage_schema(entry(2, TYPE_ID_PRESSURE)));
        assert_eq!(trust.staged_schema().len(), 2);
        assert!(trust.schema.is_empty());

        trust.commit_schema();
        assert_eq!(trust.schema.len(), 2);
        assert!(trust.staged_schema().is_empty());
        assert_eq!(trust.sensor_schema(1).unwrap().type_id, TYPE_ID_TEMPERATURE);

        trust.stage_schema(entry(3, TYPE_ID_TEMPERATURE));
        trust.discard_staged_schema();
        assert!(trust.staged_schema().is_empty());
        assert_eq!(trust.schema.len(), 2);
    }

    #[test]
    fn test_ack_config_removes_matching_sensor() {
        let mut trust = sample_trust();
        trust.config = vec![
            ConfigEntry {
                sensor_id: 1,
                ..ConfigEntry::default()
            },
            ConfigEntry {
                sensor_id: 2,
                ..ConfigEntry::default()
            },
        ];
        trust.ack_config(1);
        assert_eq!(trust.config.len(), 1);
        assert_eq!(trust.config[0].sensor_id, 2);
        trust.ack_config(9);
        assert_eq!(trust.config.len(), 1);
    }

    #[test]
    fn test_unknown_peer_never_matches() {
        assert!(!PeerPid::UNKNOWN.matches(0));
        assert!(!PeerPid::from_raw(0).matches(0));
        assert!(PeerPid::from_raw(42).matches(42));
        assert!(!PeerPid::from_raw(42).matches(43));
    }
}
