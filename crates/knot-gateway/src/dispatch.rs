//! The KNOT message dispatcher.
//!
//! One `process` call handles one decoded PDU on one connection: it
//! enforces the protocol lifecycle (register → sign-in → schema upload →
//! data exchange) against the trust store, calls the cloud adapter where
//! the protocol requires it, and writes the reply PDU into the caller's
//! output buffer. PDUs on a single connection are processed in arrival
//! order; the dispatcher never suspends while holding a borrow into the
//! store.

use knot_core::constants::{MSG_MAX_SIZE, MessageType};
use knot_core::pdu::{wire, AuthMsg, DataMsg, KnotMsg, RegisterMsg, SchemaMsg};
use knot_core::schema::{self, SchemaEntry};
use knot_core::{PduError, ResultCode};

use knot_cloud::{CloudAdapter, Credential};

use crate::trust::{ConnectionId, PeerPid, Trust, TrustStore};

/// Transport-level processing failures. These produce no reply PDU; the
/// transport decides whether to keep the connection.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("output buffer too small: need {need} bytes, got {got}")]
    OutputTooSmall { need: usize, got: usize },
    #[error("malformed PDU: {0}")]
    Malformed(#[from] PduError),
}

/// The message-processing state machine over one trust store and one
/// cloud adapter.
pub struct Dispatcher<C> {
    trusts: TrustStore,
    cloud: C,
}

impl<C: CloudAdapter> Dispatcher<C> {
    pub fn new(cloud: C) -> Self {
        Self {
            trusts: TrustStore::new(),
            cloud,
        }
    }

    pub fn cloud(&self) -> &C {
        &self.cloud
    }

    pub fn trusts(&self) -> &TrustStore {
        &self.trusts
    }

    /// Process one PDU received on `conn` and write the reply into
    /// `opdu`.
    ///
    /// `peer_pid` is the transport-resolved peer process id, 0 when
    /// unknown. Returns the octet count to transmit; 0 means no reply.
    pub async fn process(
        &mut self,
        conn: ConnectionId,
        peer_pid: i32,
        ipdu: &[u8],
        opdu: &mut [u8],
    ) -> Result<usize, DispatchError> {
        if opdu.len() < MSG_MAX_SIZE {
            return Err(DispatchError::OutputTooSmall {
                need: MSG_MAX_SIZE,
                got: opdu.len(),
            });
        }

        let msg = match KnotMsg::decode(ipdu) {
            Ok(msg) => msg,
            Err(PduError::UnknownType(t)) => {
                // Well-formed header, unrecognized operation: the reply
                // carries no specific response type.
                tracing::warn!(conn = %conn, msg_type = t, "unrecognized message type");
                return Ok(wire::write_reply(
                    opdu,
                    MessageType::Invalid,
                    ResultCode::InvalidData,
                ));
            }
            Err(e) => {
                tracing::error!(conn = %conn, error = %e, "structurally invalid PDU");
                return Err(e.into());
            }
        };

        let op = msg.msg_type();
        tracing::debug!(conn = %conn, ?op, len = ipdu.len(), "processing PDU");

        let written = match msg {
            KnotMsg::RegisterReq(req) => {
                let (result, credential) = self.register(conn, peer_pid, &req).await;
                match credential {
                    Some(cred) => wire::write_credential_reply(
                        opdu,
                        MessageType::RegisterResp,
                        result,
                        &cred.uuid,
                        &cred.token,
                    ),
                    None => wire::write_reply(opdu, MessageType::RegisterResp, result),
                }
            }
            KnotMsg::UnregisterReq => {
                let result = self.unregister(conn).await;
                wire::write_reply(opdu, MessageType::UnregisterResp, result)
            }
            KnotMsg::AuthReq(auth) => {
                let result = self.auth(conn, &auth).await;
                wire::write_reply(opdu, MessageType::AuthResp, result)
            }
            KnotMsg::Schema(entry) => {
                let result = self.schema(conn, &entry, false).await;
                wire::write_reply(opdu, MessageType::SchemaResp, result)
            }
            KnotMsg::SchemaEnd(entry) => {
                let result = self.schema(conn, &entry, true).await;
                wire::write_reply(opdu, MessageType::SchemaEndResp, result)
            }
            KnotMsg::PushData(data) => {
                let result = self.data(conn, &data).await;
                wire::write_reply(opdu, MessageType::DataResp, result)
            }
            KnotMsg::ConfigResp(item) => {
                // No octets to be transmitted.
                let result = self.config_ack(conn, item.sensor_id);
                if result != ResultCode::Success {
                    tracing::info!(conn = %conn, code = ?result, "config ack discarded");
                }
                0
            }
            KnotMsg::SetDataResp(data) => {
                let result = self.set_data_resp(conn, &data).await;
                if result != ResultCode::Success {
                    tracing::info!(conn = %conn, code = ?result, "set-data response discarded");
                }
                0
            }
            // Response-direction messages are never valid from a node.
            KnotMsg::RegisterResp(_)
            | KnotMsg::UnregisterResp(_)
            | KnotMsg::AuthResp(_)
            | KnotMsg::SchemaResp(_)
            | KnotMsg::SchemaEndResp(_) => {
                tracing::warn!(conn = %conn, ?op, "response type received from node");
                wire::write_reply(opdu, MessageType::Invalid, ResultCode::InvalidData)
            }
        };

        Ok(written)
    }

    /// The transport lost the connection; drop its session, rolling back
    /// a provisional registration.
    pub async fn connection_closed(&mut self, conn: ConnectionId) {
        let Some(trust) = self.trusts.remove(&conn) else {
            return;
        };
        tracing::info!(conn = %conn, uuid = %trust.uuid, "session ended with connection");
        self.release(trust).await;
    }

    /// Drop every remaining session, applying the rollback rule to each.
    pub async fn shutdown(&mut self) {
        for (conn, trust) in self.trusts.drain() {
            tracing::debug!(conn = %conn, uuid = %trust.uuid, "dropping session at shutdown");
            self.release(trust).await;
        }
    }

    /// Release an owned trust. A provisional device (no schema ever
    /// received) is removed from the cloud so its credentials cannot be
    /// replayed by a clone.
    async fn release(&self, trust: Trust) {
        if !trust.rollback {
            return;
        }
        if let Err(code) = self.cloud.remove_device(&trust.uuid, &trust.token).await {
            tracing::warn!(uuid = %trust.uuid, code = ?code, "rollback removal failed");
        }
    }

    async fn register(
        &mut self,
        conn: ConnectionId,
        raw_pid: i32,
        req: &RegisterMsg,
    ) -> (ResultCode, Option<Credential>) {
        if req.name.first().copied().unwrap_or(0) == 0 {
            tracing::warn!(conn = %conn, "register request missing device name");
            return (ResultCode::RegisterInvalidDeviceName, None);
        }

        tracing::info!(conn = %conn, device_id = %req.device_id, pid = raw_pid, "registering device");

        // Radio peers re-transmit the register request when the response
        // is lost (~20 s). A matching device id from the same peer gets
        // the stored credential back instead of a second registration.
        if let Some(trust) = self.trusts.get(&conn) {
            if trust.device_id == req.device_id && trust.peer_pid.matches(raw_pid) {
                tracing::info!(conn = %conn, "register re-transmit from trusted peer");
                return (
                    ResultCode::Success,
                    Some(Credential {
                        uuid: trust.uuid,
                        token: trust.token,
                    }),
                );
            }
        }

        let name = printable_name(&req.name);
        let cred = match self.cloud.register_device(&name, req.device_id).await {
            Ok(cred) => cred,
            Err(code) => return (code, None),
        };
        tracing::info!(uuid = %cred.uuid, "device registered with cloud");

        if let Err(code) = self.cloud.sign_in(&cred.uuid, &cred.token).await {
            return (code, None);
        }

        // A leftover session for this connection did not match the
        // request; it belongs to a previous peer and is replaced.
        if let Some(stale) = self.trusts.remove(&conn) {
            tracing::warn!(conn = %conn, uuid = %stale.uuid, "replacing stale session");
            self.release(stale).await;
        }

        let trust = Trust::provisional(
            cred.uuid,
            cred.token,
            req.device_id,
            PeerPid::from_raw(raw_pid),
        );
        if self.trusts.insert(conn, trust).is_err() {
            return (ResultCode::ErrorUnknown, None);
        }

        (ResultCode::Success, Some(cred))
    }

    async fn auth(&mut self, conn: ConnectionId, msg: &AuthMsg) -> ResultCode {
        if self.trusts.contains(&conn) {
            tracing::info!(conn = %conn, "authenticated already");
            return ResultCode::Success;
        }

        let signin = match self.cloud.sign_in(&msg.uuid, &msg.token).await {
            Ok(signin) => signin,
            Err(code) => return code,
        };

        if signin.schema.is_empty() {
            return ResultCode::SchemaEmpty;
        }

        // A bad configuration from the cloud must not block sign-in; the
        // session continues without one.
        let config = match knot_core::config::validate(&signin.config) {
            Ok(()) => signin.config,
            Err(e) => {
                tracing::warn!(conn = %conn, error = %e, "discarding invalid cloud configuration");
                Vec::new()
            }
        };

        let trust = Trust::signed_in(msg.uuid, msg.token, signin.schema, config);
        match self.trusts.insert(conn, trust) {
            Ok(()) => ResultCode::Success,
            Err(_) => ResultCode::ErrorUnknown,
        }
    }

    async fn schema(&mut self, conn: ConnectionId, msg: &SchemaMsg, end: bool) -> ResultCode {
        let Some(trust) = self.trusts.get_mut(&conn) else {
            tracing::info!(conn = %conn, "permission denied");
            return ResultCode::CredentialUnauthorized;
        };

        // The first schema PDU proves the node holds its credentials, so
        // the provisional registration stops being rolled back on
        // teardown. The flip happens once and is never re-armed.
        if trust.rollback {
            trust.rollback = false;
            tracing::info!(uuid = %trust.uuid, "registration confirmed by schema upload");
        }

        trust.stage_schema(SchemaEntry::from(msg));

        if !end {
            return ResultCode::Success;
        }

        let uuid = trust.uuid;
        let token = trust.token;
        let staged = trust.staged_schema().to_vec();

        match self.cloud.submit_schema(&uuid, &token, &staged).await {
            Ok(()) => {
                if let Some(trust) = self.trusts.get_mut(&conn) {
                    trust.commit_schema();
                    tracing::info!(uuid = %uuid, sensors = staged.len(), "schema accepted by cloud");
                }
                ResultCode::Success
            }
            Err(code) => {
                if let Some(trust) = self.trusts.get_mut(&conn) {
                    trust.discard_staged_schema();
                }
                tracing::warn!(uuid = %uuid, code = ?code, "schema rejected by cloud");
                code
            }
        }
    }

    async fn data(&mut self, conn: ConnectionId, msg: &DataMsg) -> ResultCode {
        let Some(trust) = self.trusts.get(&conn) else {
            tracing::info!(conn = %conn, "permission denied");
            return ResultCode::CredentialUnauthorized;
        };

        let Some(entry) = trust.sensor_schema(msg.sensor_id) else {
            tracing::info!(sensor_id = msg.sensor_id, "no schema for sensor");
            return ResultCode::InvalidData;
        };
        if !schema::is_valid(entry.type_id, entry.value_type, entry.unit) {
            tracing::info!(
                sensor_id = msg.sensor_id,
                type_id = entry.type_id,
                "schema type/unit mismatch"
            );
            return ResultCode::InvalidData;
        }

        let uuid = trust.uuid;
        let token = trust.token;
        let value_type = entry.value_type;

        let result = match self
            .cloud
            .push_data(&uuid, &token, msg.sensor_id, value_type, &msg.value)
            .await
        {
            Ok(()) => ResultCode::Success,
            Err(code) => code,
        };

        // Best-effort fetch trigger; its outcome never affects the reply.
        if let Err(code) = self.cloud.fetch_data(&uuid, &token, msg.sensor_id).await {
            tracing::debug!(sensor_id = msg.sensor_id, code = ?code, "fetch trigger failed");
        }

        result
    }

    fn config_ack(&mut self, conn: ConnectionId, sensor_id: u8) -> ResultCode {
        let Some(trust) = self.trusts.get_mut(&conn) else {
            tracing::info!(conn = %conn, "permission denied");
            return ResultCode::CredentialUnauthorized;
        };
        trust.ack_config(sensor_id);
        tracing::info!(uuid = %trust.uuid, sensor_id, "node acknowledged configuration");
        ResultCode::Success
    }

    /// Node answered a set-data push: clear the pending marker, then
    /// publish the confirmed value.
    async fn set_data_resp(&mut self, conn: ConnectionId, msg: &DataMsg) -> ResultCode {
        let Some(trust) = self.trusts.get(&conn) else {
            tracing::info!(conn = %conn, "permission denied");
            return ResultCode::CredentialUnauthorized;
        };

        let Some(entry) = trust.sensor_schema(msg.sensor_id) else {
            tracing::info!(sensor_id = msg.sensor_id, "no schema for sensor");
            return ResultCode::InvalidData;
        };
        if !schema::is_valid(entry.type_id, entry.value_type, entry.unit) {
            tracing::info!(
                sensor_id = msg.sensor_id,
                type_id = entry.type_id,
                "schema type/unit mismatch"
            );
            return ResultCode::InvalidData;
        }

        let uuid = trust.uuid;
        let token = trust.token;
        let value_type = entry.value_type;

        if let Err(code) = self.cloud.ack_set_data(&uuid, &token, msg.sensor_id).await {
            tracing::debug!(sensor_id = msg.sensor_id, code = ?code, "set-data ack failed");
        }

        match self
            .cloud
            .push_data(&uuid, &token, msg.sensor_id, value_type, &msg.value)
            .await
        {
            Ok(()) => {
                tracing::info!(uuid = %uuid, sensor_id = msg.sensor_id, "set-data confirmed");
                ResultCode::Success
            }
            Err(code) => code,
        }
    }

    async fn unregister(&mut self, conn: ConnectionId) -> ResultCode {
        let Some(trust) = self.trusts.get(&conn) else {
            tracing::info!(conn = %conn, "permission denied");
            return ResultCode::CredentialUnauthorized;
        };
        let uuid = trust.uuid;
        let token = trust.token;

        tracing::info!(uuid = %uuid, "removing device from cloud");
        match self.cloud.remove_device(&uuid, &token).await {
            Ok(()) => {
                self.trusts.remove(&conn);
                ResultCode::Success
            }
            Err(code) => code,
        }
    }
}

/// Device name as sent on the wire: bytes up to the first NUL, decoded
/// leniently.
fn printable_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
