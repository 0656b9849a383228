//! Unix-socket node transport.
//!
//! Accepts node connections, resolves the peer's process id through
//! `SO_PEERCRED`, frames PDUs by their header-declared length, and feeds
//! them to the shared dispatcher one at a time. The dispatcher observes
//! PDUs on a single connection strictly in arrival order.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;

use knot_core::constants::{HEADER_SIZE, MSG_MAX_SIZE};
use knot_cloud::CloudAdapter;

use crate::dispatch::Dispatcher;
use crate::trust::ConnectionId;

/// Accept node connections forever, spawning one task per connection.
pub async fn serve<C>(
    listener: UnixListener,
    dispatcher: Arc<Mutex<Dispatcher<C>>>,
) -> io::Result<()>
where
    C: CloudAdapter + 'static,
{
    let mut next_id = 0u64;
    loop {
        let (stream, _addr) = listener.accept().await?;
        next_id += 1;
        let conn = ConnectionId::new(next_id);
        tracing::info!(conn = %conn, "node connected");
        tokio::spawn(handle_connection(stream, conn, Arc::clone(&dispatcher)));
    }
}

/// Best-effort peer pid; 0 when the socket cannot report one.
fn peer_pid(stream: &UnixStream) -> i32 {
    match stream.peer_cred() {
        Ok(cred) => cred.pid().unwrap_or(0),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read peer credentials");
            0
        }
    }
}

async fn handle_connection<C>(
    stream: UnixStream,
    conn: ConnectionId,
    dispatcher: Arc<Mutex<Dispatcher<C>>>,
) where
    C: CloudAdapter + 'static,
{
    let pid = peer_pid(&stream);
    let (mut reader, mut writer) = stream.into_split();
    let mut reply = [0u8; MSG_MAX_SIZE];

    loop {
        let mut header = [0u8; HEADER_SIZE];
        match reader.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                tracing::warn!(conn = %conn, error = %e, "read failed");
                break;
            }
        }

        let mut pdu = vec![0u8; HEADER_SIZE + header[1] as usize];
        pdu[..HEADER_SIZE].copy_from_slice(&header);
        if let Err(e) = reader.read_exact(&mut pdu[HEADER_SIZE..]).await {
            tracing::warn!(conn = %conn, error = %e, "read failed mid-PDU");
            break;
        }

        let outcome = {
            let mut dispatcher = dispatcher.lock().await;
            dispatcher.process(conn, pid, &pdu, &mut reply).await
        };

        let octets = match outcome {
            Ok(octets) => octets,
            Err(e) => {
                // Framing already resynchronized on the next header, so a
                // bad body costs only this PDU.
                tracing::warn!(conn = %conn, error = %e, "dropped PDU");
                continue;
            }
        };

        if octets > 0 {
            if let Err(e) = writer.write_all(&reply[..octets]).await {
                tracing::warn!(conn = %conn, error = %e, "write failed");
                break;
            }
        }
    }

    dispatcher.lock().await.connection_closed(conn).await;
    tracing::info!(conn = %conn, "node disconnected");
}
