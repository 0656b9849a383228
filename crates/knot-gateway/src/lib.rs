//! KNOT gateway daemon.
//!
//! Mediates between resource-constrained sensor nodes speaking the
//! compact binary KNOT protocol over a local transport and a remote
//! cloud service. The [`dispatch::Dispatcher`] is the core: it parses
//! incoming PDUs, maintains per-connection session state in the
//! [`trust::TrustStore`], enforces the register → sign-in → schema →
//! data lifecycle, and produces reply PDUs and cloud operations.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod transport;
pub mod trust;

pub use config::GatewayConfig;
pub use dispatch::{DispatchError, Dispatcher};
pub use error::GatewayError;
pub use trust::{ConnectionId, PeerPid, Trust, TrustStore};
