//! Linkdeck client: keeps a local list snapshot in step with the server.
//!
//! The [`store::ReconciliationStore`] applies the user's mutations
//! optimistically and merges server snapshots; [`drag::DragOrderShadow`]
//! protects an in-progress drag from stale refreshes. Transport lives in
//! [`api_client`] and [`realtime`].

pub mod api_client;
pub mod config;
pub mod diff;
pub mod drag;
pub mod error;
pub mod events;
pub mod realtime;
pub mod session;
pub mod store;

pub use api_client::{ListApi, RestClient, WsClient};
pub use config::ClientConfig;
pub use diff::SnapshotDiff;
pub use drag::{DragOrderShadow, DragReason, DragValidation};
pub use error::{ClientError, ClientResult};
pub use session::SessionContext;
pub use store::{MergeDecision, ReconciliationStore};
