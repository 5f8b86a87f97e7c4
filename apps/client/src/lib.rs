//! SkillBridge API client.
//!
//! `ApiClient` is the one place requests leave the process: it attaches the
//! persisted bearer token, invalidates the session on 401 and collapses
//! identical in-flight GETs. The resource APIs, `Session` and the CLI all sit
//! on top of it.

pub mod config;
pub mod errors;
pub mod http;
pub mod insights;
pub mod models;
pub mod resources;
pub mod session;
pub mod storage;

pub use errors::{ApiError, SessionError, StoreError, TransportError};
pub use http::{ApiClient, ApiRequest, ApiResponse, ReqwestTransport, Transport};
pub use resources::SkillBridgeApi;
pub use session::{Role, Session};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
