//! Core of the imscp toolkit: a SCORM 1.2 runtime, key-value stores, and
//! the bridge that persists a session's CMI state between launches.

pub mod bridge;
pub mod config;
pub mod error;
pub mod runtime;
pub mod session;
pub mod system;

pub use bridge::{attach, BridgeHandle, PersistenceBridge};
pub use config::{BridgeConfig, ToolConfig};
pub use error::{CoreError, SessionError, StoreError};
pub use runtime::ScormApi;
pub use session::{CmiSource, LifecycleEvent, Session};
