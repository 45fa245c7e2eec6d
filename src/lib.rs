//! Focus session coordinator: a repeating focus/break countdown with streak
//! tracking, remote persistence with an in-memory fallback, and an ambient
//! sound channel.

pub mod audio;
pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod session;
pub mod settings;
pub mod signal;
pub mod streak;
pub mod ticker;

pub use coordinator::{CoordinatorParts, FocusCoordinator, GatewayEvent, GatewayOp, Snapshot, Wakeup};
pub use error::{FocusError, Result};
pub use session::Mode;
pub use settings::{SessionSettings, SettingUpdate};
