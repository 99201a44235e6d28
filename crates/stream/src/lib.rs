//! Reconnecting client for council session streams.
//!
//! [`ConnectionController`] keeps one Server-Sent Events stream open per
//! session, folds every frame into a [`StateStore`], and reconnects with
//! linear backoff until the workflow completes or the attempts run out.

pub mod authorization;
pub mod config;
pub mod controller;
pub mod error;
pub mod log;
pub mod policy;
pub mod projector;
pub mod store;
pub mod transport;

pub use authorization::AuthorizationDetector;
pub use config::StreamConfig;
pub use controller::ConnectionController;
pub use error::{Result, StreamError};
pub use log::MessageLog;
pub use policy::ReconnectPolicy;
pub use projector::{Projector, ProjectorUpdate};
pub use store::{RunLease, SessionSnapshot, StateStore};
pub use transport::{FrameReceiver, SseTransport, Transport};
