//! Core types and protocol logic for the Safetrail tourist-safety alerting
//! system.
//!
//! No HTTP and no database live here. The persisted key-value store and the
//! primary broadcast channel are traits ([`store::KeyValueStore`],
//! [`channel::Broadcaster`]) injected into the reporter [`session::Session`]
//! and the observer [`dashboard::Dashboard`].

pub mod alert;
pub mod alert_store;
pub mod builder;
pub mod channel;
pub mod dashboard;
pub mod error;
pub mod event;
pub mod facility;
pub mod geo;
pub mod ids;
pub mod mailbox;
pub mod session;
pub mod store;

pub use error::{Error, Result};
