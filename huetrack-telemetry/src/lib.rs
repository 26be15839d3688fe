//! Network-table style telemetry: key-path-addressed numeric entries,
//! replicated to peers in the background.
//!
//! Publishing is always local-first: `set_number` lands in the concurrent
//! entry table and never blocks on connection state. Background session
//! tasks (server or client mode) replicate the table to whoever is
//! listening, eventually.

pub mod error;
pub mod instance;
pub mod net;

pub use error::TelemetryError;
pub use instance::{EntryUpdate, TelemetryEntry, TelemetryInstance, TelemetryTable};
pub use net::{DS_PORT, NT_PORT};
