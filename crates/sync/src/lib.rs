//! Client-side synchronization for mockstage projects.
//!
//! - [`gate`] -- the typed contract of the server's revision gate: the
//!   [`ProjectGate`] trait, wire DTOs, and the [`GateError`] taxonomy.
//! - [`client`] -- [`HttpGate`], the reqwest-backed implementation.
//! - [`local`] -- the [`LocalProjects`] seam over the device-local record
//!   set, plus an in-memory implementation.
//! - [`orchestrator`] -- [`SyncOrchestrator`], which drains local edits
//!   through the gate and exposes an observable [`SyncStatus`].
//!
//! *When* to synchronize (timers, retry, backoff) is the embedder's
//! policy. This crate performs exactly one pass per explicit call and
//! never retries internally; conflicts are surfaced, never merged.

pub mod client;
pub mod gate;
pub mod local;
pub mod orchestrator;
pub mod status;

pub use client::HttpGate;
pub use gate::{GateError, ProjectGate};
pub use local::{LocalProjects, MemoryProjects};
pub use orchestrator::SyncOrchestrator;
pub use status::SyncStatus;
