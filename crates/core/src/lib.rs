//! Domain logic for mockstage: the structural patch engine, the reversible
//! document history store, and edit-label classification.
//!
//! Everything in this crate is pure, synchronous, and free of I/O. The
//! persistence and HTTP layers live in `mockstage-db` and `mockstage-api`.

pub mod error;
pub mod history;
pub mod labels;
pub mod patch;
pub mod types;
