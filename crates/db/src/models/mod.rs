//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - Plain input structs for writes
//! - The outcome enums repositories return for guarded writes

pub mod project;
