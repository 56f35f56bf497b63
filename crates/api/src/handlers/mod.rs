//! Request handlers.
//!
//! Handlers delegate to the corresponding repository in `mockstage_db`
//! and map write outcomes and errors via [`AppError`](crate::error::AppError).

pub mod project;
