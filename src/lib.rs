//! Storage and validation layer of an opportunities board.
//!
//! Providers publish opportunities, each with an application form whose
//! fields are defined at runtime. Applicants' responses are validated against
//! that form before anything is stored.

pub mod config;
pub mod error;
pub mod form;
pub mod input;
pub mod models;
pub mod store;
pub mod util;

pub use error::{GenericError, StoreError, StoreResult};
