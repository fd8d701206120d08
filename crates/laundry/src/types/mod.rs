//! Shared request, response and error types.

pub mod errors;
pub mod requests;
pub mod responses;

pub use errors::{LaundryError, LaundryResult};
pub use requests::*;
pub use responses::*;
