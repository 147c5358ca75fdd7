#![deny(missing_docs)]
#![doc = "Shared error and identity types for the EMX experiment tooling."]

pub mod errors;
mod id;

pub use errors::{EmxError, ErrorInfo};
pub use id::{ExpId, RunId};
