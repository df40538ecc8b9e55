//! The HTTP transfer driver (`spec.md §4.1`).

mod driver;
mod options;

pub use driver::{empty_headers, Completion, TransferDriver, TransferOutcome};
pub use options::{HeaderSet, Method, RequestOptions};
