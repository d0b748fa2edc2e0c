//! REST API access for CodeClarity.
//!
//! - `Transport` builds URLs, signs requests and maps HTTP failures;
//! - `envelope` unwraps the `{status_code, status, data}` response wrapper;
//! - `ApiClient` exposes one typed method per endpoint.

pub mod client;
pub mod envelope;
pub mod error;
pub mod transport;

pub use client::{encode_query_value, ApiClient, DEFAULT_ENTRIES_PER_PAGE, DEFAULT_WORKSPACE};
pub use envelope::Envelope;
pub use error::{ApiError, DecodeError, DecodeStage, ErrorBody};
pub use transport::Transport;
