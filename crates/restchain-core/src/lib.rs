//! restchain-core - Chained REST-query extraction engine
//!
//! Executes a sequence of dependent HTTP API calls where each level's URL and
//! parameters are filled in from fields extracted out of the previous level's
//! responses, and flattens the joined results into a lazy stream of records.

pub mod cancel;
pub mod chain;
pub mod error;
pub mod execute;
pub mod logging;
pub mod path;
pub mod record;
pub mod template;
pub mod transport;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use chain::{Chain, ChainBuilder, JoinSpec, SkipPolicy};
pub use error::{ExtractError, FailurePolicy};
pub use execute::{ExecMode, ExecOptions, ExtractionStream};
pub use logging::init_logging;
pub use path::TuplePath;
pub use record::{FieldValue, Record};
pub use template::UrlTemplate;
pub use transport::{BasicCredential, HttpResponse, HttpTransport, Transport};
