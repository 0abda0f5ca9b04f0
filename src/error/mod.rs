//! Error Handling Module
//!
//! Error taxonomy for the relay:
//! - configuration problems are fatal at startup
//! - liveness failures are reported as `false` by the prober and only become
//!   [`RelayError::ServerUnavailable`] once the revival loop gives up
//! - transport failures during streaming are converted into a synthetic
//!   `[Error: ...]` fragment by the decoder and never reach the caller as `Err`
//!
//! # Example
//!
//! ```rust,ignore
//! use ragchat::error::{ErrorCategory, RelayError};
//!
//! let error = RelayError::api_error(503, "Service Unavailable");
//! assert_eq!(error.category(), ErrorCategory::Server);
//! assert!(error.is_retryable());
//! ```

mod conversions;
pub mod types;

pub use types::*;
