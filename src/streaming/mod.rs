//! Streaming Module
//!
//! Everything between the raw HTTP body and the text shown to the user:
//! - envelope extraction from one streamed JSON document
//! - incremental JSON stitching across chunk boundaries
//! - the pull-based fragment stream consumed by the caller

mod decoder;
mod envelope;
mod fragments;

pub use decoder::{DecodeOutcome, JsonStreamDecoder};
pub use envelope::{StreamEnvelope, is_truthy};
pub use fragments::{FragmentStream, StreamState};

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use crate::error::RelayError;

/// Raw response body as a stream of byte chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;
