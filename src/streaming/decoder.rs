//! Incremental JSON stitching
//!
//! The chat endpoint streams concatenated JSON documents that are not
//! guaranteed to be newline-delimited, and a single document may be split
//! across any number of network chunks (even in the middle of a UTF-8
//! sequence). [`JsonStreamDecoder`] keeps the unconsumed bytes and decodes one
//! complete document at a time from the front of its buffer.

use serde_json::Value;

use super::envelope::StreamEnvelope;

/// Result of one decode attempt at the front of the buffer
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// A complete document was consumed from the buffer
    DocumentParsed(StreamEnvelope),
    /// The buffer is empty or ends before the document does
    NeedMoreData,
    /// The bytes at the front of the buffer are not valid JSON (yet)
    Malformed(String),
}

/// Byte buffer that yields complete JSON documents as they become available
#[derive(Debug, Default)]
pub struct JsonStreamDecoder {
    buffer: Vec<u8>,
    documents: usize,
}

impl JsonStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw transport chunk
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Number of buffered bytes not yet consumed by a document
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of documents decoded so far
    pub fn documents_decoded(&self) -> usize {
        self.documents
    }

    /// Unconsumed bytes, for diagnostics
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Try to decode one document from the front of the buffer.
    ///
    /// On success the consumed prefix and any whitespace after it are removed
    /// and the remainder is kept for the next call. On failure the buffer is left untouched (apart from
    /// leading whitespace) so the same position is retried after more data
    /// arrives.
    pub fn next_document(&mut self) -> DecodeOutcome {
        self.trim_leading_whitespace();
        if self.buffer.is_empty() {
            return DecodeOutcome::NeedMoreData;
        }

        let (next, consumed) = {
            let mut stream =
                serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            let next = stream.next();
            (next, stream.byte_offset())
        };
        match next {
            Some(Ok(value)) => {
                self.buffer.drain(..consumed);
                self.trim_leading_whitespace();
                self.documents += 1;
                DecodeOutcome::DocumentParsed(StreamEnvelope::from_value(&value))
            }
            Some(Err(e)) if e.is_eof() => DecodeOutcome::NeedMoreData,
            Some(Err(e)) => DecodeOutcome::Malformed(e.to_string()),
            None => DecodeOutcome::NeedMoreData,
        }
    }

    fn trim_leading_whitespace(&mut self) {
        let start = self
            .buffer
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(self.buffer.len());
        if start > 0 {
            self.buffer.drain(..start);
        }
    }
}
