#![forbid(unsafe_code)]

//! Transport sink: delivers the final field record to a backend.
//!
//! Opaque success/failure. Retries, if any, belong to the transport itself,
//! not to the engine.

use std::collections::BTreeMap;
use std::fmt;

/// Delivery failure reported by the transport.
#[derive(Debug, Clone)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport failed: {}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// Accepts the completed submission record.
pub trait TransportSink {
    /// Deliver the record; an error means the backend did not accept it.
    fn deliver(&mut self, record: &BTreeMap<String, String>) -> Result<(), TransportError>;
}

/// Records submissions for assertions in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    /// Delivered records in arrival order.
    pub deliveries: Vec<BTreeMap<String, String>>,
    /// When set, every delivery fails with this message.
    pub fail_with: Option<String>,
}

impl RecordingTransport {
    /// Create a transport that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that rejects everything.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            deliveries: Vec::new(),
            fail_with: Some(message.into()),
        }
    }
}

impl TransportSink for RecordingTransport {
    fn deliver(&mut self, record: &BTreeMap<String, String>) -> Result<(), TransportError> {
        if let Some(msg) = &self.fail_with {
            return Err(TransportError(msg.clone()));
        }
        self.deliveries.push(record.clone());
        Ok(())
    }
}
