//! Capabilities that feed content into a publish cycle.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::domain::{document::PreviewDocument, value::ContentValue};

use super::error::ContentProductionError;

/// A content source asked once per cycle for its current output.
#[async_trait]
pub trait Contributor: Send + Sync {
    /// Produce the current value. May suspend, e.g. while a transpiler runs.
    async fn produce_value(&self) -> Result<ContentValue, ContentProductionError>;

    /// Merge priority, read once per cycle before production starts.
    fn priority(&self) -> i32;

    /// Name used in diagnostics and error reports.
    fn label(&self) -> &str {
        "contributor"
    }
}

/// Escape hatch for callers that want to edit the document under
/// construction directly instead of producing a value.
#[async_trait]
pub trait DocumentAlterer: Send + Sync {
    async fn alter(&self, document: &mut PreviewDocument) -> Result<(), ContentProductionError>;

    fn label(&self) -> &str {
        "alterer"
    }
}

#[derive(Clone)]
pub enum Payload {
    Value(ContentValue),
    Alterer(Arc<dyn DocumentAlterer>),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Payload::Alterer(alterer) => f.debug_tuple("Alterer").field(&alterer.label()).finish(),
        }
    }
}

/// A payload paired with its effective merge priority and registration index.
#[derive(Debug, Clone)]
pub struct Contribution {
    priority: i32,
    sequence: usize,
    payload: Payload,
}

impl Contribution {
    pub fn new(sequence: usize, priority: i32, payload: Payload) -> Self {
        Self {
            priority,
            sequence,
            payload,
        }
    }

    /// Contribution that takes its priority from the value itself.
    pub fn from_value(sequence: usize, value: ContentValue) -> Self {
        Self::new(sequence, value.priority(), Payload::Value(value))
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn value(&self) -> Option<&ContentValue> {
        match &self.payload {
            Payload::Value(value) => Some(value),
            Payload::Alterer(_) => None,
        }
    }
}
