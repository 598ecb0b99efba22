//! Task input model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key carrying the caller's correlation id.
pub const CORRELATION_ID_KEY: &str = "correlation_id";

/// Metadata key carrying the caller's conversation id.
pub const CONVERSATION_ID_KEY: &str = "conversation_id";

/// A natural-language task submitted to the pipeline.
///
/// Created once per run and read-only thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    text: String,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_correlation_id(self, id: impl Into<String>) -> Self {
        self.with_metadata(CORRELATION_ID_KEY, id)
    }

    pub fn with_conversation_id(self, id: impl Into<String>) -> Self {
        self.with_metadata(CONVERSATION_ID_KEY, id)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.metadata.get(CORRELATION_ID_KEY).map(String::as_str)
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.metadata.get(CONVERSATION_ID_KEY).map(String::as_str)
    }

    /// Cache key for the task: surrounding whitespace is not significant.
    pub fn normalized(&self) -> &str {
        self.text.trim()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

impl From<&str> for Task {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Task {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
