//! Unified error handling system
//!
//! Provides structured error types with context, recovery suggestions, and proper error chaining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type PawhavenResult<T> = Result<T, PawhavenError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the Pawhaven system
#[derive(Error, Debug)]
pub enum PawhavenError {
    /// No response was received from the backend
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// The backend answered 401 or 403
    #[error("Authorization error: HTTP {status}")]
    Authorization { status: u16, context: ErrorContext },

    /// The backend answered with `success: false` or a non-2xx status
    #[error("Backend error: {message}")]
    Backend {
        status: Option<u16>,
        message: String,
        context: ErrorContext,
    },

    /// The backend answered, but the body did not have the expected shape
    #[error("Malformed response: {message}")]
    MalformedResponse {
        message: String,
        context: ErrorContext,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PawhavenError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            PawhavenError::Network { context, .. } => Some(context),
            PawhavenError::Authorization { context, .. } => Some(context),
            PawhavenError::Backend { context, .. } => Some(context),
            PawhavenError::MalformedResponse { context, .. } => Some(context),
            PawhavenError::Storage { context, .. } => Some(context),
            PawhavenError::Config { context, .. } => Some(context),
            _ => None,
        }
    }

    /// HTTP status attached to the error, if the backend produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            PawhavenError::Authorization { status, .. } => Some(*status),
            PawhavenError::Backend { status, .. } => *status,
            _ => None,
        }
    }

    /// Log the error with appropriate level
    ///
    /// Failures reported by or on the way to the backend log at `warn`,
    /// local ones at `error`.
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str());
        let operation = self.context().and_then(|c| c.operation.as_deref());
        match self {
            PawhavenError::Network { .. }
            | PawhavenError::Authorization { .. }
            | PawhavenError::Backend { .. }
            | PawhavenError::MalformedResponse { .. } => {
                warn!(
                    error_id,
                    operation,
                    status = self.status(),
                    error = %self,
                    "Backend request failed"
                );
            }
            _ => {
                error!(
                    error_id,
                    operation,
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr) => {
        $crate::PawhavenError::Storage {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::PawhavenError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check that the data directory exists and is writable"),
        }
    };
}

#[macro_export]
macro_rules! malformed_response {
    ($msg:expr, $component:expr) => {
        $crate::PawhavenError::MalformedResponse {
            message: $msg.to_string(),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check that the backend speaks the /auth API version this client expects"),
        }
    };
}
