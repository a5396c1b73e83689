use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the discovery engine
#[derive(Error, Debug)]
pub enum NetworkDiscoveryError {
    #[error("Invalid subnet '{input}': {reason}")]
    InvalidSubnet { input: String, reason: String },

    #[error("Network Interface Error: {0}")]
    NetworkInterface(#[from] network_interface::Error),

    #[error("Interface '{0}' not found or has no usable IPv4 address")]
    InterfaceNotFound(String),

    #[error("Database Error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Error: {0}")]
    Other(String),
}

impl NetworkDiscoveryError {
    pub(crate) fn invalid_subnet(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSubnet {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure of one external tool invocation.
///
/// These never leave the resolvers: each one is coerced into the resolver's
/// fallback or an absent value.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{tool} is not installed or not on PATH")]
    Unavailable { tool: String },

    #[error("{tool} did not finish within {after:?}")]
    Timeout { tool: String, after: Duration },

    #[error("{tool} exited with {status}")]
    Failed { tool: String, status: String },

    #[error("{tool} could not be run: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}
