// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Plugin error types
//!
//! One error kind per failure class a backend can surface. The kinds are
//! passed through verbatim to callers so a front end can tell a missing
//! network apart from a full disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur while running plugins and jobs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PluginError {
    #[error("Failed: {0}")]
    Failed(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    // Connectivity
    #[error("No network: {0}")]
    NoNetwork(String),

    #[error("No security: {0}")]
    NoSecurity(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Timed out: {0}")]
    TimedOut(String),

    // Local system
    #[error("No space: {0}")]
    NoSpace(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Restart required: {0}")]
    RestartRequired(String),

    #[error("AC power required: {0}")]
    AcPowerRequired(String),

    // Authentication
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Authentication invalid: {0}")]
    AuthInvalid(String),

    #[error("PIN required: {0}")]
    PinRequired(String),

    #[error("Account suspended: {0}")]
    AccountSuspended(String),

    #[error("Account deactivated: {0}")]
    AccountDeactivated(String),

    // Setup
    #[error("Plugin dependency resolution failed: {0}")]
    DepsolveFailed(String),
}

/// Kind of a [`PluginError`], without the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginErrorKind {
    Failed,
    NotSupported,
    Cancelled,
    NoNetwork,
    NoSecurity,
    DownloadFailed,
    TimedOut,
    NoSpace,
    WriteFailed,
    DeleteFailed,
    InvalidFormat,
    RestartRequired,
    AcPowerRequired,
    AuthRequired,
    AuthInvalid,
    PinRequired,
    AccountSuspended,
    AccountDeactivated,
    DepsolveFailed,
}

impl PluginErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginErrorKind::Failed => "failed",
            PluginErrorKind::NotSupported => "not-supported",
            PluginErrorKind::Cancelled => "cancelled",
            PluginErrorKind::NoNetwork => "no-network",
            PluginErrorKind::NoSecurity => "no-security",
            PluginErrorKind::DownloadFailed => "download-failed",
            PluginErrorKind::TimedOut => "timed-out",
            PluginErrorKind::NoSpace => "no-space",
            PluginErrorKind::WriteFailed => "write-failed",
            PluginErrorKind::DeleteFailed => "delete-failed",
            PluginErrorKind::InvalidFormat => "invalid-format",
            PluginErrorKind::RestartRequired => "restart-required",
            PluginErrorKind::AcPowerRequired => "ac-power-required",
            PluginErrorKind::AuthRequired => "auth-required",
            PluginErrorKind::AuthInvalid => "auth-invalid",
            PluginErrorKind::PinRequired => "pin-required",
            PluginErrorKind::AccountSuspended => "account-suspended",
            PluginErrorKind::AccountDeactivated => "account-deactivated",
            PluginErrorKind::DepsolveFailed => "plugin-depsolve-failed",
        }
    }
}

impl fmt::Display for PluginErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PluginError {
    /// Shorthand for a cancellation error
    pub fn cancelled() -> Self {
        PluginError::Cancelled("operation was cancelled".to_string())
    }

    /// Shorthand for a not-supported error naming the operation
    pub fn not_supported(what: impl Into<String>) -> Self {
        PluginError::NotSupported(what.into())
    }

    /// Get the kind of this error
    pub fn kind(&self) -> PluginErrorKind {
        match self {
            PluginError::Failed(_) => PluginErrorKind::Failed,
            PluginError::NotSupported(_) => PluginErrorKind::NotSupported,
            PluginError::Cancelled(_) => PluginErrorKind::Cancelled,
            PluginError::NoNetwork(_) => PluginErrorKind::NoNetwork,
            PluginError::NoSecurity(_) => PluginErrorKind::NoSecurity,
            PluginError::DownloadFailed(_) => PluginErrorKind::DownloadFailed,
            PluginError::TimedOut(_) => PluginErrorKind::TimedOut,
            PluginError::NoSpace(_) => PluginErrorKind::NoSpace,
            PluginError::WriteFailed(_) => PluginErrorKind::WriteFailed,
            PluginError::DeleteFailed(_) => PluginErrorKind::DeleteFailed,
            PluginError::InvalidFormat(_) => PluginErrorKind::InvalidFormat,
            PluginError::RestartRequired(_) => PluginErrorKind::RestartRequired,
            PluginError::AcPowerRequired(_) => PluginErrorKind::AcPowerRequired,
            PluginError::AuthRequired(_) => PluginErrorKind::AuthRequired,
            PluginError::AuthInvalid(_) => PluginErrorKind::AuthInvalid,
            PluginError::PinRequired(_) => PluginErrorKind::PinRequired,
            PluginError::AccountSuspended(_) => PluginErrorKind::AccountSuspended,
            PluginError::AccountDeactivated(_) => PluginErrorKind::AccountDeactivated,
            PluginError::DepsolveFailed(_) => PluginErrorKind::DepsolveFailed,
        }
    }

    /// Check if this error is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PluginError::Cancelled(_))
    }

    /// Get the human-readable message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            PluginError::Failed(m)
            | PluginError::NotSupported(m)
            | PluginError::Cancelled(m)
            | PluginError::NoNetwork(m)
            | PluginError::NoSecurity(m)
            | PluginError::DownloadFailed(m)
            | PluginError::TimedOut(m)
            | PluginError::NoSpace(m)
            | PluginError::WriteFailed(m)
            | PluginError::DeleteFailed(m)
            | PluginError::InvalidFormat(m)
            | PluginError::RestartRequired(m)
            | PluginError::AcPowerRequired(m)
            | PluginError::AuthRequired(m)
            | PluginError::AuthInvalid(m)
            | PluginError::PinRequired(m)
            | PluginError::AccountSuspended(m)
            | PluginError::AccountDeactivated(m)
            | PluginError::DepsolveFailed(m) => m,
        }
    }
}

impl From<std::io::Error> for PluginError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::Interrupted => PluginError::Cancelled(e.to_string()),
            std::io::ErrorKind::TimedOut => PluginError::TimedOut(e.to_string()),
            std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidData => {
                PluginError::InvalidFormat(e.to_string())
            }
            _ => PluginError::WriteFailed(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(e: serde_json::Error) -> Self {
        PluginError::InvalidFormat(e.to_string())
    }
}

impl From<toml::de::Error> for PluginError {
    fn from(e: toml::de::Error) -> Self {
        PluginError::InvalidFormat(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_message() {
        let err = PluginError::NoSpace("disk full".to_string());
        assert_eq!(err.kind(), PluginErrorKind::NoSpace);
        assert_eq!(err.message(), "disk full");
        assert_eq!(err.to_string(), "No space: disk full");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancelled() {
        let err = PluginError::cancelled();
        assert!(err.is_cancelled());
        assert_eq!(err.kind().as_str(), "cancelled");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Interrupted, "stop");
        assert!(PluginError::from(io).is_cancelled());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(PluginError::from(io).kind(), PluginErrorKind::WriteFailed);
    }

    #[test]
    fn test_toml_conversion() {
        let err: PluginError = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
        assert_eq!(err.kind(), PluginErrorKind::InvalidFormat);
    }
}
