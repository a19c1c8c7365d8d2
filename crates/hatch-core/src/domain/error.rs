// ============================================================================
// domain/error.rs - DOMAIN ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (so they can be carried inside application errors)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Invalid package name '{name}': {reason}")]
    InvalidPackageName { name: String, reason: String },

    #[error("Invalid version '{version}' for {package}")]
    InvalidVersion { package: String, version: String },

    #[error("Invalid project name '{name}'")]
    InvalidProjectName { name: String },

    #[error("Version of package '{package}' has not been resolved yet")]
    UnresolvedVersion { package: String },

    // ========================================================================
    // Manifest Errors
    // ========================================================================
    #[error("Unknown template install type '{value}'")]
    UnknownInstallKind { value: String },

    #[error("Template '{template}' is not tagged for {kind}")]
    TemplateKindMismatch { template: String, kind: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidProjectName { name } => vec![
                format!("'{}' is not a valid project name", name),
                "Start with a letter; use letters, digits, '-' or '_'".into(),
                "Each '-' or '_' must be followed by a letter".into(),
                "Examples: my-app, my_app, app2".into(),
            ],
            Self::InvalidVersion { .. } => vec![
                "Versions must be semantic versions: x.y.z".into(),
                "Or use 'latest'".into(),
            ],
            Self::UnknownInstallKind { .. } => vec![
                "Template 'type' must be either 'normal' or 'custom'".into(),
                "Ask the template author to fix the template manifest".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidPackageName { .. }
            | Self::InvalidVersion { .. }
            | Self::InvalidProjectName { .. }
            | Self::TemplateKindMismatch { .. } => ErrorCategory::Validation,
            Self::UnknownInstallKind { .. } => ErrorCategory::Manifest,
            Self::UnresolvedVersion { .. } => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Manifest,
    Internal,
}
