//! Project metadata used as the rendering context.
//!
//! [`ProjectInfo`] is built by the CLI layer and handed to the rendering pass
//! verbatim; its serialized form is what template placeholders see:
//!
//! | Key               | Example          |
//! |-------------------|------------------|
//! | `type`            | `"project"`      |
//! | `name`            | `"MyApp"`        |
//! | `version`         | `"1.0.0"`        |
//! | `className`       | `"my-app"`       |
//! | `description`     | `"Admin panel"`  |
//! | `projectTemplate` | `"@acme/vue-tpl"`|

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Whether a project or a component is being created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    #[default]
    Project,
    Component,
}

impl ProjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Component => "component",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "component" => Ok(Self::Component),
            other => Err(format!("unknown kind '{other}'")),
        }
    }
}

/// Metadata about the project (or component) being created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    #[serde(rename = "type")]
    pub kind: ProjectKind,
    pub name: String,
    pub version: String,
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Canonical id of the chosen template.
    #[serde(rename = "projectTemplate")]
    pub template: String,
}

impl ProjectInfo {
    /// Build and validate project metadata. `className` is derived from `name`.
    pub fn new(
        kind: ProjectKind,
        name: impl Into<String>,
        version: impl Into<String>,
        template: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        let version = version.into();
        validate_project_name(&name)?;

        let version = semver::Version::parse(version.trim())
            .map_err(|_| DomainError::InvalidVersion {
                package: name.clone(),
                version: version.clone(),
            })?
            .to_string();

        Ok(Self {
            kind,
            class_name: class_name(&name),
            name,
            version,
            description: None,
            template: template.into(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The rendering context: this record as a JSON object.
    pub fn to_context(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Check a project name.
///
/// Names start with a letter, contain only ASCII letters, digits, `-` and `_`,
/// and every `-` or `_` is followed by a letter.
pub fn validate_project_name(name: &str) -> Result<(), DomainError> {
    let invalid = || DomainError::InvalidProjectName {
        name: name.to_string(),
    };

    let mut chars = name.chars().peekable();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(invalid()),
    }

    while let Some(c) = chars.next() {
        match c {
            '-' | '_' => match chars.peek() {
                Some(next) if next.is_ascii_alphabetic() => {}
                _ => return Err(invalid()),
            },
            c if c.is_ascii_alphanumeric() => {}
            _ => return Err(invalid()),
        }
    }

    Ok(())
}

/// Kebab-case slug of a project name, without a leading dash.
///
/// Every uppercase letter becomes `-` followed by its lowercase form; other
/// characters are kept as-is. `MyApp` becomes `my-app`.
pub fn class_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_uppercase() {
            out.push('-');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out.strip_prefix('-').map(str::to_string).unwrap_or(out)
}
