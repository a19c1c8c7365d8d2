//! Registry package documents and version selection.
//!
//! Only the fields the installer reads are modelled; everything else in the
//! registry's response is ignored.

use std::collections::{BTreeMap, HashMap};

use semver::{Version, VersionReq};
use serde::Deserialize;

/// Package document: `GET <registry>/<name>`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageMetadata {
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
    #[serde(default)]
    pub versions: HashMap<String, VersionMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionMetadata {
    pub dist: Dist,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dist {
    pub tarball: String,
}

impl PackageMetadata {
    /// The `latest` dist-tag, or the highest stable version when the tag is missing.
    pub fn latest(&self) -> Option<String> {
        if let Some(tagged) = self.dist_tags.get("latest") {
            return Some(tagged.clone());
        }
        self.parsed_versions()
            .filter(|v| v.pre.is_empty())
            .max()
            .map(|v| v.to_string())
    }

    /// Pick the version a dependency range resolves to.
    ///
    /// Accepts exact versions, dist-tags, and the npm range forms `semver`
    /// can express once rewritten (`^`, `~`, `x` wildcards, space-separated
    /// comparators, hyphen ranges, `||` alternatives). The highest match wins.
    pub fn select(&self, range: &str) -> Option<String> {
        let range = range.trim();
        if let Some(tagged) = self.dist_tags.get(range) {
            return Some(tagged.clone());
        }
        if self.versions.contains_key(range) {
            return Some(range.to_string());
        }

        let requirements: Vec<VersionReq> = range
            .split("||")
            .filter_map(|alt| VersionReq::parse(&normalize_range(alt)).ok())
            .collect();
        if requirements.is_empty() {
            return None;
        }

        self.parsed_versions()
            .filter(|v| requirements.iter().any(|req| req.matches(v)))
            .max()
            .map(|v| v.to_string())
    }

    fn parsed_versions(&self) -> impl Iterator<Item = Version> + '_ {
        self.versions.keys().filter_map(|v| Version::parse(v).ok())
    }
}

/// Rewrite one npm range alternative into `semver::VersionReq` syntax.
fn normalize_range(range: &str) -> String {
    let tokens: Vec<&str> = range.split_whitespace().collect();
    match tokens.as_slice() {
        [] => "*".to_string(),
        [low, "-", high] => format!(">={low}, <={high}"),
        _ => {
            let mut comparators: Vec<String> = Vec::new();
            let mut pending_op: Option<&str> = None;
            for token in tokens {
                if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
                    pending_op = Some(token);
                    continue;
                }
                let token = token.strip_prefix('v').unwrap_or(token);
                let op = match pending_op.take() {
                    Some(op) => op,
                    None if has_operator(token) || is_wildcard(token) => "",
                    // npm reads a bare version as exact or partial, never as a caret range.
                    None => "=",
                };
                comparators.push(format!("{op}{token}"));
            }
            comparators.join(", ")
        }
    }
}

fn has_operator(token: &str) -> bool {
    token.starts_with(['<', '>', '=', '~', '^'])
}

fn is_wildcard(token: &str) -> bool {
    matches!(token, "*" | "x" | "X")
}
