//! Snapshot locator parsing.
//!
//! Accepted forms:
//!
//! | Locator                          | Fetched as                                   |
//! |----------------------------------|----------------------------------------------|
//! | `owner/repo[#ref]`               | GitHub archive                               |
//! | `github:owner/repo[#ref]`        | GitHub archive                               |
//! | `gitlab:owner/repo[#ref]`        | GitLab archive                               |
//! | `bitbucket:owner/repo[#ref]`     | Bitbucket archive                            |
//! | `direct:<url>.git[#ref]`         | shallow `git clone`                          |
//! | `direct:<url>`                   | `.tar.gz` archive at `url` (`file://` works) |
//!
//! The ref defaults to [`DEFAULT_REF`].

/// Branch fetched when the locator names none.
pub const DEFAULT_REF: &str = "master";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A gzipped tarball wrapping the tree in one top-level directory.
    Archive { url: String },
    /// A repository to clone.
    Clone {
        url: String,
        reference: Option<String>,
    },
}

impl Locator {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if let Some(direct) = raw.strip_prefix("direct:") {
            return Ok(parse_direct(direct));
        }

        let (host, rest) = match raw.split_once(':') {
            Some((host, rest)) => (host, rest),
            None => ("github", raw),
        };
        let (path, reference) = split_ref(rest);
        let reference = reference.unwrap_or(DEFAULT_REF);

        let Some((owner, repo)) = path.split_once('/') else {
            return Err(format!("expected <owner>/<repo>, got '{raw}'"));
        };
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(format!("expected <owner>/<repo>, got '{raw}'"));
        }

        let url = match host {
            "github" => format!("https://codeload.github.com/{owner}/{repo}/tar.gz/{reference}"),
            "gitlab" => format!(
                "https://gitlab.com/{owner}/{repo}/-/archive/{reference}/{repo}-{reference}.tar.gz"
            ),
            "bitbucket" => format!("https://bitbucket.org/{owner}/{repo}/get/{reference}.tar.gz"),
            other => return Err(format!("unknown source host '{other}'")),
        };
        Ok(Self::Archive { url })
    }
}

fn parse_direct(direct: &str) -> Locator {
    let (url, reference) = split_ref(direct);
    if url.ends_with(".git") {
        Locator::Clone {
            url: url.to_string(),
            reference: reference.map(String::from),
        }
    } else {
        Locator::Archive {
            url: direct.to_string(),
        }
    }
}

fn split_ref(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('#') {
        Some((path, reference)) if !reference.is_empty() => (path, Some(reference)),
        Some((path, _)) => (path, None),
        None => (raw, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(url: &str) -> Locator {
        Locator::Archive { url: url.into() }
    }

    #[test]
    fn shorthand_defaults_to_github_master() {
        assert_eq!(
            Locator::parse("acme/starter").unwrap(),
            archive("https://codeload.github.com/acme/starter/tar.gz/master")
        );
    }

    #[test]
    fn hosts_and_refs() {
        assert_eq!(
            Locator::parse("github:acme/starter#v2").unwrap(),
            archive("https://codeload.github.com/acme/starter/tar.gz/v2")
        );
        assert_eq!(
            Locator::parse("gitlab:acme/starter#main").unwrap(),
            archive("https://gitlab.com/acme/starter/-/archive/main/starter-main.tar.gz")
        );
        assert_eq!(
            Locator::parse("bitbucket:acme/starter").unwrap(),
            archive("https://bitbucket.org/acme/starter/get/master.tar.gz")
        );
    }

    #[test]
    fn direct_git_urls_are_cloned() {
        assert_eq!(
            Locator::parse("direct:https://git.example.com/team/app.git#develop").unwrap(),
            Locator::Clone {
                url: "https://git.example.com/team/app.git".into(),
                reference: Some("develop".into()),
            }
        );
        assert_eq!(
            Locator::parse("direct:https://git.example.com/team/app.git").unwrap(),
            Locator::Clone {
                url: "https://git.example.com/team/app.git".into(),
                reference: None,
            }
        );
    }

    #[test]
    fn direct_archive_urls_are_kept_verbatim() {
        assert_eq!(
            Locator::parse("direct:https://example.com/t.tar.gz").unwrap(),
            archive("https://example.com/t.tar.gz")
        );
    }

    #[test]
    fn rejects_malformed_locators() {
        assert!(Locator::parse("starter").is_err());
        assert!(Locator::parse("acme/").is_err());
        assert!(Locator::parse("a/b/c").is_err());
        assert!(Locator::parse("sourcehut:acme/starter").is_err());
    }
}
