//! Snapshot downloads from source-control hosts.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info, instrument};

use hatch_core::application::ApplicationError;
use hatch_core::application::ports::SnapshotDownloader;
use hatch_core::domain::Deadline;
use hatch_core::error::{HatchError, HatchResult};

use super::locator::Locator;
use crate::http::{HttpClient, HttpError};
use crate::{archive, process};

/// Fetches a repository snapshot as a flat file tree (no history).
#[derive(Debug, Clone)]
pub struct GitSnapshotDownloader {
    http: HttpClient,
    git: String,
}

impl GitSnapshotDownloader {
    pub fn new() -> HatchResult<Self> {
        let http = HttpClient::new().map_err(|e| HatchError::Configuration {
            message: format!("cannot build HTTP client: {e}"),
        })?;
        Ok(Self {
            http,
            git: "git".into(),
        })
    }

    /// Use a different `git` executable for clone locators.
    pub fn with_git(mut self, program: impl Into<String>) -> Self {
        self.git = program.into();
        self
    }

    fn fetch_archive(
        &self,
        locator: &str,
        url: &str,
        destination: &Path,
        deadline: &Deadline,
    ) -> HatchResult<()> {
        let bytes = match url.strip_prefix("file://") {
            Some(path) => fs::read(path).map_err(|e| download_error(locator, e))?,
            None => self.http.get_bytes(url, deadline).map_err(|e| match e {
                HttpError::Expired => ApplicationError::DeadlineExceeded {
                    step: "downloading a snapshot",
                }
                .into(),
                other => download_error(locator, other),
            })?,
        };

        let files = archive::unpack_tar_gz(bytes.as_slice(), destination, 1)
            .map_err(|e| download_error(locator, format!("bad archive: {e}")))?;
        debug!(files, "snapshot unpacked");
        Ok(())
    }

    fn clone_repo(
        &self,
        url: &str,
        reference: Option<&str>,
        destination: &Path,
        deadline: &Deadline,
    ) -> HatchResult<()> {
        let mut command = Command::new(&self.git);
        command.args(["clone", "--depth", "1", "--quiet"]);
        if let Some(reference) = reference {
            command.args(["--branch", reference]);
        }
        command
            .arg(url)
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null());

        let status = process::run(&mut command, deadline, "cloning a snapshot")?;
        process::check(&self.git, status)?;

        let history = destination.join(".git");
        fs::remove_dir_all(&history).map_err(|e| ApplicationError::filesystem(&history, e))?;
        Ok(())
    }
}

impl SnapshotDownloader for GitSnapshotDownloader {
    #[instrument(skip(self, deadline), fields(destination = %destination.display()))]
    fn download(&self, locator: &str, destination: &Path, deadline: &Deadline) -> HatchResult<()> {
        let parsed = Locator::parse(locator).map_err(|reason| download_error(locator, reason))?;
        info!(locator, "fetching snapshot");

        match parsed {
            Locator::Archive { url } => self.fetch_archive(locator, &url, destination, deadline),
            Locator::Clone { url, reference } => {
                self.clone_repo(&url, reference.as_deref(), destination, deadline)
            }
        }
    }
}

fn download_error(locator: &str, reason: impl ToString) -> HatchError {
    ApplicationError::Download {
        locator: locator.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn write_tarball(path: &Path, entries: &[(&str, &str)]) {
        let file = fs::File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn unpacks_a_local_archive_flat() {
        let work = TempDir::new().unwrap();
        let tarball = work.path().join("starter.tar.gz");
        write_tarball(
            &tarball,
            &[
                ("starter-master/package.json", "{}"),
                ("starter-master/template/index.html", "<%= name %>"),
            ],
        );
        let destination = work.path().join("out");
        fs::create_dir(&destination).unwrap();

        GitSnapshotDownloader::new()
            .unwrap()
            .download(
                &format!("direct:file://{}", tarball.display()),
                &destination,
                &Deadline::none(),
            )
            .unwrap();

        assert!(destination.join("package.json").is_file());
        assert_eq!(
            fs::read_to_string(destination.join("template/index.html")).unwrap(),
            "<%= name %>"
        );
    }

    #[test]
    fn malformed_locator_is_a_download_error() {
        let dir = TempDir::new().unwrap();
        let err = GitSnapshotDownloader::new()
            .unwrap()
            .download("not-a-repo", dir.path(), &Deadline::none())
            .unwrap_err();
        assert!(matches!(
            err,
            HatchError::Application(ApplicationError::Download { .. })
        ));
    }

    #[test]
    fn missing_local_archive_is_a_download_error() {
        let dir = TempDir::new().unwrap();
        let err = GitSnapshotDownloader::new()
            .unwrap()
            .download(
                &format!("direct:file://{}", dir.path().join("nope.tar.gz").display()),
                dir.path(),
                &Deadline::none(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("nope.tar.gz"));
    }
}
