//! HTTP client for npm-compatible registries.
//!
//! Installs follow the store layout the core's cache addresses: every
//! package version gets its own directory under the store
//! (`_<escaped>@<version>@<name>`), and each package's dependencies are
//! linked into its `node_modules/` from their own store directories.
//!
//! Every package of a request is unpacked and linked in a temporary
//! directory inside the store. Only when the whole closure has been fetched
//! are the directories renamed into place, so a failed request leaves no
//! store entry behind.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use hatch_core::application::ports::{InstallRequest, PackageRegistry};
use hatch_core::application::{ApplicationError, STORE_DIR};
use hatch_core::domain::{Deadline, PackageRef, cache_path};
use hatch_core::error::{HatchError, HatchResult};

use super::metadata::PackageMetadata;
use crate::archive;
use crate::http::{HttpClient, HttpError};

/// Registry client for npm-compatible HTTP registries.
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    http: HttpClient,
    registry_url: String,
}

impl NpmRegistry {
    /// Client for the registry at `registry_url`, used for version lookups.
    ///
    /// Installs use the registry named in each [`InstallRequest`].
    pub fn new(registry_url: impl Into<String>) -> HatchResult<Self> {
        let http = HttpClient::new().map_err(|e| HatchError::Configuration {
            message: format!("cannot build HTTP client: {e}"),
        })?;
        Ok(Self {
            http,
            registry_url: registry_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn metadata(
        &self,
        registry_url: &str,
        name: &str,
        deadline: &Deadline,
    ) -> HatchResult<PackageMetadata> {
        let url = format!(
            "{}/{}",
            registry_url.trim_end_matches('/'),
            encode_package_name(name)
        );
        self.http
            .get_json(&url, deadline)
            .map_err(|e| registry_error(name, e))
    }
}

impl PackageRegistry for NpmRegistry {
    #[instrument(skip(self, deadline))]
    fn resolve_latest(&self, name: &str, deadline: &Deadline) -> HatchResult<String> {
        self.metadata(&self.registry_url, name, deadline)?
            .latest()
            .ok_or_else(|| {
                ApplicationError::Registry {
                    package: name.to_string(),
                    reason: "no published versions".into(),
                }
                .into()
            })
    }

    #[instrument(skip_all, fields(store = %request.store_dir.display()))]
    fn install(&self, request: &InstallRequest, deadline: &Deadline) -> HatchResult<()> {
        fs::create_dir_all(&request.store_dir)
            .map_err(|e| ApplicationError::filesystem(&request.store_dir, e))?;

        let mut session = InstallSession {
            registry: self,
            request,
            deadline,
            documents: HashMap::new(),
            visited: HashSet::new(),
            staged: Vec::new(),
        };
        for package in &request.packages {
            session.install(package)?;
        }
        let installed = session.commit()?;
        info!(
            requested = request.packages.len(),
            installed,
            "registry install complete"
        );
        Ok(())
    }
}

/// A package unpacked and linked, waiting to be moved into the store.
struct StagedPackage {
    package: PackageRef,
    dir: TempDir,
    entry: PathBuf,
}

/// State for one install request: fetched documents and packages already handled.
struct InstallSession<'a> {
    registry: &'a NpmRegistry,
    request: &'a InstallRequest,
    deadline: &'a Deadline,
    documents: HashMap<String, PackageMetadata>,
    visited: HashSet<PackageRef>,
    /// Dependencies come before their dependents.
    staged: Vec<StagedPackage>,
}

impl InstallSession<'_> {
    /// Stage `package` and its dependency closure; returns its final store directory.
    ///
    /// Entries already in the store are complete and are not revisited.
    fn install(&mut self, package: &PackageRef) -> HatchResult<PathBuf> {
        let entry = cache_path(&self.request.store_dir, &package.name, &package.version);
        if entry.is_dir() {
            debug!(package = %package, "already in store");
            return Ok(entry);
        }
        if !self.visited.insert(package.clone()) {
            return Ok(entry);
        }

        let version = self
            .document(&package.name)?
            .versions
            .get(&package.version)
            .cloned()
            .ok_or_else(|| ApplicationError::Registry {
                package: package.name.clone(),
                reason: format!("version {} is not published", package.version),
            })?;

        let dir = self.unpack(package, &version.dist.tarball)?;
        for (dep_name, range) in &version.dependencies {
            let Some(resolved) = self.document(dep_name)?.select(range) else {
                return Err(ApplicationError::Registry {
                    package: dep_name.clone(),
                    reason: format!("no version satisfies '{range}' (required by {package})"),
                }
                .into());
            };
            let dep_entry = self.install(&PackageRef::new(dep_name.as_str(), resolved))?;
            link_dependency(dir.path(), dep_name, &dep_entry)?;
        }

        self.staged.push(StagedPackage {
            package: package.clone(),
            dir,
            entry: entry.clone(),
        });
        Ok(entry)
    }

    fn document(&mut self, name: &str) -> HatchResult<&PackageMetadata> {
        if !self.documents.contains_key(name) {
            let document =
                self.registry
                    .metadata(&self.request.registry_url, name, self.deadline)?;
            self.documents.insert(name.to_string(), document);
        }
        self.documents.get(name).ok_or_else(|| {
            HatchError::Internal {
                message: format!("registry document for '{name}' vanished"),
            }
        })
    }

    /// Download a tarball and unpack it into a temporary directory in the store.
    fn unpack(&self, package: &PackageRef, tarball: &str) -> HatchResult<TempDir> {
        info!(package = %package, "downloading");
        let bytes = self
            .registry
            .http
            .get_bytes(tarball, self.deadline)
            .map_err(|e| registry_error(&package.name, e))?;

        let store = &self.request.store_dir;
        let dir = tempfile::Builder::new()
            .prefix(".hatch-unpack-")
            .tempdir_in(store)
            .map_err(|e| ApplicationError::filesystem(store, e))?;

        let files = archive::unpack_tar_gz(bytes.as_slice(), dir.path(), 1).map_err(|e| {
            ApplicationError::Registry {
                package: package.name.clone(),
                reason: format!("bad tarball: {e}"),
            }
        })?;
        debug!(package = %package, files, "unpacked");
        Ok(dir)
    }

    /// Move every staged package into its store entry.
    fn commit(self) -> HatchResult<usize> {
        let count = self.staged.len();
        for staged in self.staged {
            move_into_place(&staged)?;
        }
        Ok(count)
    }
}

fn move_into_place(staged: &StagedPackage) -> HatchResult<()> {
    let entry = &staged.entry;
    if let Some(parent) = entry.parent() {
        fs::create_dir_all(parent).map_err(|e| ApplicationError::filesystem(parent, e))?;
    }
    match fs::rename(staged.dir.path(), entry) {
        Ok(()) => Ok(()),
        // Another process finished the same entry first.
        Err(_) if entry.is_dir() => {
            warn!(package = %staged.package, "store entry appeared during install; keeping it");
            Ok(())
        }
        Err(e) => Err(ApplicationError::filesystem(entry, e).into()),
    }
}

/// Link `<package>/node_modules/<name>` to the dependency's store directory.
fn link_dependency(package_dir: &Path, name: &str, target: &Path) -> HatchResult<()> {
    let link = package_dir.join(STORE_DIR).join(name);
    if link.symlink_metadata().is_ok() {
        return Ok(());
    }
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent).map_err(|e| ApplicationError::filesystem(parent, e))?;
    }
    symlink_dir(target, &link).map_err(|e| ApplicationError::filesystem(&link, e))?;
    Ok(())
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

fn registry_error(package: &str, e: HttpError) -> HatchError {
    match e {
        HttpError::Expired => ApplicationError::DeadlineExceeded {
            step: "querying the registry",
        }
        .into(),
        HttpError::NotFound { .. } => ApplicationError::Registry {
            package: package.to_string(),
            reason: "package not found".into(),
        }
        .into(),
        other => ApplicationError::Registry {
            package: package.to_string(),
            reason: other.to_string(),
        }
        .into(),
    }
}

/// Encode a package name for use in a registry URL.
///
/// Only the scope separator needs escaping: `@scope/pkg` becomes `@scope%2Fpkg`.
pub fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replacen('/', "%2F", 1)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves fixed paths over HTTP/1.1; anything else is a 404.
    fn serve(routes: impl FnOnce(&str) -> Vec<(String, Vec<u8>)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes = routes(&base);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                        break;
                    }
                }
                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = match routes.iter().find(|(p, _)| p == path) {
                    Some((_, body)) => ("200 OK", body.clone()),
                    None => ("404 Not Found", Vec::new()),
                };
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&body);
            }
        });
        base
    }

    fn package_tarball(main: &str) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, content) in [
            ("package/package.json", r#"{"main": "index.js"}"#),
            ("package/index.js", main),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn document(base: &str, name: &str, deps: serde_json::Value) -> Vec<u8> {
        json!({
            "dist-tags": {"latest": "1.0.0"},
            "versions": {
                "1.0.0": {
                    "dependencies": deps,
                    "dist": {"tarball": format!("{base}/{name}-1.0.0.tgz")}
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    fn local_registry(base: &str) -> NpmRegistry {
        NpmRegistry {
            http: HttpClient::direct().unwrap(),
            registry_url: base.to_string(),
        }
    }

    fn request(store: &Path, base: &str) -> InstallRequest {
        InstallRequest {
            root: store.to_path_buf(),
            store_dir: store.to_path_buf(),
            registry_url: base.to_string(),
            packages: vec![PackageRef::new("plugin-x", "1.0.0")],
        }
    }

    fn store_listing(store: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(store)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn encodes_scoped_names() {
        assert_eq!(encode_package_name("lodash"), "lodash");
        assert_eq!(encode_package_name("@hatch-cli/lint"), "@hatch-cli%2Flint");
    }

    #[test]
    fn trims_trailing_slash_from_registry_url() {
        let registry = NpmRegistry::new("https://registry.example.com/").unwrap();
        assert_eq!(registry.registry_url, "https://registry.example.com");
    }

    #[test]
    fn not_found_maps_to_registry_error() {
        let err = registry_error(
            "ghost",
            HttpError::NotFound {
                url: "https://r/ghost".into(),
            },
        );
        assert!(err.to_string().contains("ghost"));
        assert!(err.is_retryable());
    }

    #[test]
    fn expired_deadline_maps_to_deadline_error() {
        let err = registry_error("x", HttpError::Expired);
        assert!(matches!(
            err,
            HatchError::Application(ApplicationError::DeadlineExceeded { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn dependency_links_point_at_store_entries() {
        let store = TempDir::new().unwrap();
        let parent = store.path().join("_app@1.0.0@app");
        let dep = store.path().join("_@scope_dep@2.0.0@@scope/dep");
        fs::create_dir_all(&parent).unwrap();
        fs::create_dir_all(&dep).unwrap();
        fs::write(dep.join("index.js"), "").unwrap();

        link_dependency(&parent, "@scope/dep", &dep).unwrap();
        // Linking twice is a no-op.
        link_dependency(&parent, "@scope/dep", &dep).unwrap();

        assert!(parent.join("node_modules/@scope/dep/index.js").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn installs_a_package_with_its_dependencies() {
        let base = serve(|base| {
            vec![
                ("/plugin-x".into(), document(base, "plugin-x", json!({"dep-a": "^1.0.0"}))),
                ("/plugin-x-1.0.0.tgz".into(), package_tarball("plugin")),
                ("/dep-a".into(), document(base, "dep-a", json!({}))),
                ("/dep-a-1.0.0.tgz".into(), package_tarball("dep")),
            ]
        });
        let store = TempDir::new().unwrap();

        local_registry(&base)
            .install(&request(store.path(), &base), &Deadline::none())
            .unwrap();

        let entry = cache_path(store.path(), "plugin-x", "1.0.0");
        assert!(entry.join("index.js").is_file());
        assert_eq!(
            fs::read_to_string(entry.join("node_modules/dep-a/index.js")).unwrap(),
            "dep"
        );
        assert_eq!(
            store_listing(store.path()),
            vec!["_dep-a@1.0.0@dep-a", "_plugin-x@1.0.0@plugin-x"]
        );
    }

    #[test]
    fn failed_dependency_leaves_no_store_entry() {
        let base = serve(|base| {
            vec![
                ("/plugin-x".into(), document(base, "plugin-x", json!({"missing-dep": "^1.0.0"}))),
                ("/plugin-x-1.0.0.tgz".into(), package_tarball("plugin")),
            ]
        });
        let store = TempDir::new().unwrap();

        let err = local_registry(&base)
            .install(&request(store.path(), &base), &Deadline::none())
            .unwrap_err();

        assert!(err.to_string().contains("missing-dep"));
        assert!(!cache_path(store.path(), "plugin-x", "1.0.0").exists());
        assert!(store_listing(store.path()).is_empty());
    }

    #[test]
    fn unsatisfiable_dependency_range_leaves_no_store_entry() {
        let base = serve(|base| {
            vec![
                ("/plugin-x".into(), document(base, "plugin-x", json!({"dep-a": "^2.0.0"}))),
                ("/plugin-x-1.0.0.tgz".into(), package_tarball("plugin")),
                ("/dep-a".into(), document(base, "dep-a", json!({}))),
                ("/dep-a-1.0.0.tgz".into(), package_tarball("dep")),
            ]
        });
        let store = TempDir::new().unwrap();

        let err = local_registry(&base)
            .install(&request(store.path(), &base), &Deadline::none())
            .unwrap_err();

        assert!(err.to_string().contains("^2.0.0"));
        assert!(store_listing(store.path()).is_empty());
    }
}
