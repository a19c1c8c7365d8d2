//! Gzipped tarball extraction.
//!
//! Registry tarballs wrap everything in a `package/` directory and source
//! snapshots in `<repo>-<ref>/`; both are unpacked with the first path
//! component stripped so the destination holds the package root directly.

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::trace;

/// Unpack a `.tar.gz` stream into `destination`, dropping the first
/// `strip` path components of every entry. Returns the number of files written.
///
/// Entries that would escape `destination` are rejected: paths with `..` or
/// a root, symlinks pointing outside the tree, and entries that would be
/// written through a previously unpacked symlink.
pub fn unpack_tar_gz(reader: impl Read, destination: &Path, strip: usize) -> io::Result<usize> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    archive.set_preserve_permissions(true);

    let mut files = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        if !matches!(
            kind,
            EntryType::Regular | EntryType::Directory | EntryType::Symlink | EntryType::Continuous
        ) {
            // pax headers, hard links, device nodes
            continue;
        }

        let path = entry.path()?.into_owned();
        let Some(rel) = stripped(&path, strip)? else {
            continue;
        };
        ensure_no_symlink_on_path(destination, &rel)?;
        let target = destination.join(&rel);
        trace!(path = %rel.display(), "unpack");

        if kind == EntryType::Symlink {
            let link = entry.link_name()?.map(|l| l.into_owned()).unwrap_or_default();
            if !link_stays_inside(&rel, &link) {
                return Err(escape_error(&path));
            }
        }

        if kind == EntryType::Directory {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
        files += 1;
    }
    Ok(files)
}

fn stripped(path: &Path, strip: usize) -> io::Result<Option<PathBuf>> {
    let mut rel = PathBuf::new();
    for component in path.components().skip(strip) {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            _ => {
                return Err(escape_error(path));
            }
        }
    }
    Ok((!rel.as_os_str().is_empty()).then_some(rel))
}

/// Whether a symlink at `rel` with target `link` resolves inside the tree.
fn link_stays_inside(rel: &Path, link: &Path) -> bool {
    if link.as_os_str().is_empty() || link.has_root() {
        return false;
    }
    let mut depth = rel.components().count().saturating_sub(1);
    for component in link.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir if depth > 0 => depth -= 1,
            _ => return false,
        }
    }
    true
}

/// Refuse to write at or beneath a symlink that is already in the tree.
fn ensure_no_symlink_on_path(destination: &Path, rel: &Path) -> io::Result<()> {
    let mut current = destination.to_path_buf();
    for component in rel.components() {
        current.push(component);
        if current.is_symlink() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("archive entry goes through a symlink: {}", rel.display()),
            ));
        }
    }
    Ok(())
}

fn escape_error(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("archive entry escapes the destination: {}", path.display()),
    )
}
