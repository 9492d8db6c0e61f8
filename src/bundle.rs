//! Packaging step: ship the images folder next to a build
//!
//! A build output directory always gets an empty `Images` folder so the
//! packaged app finds its runtime root. When copying is enabled the source
//! images tree is mirrored into it.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Name of the folder the viewer scans at runtime
pub const IMAGES_DIRECTORY_NAME: &str = "Images";

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to walk {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// What the packaging step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReport {
    pub target: PathBuf,
    pub copied_files: usize,
}

/// Prepare `<build_dir>/Images`, copying `source` into it if `copy_images` is set
pub fn bundle_images(
    source: &Path,
    build_dir: &Path,
    copy_images: bool,
) -> Result<BundleReport, BundleError> {
    let target = build_dir.join(IMAGES_DIRECTORY_NAME);
    create_dir(&target)?;

    let copied_files = if copy_images {
        copy_recursively(source, &target)?
    } else {
        debug!("image copy disabled, leaving {} empty", target.display());
        0
    };

    info!(target = %target.display(), copied_files, "📦 bundle prepared");
    Ok(BundleReport {
        target,
        copied_files,
    })
}

/// Mirror every directory and file under `source` into `target`.
///
/// Existing files are overwritten. A missing source copies nothing.
pub fn copy_recursively(source: &Path, target: &Path) -> Result<usize, BundleError> {
    if !source.is_dir() {
        debug!("nothing to copy, {} does not exist", source.display());
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|source_err| BundleError::Walk {
            root: source.to_path_buf(),
            source: source_err,
        })?;

        // strip_prefix can't fail for entries yielded under `source`
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            create_dir(&destination)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &destination).map_err(|e| BundleError::Copy {
                from: entry.path().to_path_buf(),
                to: destination.clone(),
                source: e,
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn create_dir(path: &Path) -> Result<(), BundleError> {
    fs::create_dir_all(path).map_err(|source| BundleError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("trips/2023")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("cover.png"), b"png").unwrap();
        fs::write(dir.path().join("trips/2023/alps.jpg"), b"jpg").unwrap();
        dir
    }

    #[test]
    fn test_copy_enabled_mirrors_tree() {
        let source = source_tree();
        let build = tempfile::tempdir().unwrap();

        let report = bundle_images(source.path(), build.path(), true).unwrap();

        assert_eq!(report.copied_files, 2);
        assert_eq!(report.target, build.path().join("Images"));
        assert_eq!(fs::read(report.target.join("cover.png")).unwrap(), b"png");
        assert_eq!(fs::read(report.target.join("trips/2023/alps.jpg")).unwrap(), b"jpg");
        assert!(report.target.join("empty").is_dir());
    }

    #[test]
    fn test_copy_disabled_creates_empty_folder() {
        let source = source_tree();
        let build = tempfile::tempdir().unwrap();

        let report = bundle_images(source.path(), build.path(), false).unwrap();

        assert_eq!(report.copied_files, 0);
        assert!(report.target.is_dir());
        assert_eq!(fs::read_dir(&report.target).unwrap().count(), 0);
    }

    #[test]
    fn test_copy_overwrites_existing_files() {
        let source = source_tree();
        let build = tempfile::tempdir().unwrap();
        let target = build.path().join("Images");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("cover.png"), b"old").unwrap();

        bundle_images(source.path(), build.path(), true).unwrap();

        assert_eq!(fs::read(target.join("cover.png")).unwrap(), b"png");
    }

    #[test]
    fn test_missing_source_copies_nothing() {
        let build = tempfile::tempdir().unwrap();

        let copied = copy_recursively(&build.path().join("missing"), &build.path().join("out")).unwrap();

        assert_eq!(copied, 0);
    }
}
