use chrono::{DateTime, Local};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::data::FileDescriptor;

/// Extensions (lowercase, without the dot) recognised as images
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Check if a path looks like an image by its extension
pub fn is_image(path: &Path) -> bool {
    match path.extension() {
        Some(extension) => {
            let ext = extension.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// The ImageCatalog lists every image file under a root directory.
/// It never reads image bytes, only paths and file metadata.
pub struct ImageCatalog {
    root: PathBuf,
    files: Vec<FileDescriptor>,
}

impl ImageCatalog {
    /// Create a catalog for `root` and scan it immediately
    pub fn scan(root: impl Into<PathBuf>) -> Self {
        let mut catalog = ImageCatalog {
            root: root.into(),
            files: Vec::new(),
        };
        catalog.rebuild();
        catalog
    }

    /// Re-enumerate the root directory.
    ///
    /// Every index handed out before this call is invalid afterwards.
    /// A missing root is not an error: the catalog is simply empty.
    pub fn rebuild(&mut self) -> &[FileDescriptor] {
        self.files.clear();

        if !self.root.is_dir() {
            debug!(root = %self.root.display(), "images root does not exist, catalog is empty");
            return &self.files;
        }

        // Sorting by name inside each directory keeps indices stable between runs
        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_image(entry.path()) {
                continue;
            }

            let created_at = match entry.metadata() {
                Ok(metadata) => creation_time(&metadata),
                Err(e) => {
                    warn!(path = %entry.path().display(), "no metadata: {}", e);
                    Local::now()
                }
            };

            self.files.push(FileDescriptor {
                index: self.files.len(),
                path: entry.into_path(),
                created_at,
            });
        }

        info!(root = %self.root.display(), count = self.files.len(), "📁 catalog rebuilt");
        &self.files
    }

    /// Point the catalog at another directory and rescan
    pub fn set_root(&mut self, root: impl Into<PathBuf>) -> &[FileDescriptor] {
        self.root = root.into();
        self.rebuild()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of image files found
    pub fn count(&self) -> usize {
        self.files.len()
    }

    pub fn get(&self, index: usize) -> Option<&FileDescriptor> {
        self.files.get(index)
    }

    #[cfg(test)]
    pub fn descriptors(&self) -> &[FileDescriptor] {
        &self.files
    }
}

/// Creation time where the platform reports one, modification time otherwise
fn creation_time(metadata: &Metadata) -> DateTime<Local> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| Local::now())
}

impl std::fmt::Debug for ImageCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCatalog")
            .field("root", &self.root)
            .field("count", &self.files.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("a.jpg")));
        assert!(is_image(Path::new("dir/b.JPEG")));
        assert!(is_image(Path::new("c.Png")));
        assert!(!is_image(Path::new("d.gif")));
        assert!(!is_image(Path::new("README")));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = ImageCatalog::scan(dir.path().join("nope"));
        assert_eq!(catalog.count(), 0);
        assert!(catalog.get(0).is_none());
    }

    #[test]
    fn test_scan_filters_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("b.png"), b"").unwrap();
        fs::write(dir.path().join("a.jpg"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::write(dir.path().join("nested/c.jpeg"), b"").unwrap();
        fs::write(dir.path().join("nested/deeper/d.PNG"), b"").unwrap();

        let catalog = ImageCatalog::scan(dir.path());
        let names: Vec<String> = catalog
            .descriptors()
            .iter()
            .map(|file| file.display_name())
            .collect();

        assert_eq!(names, vec!["a", "b", "c", "d"]);
        for (i, file) in catalog.descriptors().iter().enumerate() {
            assert_eq!(file.index, i);
        }
    }

    #[test]
    fn test_rebuild_is_stable_and_sees_new_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["x.png", "y.png"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let mut catalog = ImageCatalog::scan(dir.path());
        let first: Vec<PathBuf> = catalog.descriptors().iter().map(|f| f.path.clone()).collect();
        let second: Vec<PathBuf> = catalog.rebuild().iter().map(|f| f.path.clone()).collect();
        assert_eq!(first, second);

        fs::write(dir.path().join("w.jpg"), b"").unwrap();
        assert_eq!(catalog.rebuild().len(), 3);
        assert_eq!(catalog.get(0).unwrap().display_name(), "w");
    }

    #[test]
    fn test_set_root() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::write(a.path().join("one.png"), b"").unwrap();
        fs::write(b.path().join("two.png"), b"").unwrap();
        fs::write(b.path().join("three.png"), b"").unwrap();

        let mut catalog = ImageCatalog::scan(a.path());
        assert_eq!(catalog.count(), 1);
        catalog.set_root(b.path());
        assert_eq!(catalog.count(), 2);
        assert_eq!(catalog.root(), b.path());
    }
}
