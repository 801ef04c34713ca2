//! Discovery of eligible image files and the ordered list the slideshow walks.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::error::Error;

/// Extensions recognised when no explicit list is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Inputs the catalog is (re)built from.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Files or directories named on the command line.
    pub roots: Vec<PathBuf>,
    /// Descend into subdirectories instead of listing immediate children.
    pub recursive: bool,
    /// Case-insensitive search over the absolute path string; `None` accepts
    /// every path.
    pub filter: Option<Regex>,
    /// Allowed extensions, lowercase, without the dot.
    pub extensions: Vec<String>,
}

impl ScanOptions {
    /// Options matching every supported image under `roots`.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            recursive: false,
            filter: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
        }
    }

    /// Compile `pattern` as a case-insensitive search filter.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPattern`] if the pattern does not compile.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, Error> {
        self.filter = Some(RegexBuilder::new(pattern).case_insensitive(true).build()?);
        Ok(self)
    }

    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        is_supported_image(path, &self.extensions)
            && self
                .filter
                .as_ref()
                .is_none_or(|re| re.is_match(&path.to_string_lossy()))
    }
}

/// Return `true` if `path` has one of `exts` as its (case-insensitive) extension.
#[must_use]
pub fn is_supported_image(path: &Path, exts: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| *e == ext)
        })
}

/// Absolute, resolved path of an eligible image file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImagePath(PathBuf);

impl ImagePath {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(path)
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Directory holding the image; directory boundaries are drawn on this.
    #[must_use]
    pub fn parent(&self) -> &Path {
        self.0.parent().unwrap_or_else(|| Path::new("/"))
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl AsRef<Path> for ImagePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ImagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Direction of travel through the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Step `index` one slot in this direction, wrapping within `len`.
    #[must_use]
    pub const fn step(self, index: usize, len: usize) -> usize {
        match self {
            Self::Forward => (index + 1) % len,
            Self::Backward => (index + len - 1) % len,
        }
    }
}

/// Result of a catalog build.
#[derive(Debug, Clone)]
pub struct CatalogBuild {
    pub catalog: Catalog,
    /// Position of the first file named among the roots, or 0.
    pub anchor: usize,
    /// Entries or directories that could not be read.
    pub skipped: usize,
}

/// Sorted, duplicate-free list of eligible images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<ImagePath>,
}

impl Catalog {
    /// Enumerate `opts.roots` into a sorted catalog.
    ///
    /// A root naming a file seeds the anchor (first one wins) and its parent
    /// directory is enumerated in its place. Unreadable entries are counted in
    /// [`CatalogBuild::skipped`]; an empty result is not an error.
    #[instrument(skip(opts), fields(roots = opts.roots.len(), recursive = opts.recursive))]
    pub fn build(opts: &ScanOptions) -> CatalogBuild {
        let mut anchor_candidate: Option<PathBuf> = None;
        let mut dirs: Vec<PathBuf> = Vec::new();
        let mut skipped = 0usize;

        for root in &opts.roots {
            let meta = match fs::metadata(root) {
                Ok(meta) => meta,
                Err(source) => {
                    let err = Error::Enumeration {
                        path: root.clone(),
                        source,
                    };
                    warn!(error = %err, "skipping root");
                    skipped += 1;
                    continue;
                }
            };
            if meta.is_file() {
                if anchor_candidate.is_none() {
                    anchor_candidate = Some(root.clone());
                }
                let parent = root
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                dirs.push(parent.to_path_buf());
            } else if meta.is_dir() {
                dirs.push(root.clone());
            }
        }

        let mut found: BTreeSet<ImagePath> = BTreeSet::new();
        for dir in &dirs {
            let walker = WalkDir::new(dir)
                .min_depth(1)
                .max_depth(if opts.recursive { usize::MAX } else { 1 })
                .follow_links(true);
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                        let err = Error::Enumeration {
                            path,
                            source: err.into(),
                        };
                        debug!(error = %err, "skipping unreadable entry");
                        skipped += 1;
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let resolved = match fs::canonicalize(entry.path()) {
                    Ok(p) => p,
                    Err(err) => {
                        debug!(path = %entry.path().display(), error = %err, "cannot resolve; skipping");
                        skipped += 1;
                        continue;
                    }
                };
                if opts.accepts(&resolved) {
                    found.insert(ImagePath::new(resolved));
                }
            }
        }

        let catalog = Catalog {
            entries: found.into_iter().collect(),
        };
        let anchor = anchor_candidate
            .and_then(|file| catalog.position_of_file(&file))
            .unwrap_or(0);
        info!(count = catalog.len(), anchor, skipped, "catalog built");
        CatalogBuild {
            catalog,
            anchor,
            skipped,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ImagePath> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ImagePath] {
        &self.entries
    }

    /// Remove the entry at `index`, shifting later entries left.
    pub fn remove_at(&mut self, index: usize) -> Option<ImagePath> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Exact position of `path` in the catalog.
    #[must_use]
    pub fn position_of(&self, path: &ImagePath) -> Option<usize> {
        self.entries.binary_search(path).ok()
    }

    /// Position of `path` if present, else where it would be inserted.
    pub(crate) fn search(&self, path: &ImagePath) -> Result<usize, usize> {
        self.entries.binary_search(path)
    }

    /// Position of the entry naming the same file as `file`.
    ///
    /// Compares file identity, so symlinks and differently spelled paths
    /// resolve to the same entry.
    #[must_use]
    pub fn position_of_file(&self, file: &Path) -> Option<usize> {
        let resolved = fs::canonicalize(file).ok()?;
        if let Some(pos) = self.position_of(&ImagePath::new(resolved.clone())) {
            return Some(pos);
        }
        self.entries
            .iter()
            .position(|entry| same_file(entry.as_path(), &resolved))
    }

    /// First entry, stepping from `index` in `dir`, whose parent differs
    /// from the entry at `index`. `None` when every entry shares the
    /// directory. Visits at most `len` slots.
    #[must_use]
    pub fn run_boundary(&self, index: usize, dir: Direction) -> Option<usize> {
        let n = self.len();
        let origin = self.entries.get(index)?.parent();
        let mut i = index;
        for _ in 0..n {
            i = dir.step(i, n);
            if self.entries[i].parent() != origin {
                return Some(i);
            }
        }
        None
    }

    /// First entry (in catalog order) of the run of same-directory entries
    /// containing `index`, without wrapping past `limit`.
    #[must_use]
    pub fn run_start(&self, index: usize, limit: usize) -> usize {
        let n = self.len();
        let Some(entry) = self.entries.get(index) else {
            return index;
        };
        let parent = entry.parent();
        let mut start = index;
        for _ in 0..n {
            let before = Direction::Backward.step(start, n);
            if before == limit || self.entries[before].parent() != parent {
                break;
            }
            start = before;
        }
        start
    }
}

#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(ma), Ok(mb)) => ma.dev() == mb.dev() && ma.ino() == mb.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(paths: &[&str]) -> Catalog {
        let mut entries: Vec<ImagePath> = paths
            .iter()
            .map(|p| ImagePath::new(PathBuf::from(p)))
            .collect();
        entries.sort();
        Catalog { entries }
    }

    #[test]
    fn extension_check_ignores_case() {
        let exts: Vec<String> = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        assert!(is_supported_image(Path::new("/x/a.JPG"), &exts));
        assert!(is_supported_image(Path::new("/x/a.WebP"), &exts));
        assert!(!is_supported_image(Path::new("/x/a.txt"), &exts));
        assert!(!is_supported_image(Path::new("/x/jpg"), &exts));
    }

    #[test]
    fn remove_at_shifts_left() {
        let mut c = catalog(&["/a/1.png", "/a/2.png", "/b/1.png"]);
        let removed = c.remove_at(1).unwrap();
        assert_eq!(removed.as_path(), Path::new("/a/2.png"));
        assert_eq!(c.get(1).unwrap().as_path(), Path::new("/b/1.png"));
        assert!(c.remove_at(5).is_none());
    }

    #[test]
    fn run_boundary_finds_next_directory() {
        let c = catalog(&["/a/1.png", "/a/2.png", "/b/1.png"]);
        assert_eq!(c.run_boundary(0, Direction::Forward), Some(2));
        assert_eq!(c.run_boundary(2, Direction::Backward), Some(1));
        assert_eq!(c.run_start(1, 2), 0);
    }

    #[test]
    fn run_boundary_is_none_for_single_directory() {
        let c = catalog(&["/a/1.png", "/a/2.png", "/a/3.png"]);
        assert_eq!(c.run_boundary(1, Direction::Forward), None);
        assert_eq!(c.run_boundary(1, Direction::Backward), None);
    }

    #[test]
    fn search_reports_insertion_point() {
        let c = catalog(&["/a/1.png", "/c/1.png"]);
        assert_eq!(c.search(&ImagePath::new("/b/1.png".into())), Err(1));
        assert_eq!(c.search(&ImagePath::new("/c/1.png".into())), Ok(1));
    }
}
