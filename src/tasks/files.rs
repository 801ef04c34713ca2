use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tracing::{debug, error, info, warn};

use crate::catalog::is_supported_image;
use crate::config::DeleteMode;
use crate::services::Trash;

/// Moves files and folders to the desktop trash.
#[derive(Debug, Default)]
pub struct SystemTrash;

impl Trash for SystemTrash {
    fn delete(&mut self, path: &Path) -> io::Result<()> {
        debug!(path = %path.display(), "trash: moving");
        trash::delete(path).map_err(io::Error::other)?;
        info!(path = %path.display(), "trash: moved");
        Ok(())
    }
}

/// Deletes files and folders permanently.
#[derive(Debug, Default)]
pub struct RemoveFiles;

impl Trash for RemoveFiles {
    fn delete(&mut self, path: &Path) -> io::Result<()> {
        let meta = fs::symlink_metadata(path)?;
        debug!(path = %path.display(), dir = meta.is_dir(), "delete: removing");
        if meta.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        info!(path = %path.display(), "delete: removed");
        Ok(())
    }
}

#[must_use]
pub fn trash_for(mode: DeleteMode) -> Box<dyn Trash> {
    match mode {
        DeleteMode::Trash => Box::new(SystemTrash),
        DeleteMode::Remove => Box::new(RemoveFiles),
    }
}

/// Append-only record of deleted files and folders.
#[derive(Debug, Clone)]
pub struct DeletionLog {
    path: PathBuf,
}

impl DeletionLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the lowercase basename of `deleted`. Failures are logged only.
    pub fn record(&self, deleted: &Path) {
        let Some(name) = deleted.file_name() else {
            return;
        };
        let line = name.to_string_lossy().to_lowercase();
        let res = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{line}"));
        if let Err(err) = res {
            warn!(log = %self.path.display(), error = %err, "could not record deletion");
        }
    }
}

/// Watch `roots` and call `on_change` whenever an image appears, disappears
/// or is renamed, or a directory is removed. The watcher stops when dropped.
pub fn start_watcher<F>(
    roots: &[PathBuf],
    recursive: bool,
    exts: Vec<String>,
    on_change: F,
) -> notify::Result<RecommendedWatcher>
where
    F: Fn() + Send + 'static,
{
    let mut watcher = recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if is_relevant(&event, &exts) {
                debug!(kind = ?event.kind, paths = ?event.paths, "fs: library changed");
                on_change();
            }
        }
        Err(err) => error!("watch error: {err}"),
    })?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    for root in roots {
        let dir = if root.is_file() {
            root.parent().unwrap_or(root.as_path())
        } else {
            root.as_path()
        };
        watcher.watch(dir, mode)?;
        info!(watching = %dir.display(), recursive, "notify watcher initialized");
    }
    Ok(watcher)
}

fn is_relevant(event: &Event, exts: &[String]) -> bool {
    let touches_image = || event.paths.iter().any(|p| is_supported_image(p, exts));
    match &event.kind {
        EventKind::Remove(RemoveKind::Folder) => true,
        EventKind::Create(CreateKind::File)
        | EventKind::Remove(_)
        | EventKind::Modify(ModifyKind::Name(_)) => touches_image(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::RenameMode;

    fn exts() -> Vec<String> {
        vec!["png".into(), "jpg".into()]
    }

    #[test]
    fn log_records_lowercase_basenames() {
        let dir = tempfile::tempdir().unwrap();
        let log = DeletionLog::new(dir.path().join("deleted.txt"));
        log.record(Path::new("/photos/Holiday/IMG_0001.JPG"));
        log.record(Path::new("/photos/Holiday"));
        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "img_0001.jpg\nholiday\n");
    }

    #[test]
    fn remove_files_deletes_directories_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("x.png"), b"x").unwrap();
        RemoveFiles.delete(&dir.path().join("a")).unwrap();
        assert!(!dir.path().join("a").exists());
    }

    #[test]
    fn remove_files_reports_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let err = RemoveFiles.delete(&dir.path().join("nope.png")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn only_image_changes_are_relevant() {
        let created_png = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/p/new.png"));
        let created_txt = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/p/notes.txt"));
        let renamed = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path(PathBuf::from("/p/old.png"));
        let renamed_txt = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path(PathBuf::from("/p/notes.txt"));
        let data = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/p/x.png"));
        assert!(is_relevant(&created_png, &exts()));
        assert!(!is_relevant(&created_txt, &exts()));
        assert!(is_relevant(&renamed, &exts()));
        assert!(!is_relevant(&renamed_txt, &exts()));
        assert!(!is_relevant(&data, &exts()));
    }
}
