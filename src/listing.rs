//! Dataset directory listing.
//!
//! The expected layout is one subdirectory per class, each holding video
//! files:
//!
//! ```text
//! root/
//!   cat/
//!     a.mp4
//!   dog/
//!     b.mp4
//!     c.mp4
//! ```
//!
//! Both listings are sorted so that label ids and flat frame indices are the
//! same on every machine, whatever order the filesystem returns entries in.

use std::fs;
use std::path::{Path, PathBuf};

use crate::configuration::FolderOptions;
use crate::error::FramefoldError;

/// Names of the class subdirectories of `root`, sorted.
///
/// Symlinks are followed. Plain files at the root are ignored, as are
/// entries whose names are not valid UTF-8.
pub fn find_classes(root: &Path) -> Result<Vec<String>, FramefoldError> {
    let mut classes = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => classes.push(name),
            Err(name) => log::warn!("Ignoring non UTF-8 class directory {name:?}"),
        }
    }
    classes.sort();
    Ok(classes)
}

/// Video files of one class, as paths relative to the dataset root,
/// sorted by file name.
///
/// Files whose extension is not recognised by `options` are skipped
/// silently.
pub fn find_videos(
    root: &Path,
    class: &str,
    options: &FolderOptions,
) -> Result<Vec<PathBuf>, FramefoldError> {
    let class_path = root.join(class);
    let mut file_names = Vec::new();

    for entry in fs::read_dir(&class_path)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        if options.is_video_file(&path) {
            file_names.push(entry.file_name());
        }
    }

    file_names.sort();
    Ok(file_names
        .into_iter()
        .map(|file_name| Path::new(class).join(file_name))
        .collect())
}
