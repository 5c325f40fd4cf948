//! Project-wide transform: every component under a directory, in parallel.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::options::TransformOptions;
use crate::transform::{is_component_file, transform_can};
use crate::validate::CanError;

/// Directories never scanned for components.
const SKIPPED_DIRS: [&str; 3] = ["node_modules", "dist", "target"];

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Transform(#[from] CanError),
}

#[derive(Debug)]
pub enum FileStatus {
    Unchanged,
    Rewritten(String),
    Failed(FileError),
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed(_))
    }
}

/// Transform every component file under `root`.
///
/// Files are independent: each call allocates its own caches, and one failing
/// file does not stop the others. Outcomes are sorted by path.
pub fn transform_project(root: &Path, options: &TransformOptions) -> Vec<FileOutcome> {
    let files = find_component_files(root);
    debug!(root = %root.display(), files = files.len(), "transforming project");

    let mut outcomes: Vec<FileOutcome> = files
        .into_par_iter()
        .map(|path| {
            let status = transform_path(&path, options);
            if let FileStatus::Failed(err) = &status {
                warn!(path = %path.display(), error = %err, "transform failed");
            }
            FileOutcome { path, status }
        })
        .collect();

    outcomes.sort_by(|a, b| a.path.cmp(&b.path));
    outcomes
}

fn transform_path(path: &Path, options: &TransformOptions) -> FileStatus {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(source) => {
            return FileStatus::Failed(FileError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };

    match transform_can(&source, &path.to_string_lossy(), options) {
        Ok(Some(output)) => FileStatus::Rewritten(output.code),
        Ok(None) => FileStatus::Unchanged,
        Err(err) => FileStatus::Failed(err.into()),
    }
}

/// Recursively find all component files in a directory.
fn find_component_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_component_file(&path.to_string_lossy()))
        .collect()
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ErrorKind;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_transforms_every_component_and_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "components/Guarded.vue",
            "<template><a v-can=\"can.a.b\">x</a></template>",
        );
        write(root, "components/Plain.vue", "<template><p>x</p></template>");
        write(root, "pages/Broken.vue", "<template><p v-cannot></p></template>");
        write(root, "pages/notes.md", "<a v-can=\"can.a.b\"></a>");
        write(
            root,
            "node_modules/lib/Skip.vue",
            "<template><p v-cannot></p></template>",
        );

        let options = TransformOptions::default().with_cwd(root);
        let outcomes = transform_project(root, &options);
        let names: Vec<String> = outcomes
            .iter()
            .map(|o| o.path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            names,
            vec!["components/Guarded.vue", "components/Plain.vue", "pages/Broken.vue"]
        );

        match &outcomes[0].status {
            FileStatus::Rewritten(code) => {
                assert_eq!(code, "<template><a v-if=\"__can__('a', 'b')\">x</a></template>")
            }
            other => panic!("expected a rewrite, got {:?}", other),
        }
        assert!(matches!(outcomes[1].status, FileStatus::Unchanged));
        match &outcomes[2].status {
            FileStatus::Failed(FileError::Transform(err)) => {
                assert_eq!(err.kind, ErrorKind::Adjacency);
                assert_eq!(err.file.replace('\\', "/"), "pages/Broken.vue");
            }
            other => panic!("expected an adjacency failure, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_directory_has_no_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        assert!(transform_project(dir.path(), &TransformOptions::default()).is_empty());
    }
}
