//! Loading pass sources from disk

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::FrameGraphError;

/// Raw text of every pass file and the frame graph ordering file of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    /// Directory the sources were read from; includes are resolved against it
    pub dir: PathBuf,
    /// Pass file content keyed by pass name (file name without extension)
    pub passes: BTreeMap<String, String>,
    /// Frame graph ordering file name
    pub frame_graph_file: String,
    /// Frame graph ordering file content
    pub frame_graph: String,
}

impl SourceSet {
    /// Reads all pass files and the single frame graph file from `dir`
    ///
    /// # Arguments
    /// * `dir` - Pass directory
    /// * `pass_file_ext` - Extension of pass files, without the dot
    /// * `frame_graph_file_ext` - Extension of the ordering file, without the dot
    ///
    /// # Returns
    /// * `Ok(SourceSet)` - All sources of the directory
    /// * `Err(FrameGraphError)` - A file could not be read, or there is not exactly one ordering file
    pub fn load(dir: &Path, pass_file_ext: &str, frame_graph_file_ext: &str) -> Result<Self, FrameGraphError> {
        let entries = std::fs::read_dir(dir).map_err(|e| FrameGraphError::io(dir, e))?;

        let mut passes = BTreeMap::new();
        let mut frame_graph_files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| FrameGraphError::io(dir, e))?.path();
            if !path.is_file() {
                continue;
            }

            let (Some(stem), Some(ext)) = (path.file_stem().and_then(|s| s.to_str()), path.extension().and_then(|s| s.to_str())) else {
                continue;
            };

            if ext == pass_file_ext {
                tracing::debug!("Reading pass file {}", path.display());
                let content = std::fs::read_to_string(&path).map_err(|e| FrameGraphError::io(&path, e))?;
                passes.insert(stem.to_string(), content);
            } else if ext == frame_graph_file_ext {
                frame_graph_files.push(path);
            }
        }

        frame_graph_files.sort();
        let frame_graph_path = match frame_graph_files.as_slice() {
            [] => {
                return Err(FrameGraphError::MissingFrameGraphFile {
                    dir: dir.to_path_buf(),
                    ext: frame_graph_file_ext.to_string(),
                });
            }
            [path] => path,
            _ => {
                return Err(FrameGraphError::MultipleFrameGraphFiles {
                    dir: dir.to_path_buf(),
                    files: frame_graph_files.iter().map(|p| file_name(p)).collect(),
                });
            }
        };

        tracing::debug!("Reading frame graph file {}", frame_graph_path.display());
        let frame_graph = std::fs::read_to_string(frame_graph_path).map_err(|e| FrameGraphError::io(frame_graph_path, e))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            passes,
            frame_graph_file: file_name(frame_graph_path),
            frame_graph,
        })
    }

    /// Reads a file next to the pass files, used to resolve includes
    pub fn read_include(&self, name: &str) -> Result<String, std::io::Error> {
        std::fs::read_to_string(self.dir.join(name))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Static.pass"), "PassInput : Static").unwrap();
        std::fs::write(dir.path().join("UI.pass"), "PassInput : UI").unwrap();
        std::fs::write(dir.path().join("Main.fg"), "Static UI").unwrap();
        std::fs::write(dir.path().join("common.hlsli"), "float x;").unwrap();

        let sources = SourceSet::load(dir.path(), "pass", "fg").unwrap();
        assert_eq!(sources.passes.keys().collect::<Vec<_>>(), vec!["Static", "UI"]);
        assert_eq!(sources.frame_graph_file, "Main.fg");
        assert_eq!(sources.frame_graph, "Static UI");
        assert_eq!(sources.read_include("common.hlsli").unwrap(), "float x;");
    }

    #[test]
    fn test_missing_frame_graph_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Static.pass"), "PassInput : Static").unwrap();

        let err = SourceSet::load(dir.path(), "pass", "fg").unwrap_err();
        assert!(matches!(err, FrameGraphError::MissingFrameGraphFile { .. }));
    }

    #[test]
    fn test_multiple_frame_graph_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A.fg"), "").unwrap();
        std::fs::write(dir.path().join("B.fg"), "").unwrap();

        let err = SourceSet::load(dir.path(), "pass", "fg").unwrap_err();
        assert!(matches!(err, FrameGraphError::MultipleFrameGraphFiles { ref files, .. } if files == &vec!["A.fg".to_string(), "B.fg".to_string()]));
    }
}
