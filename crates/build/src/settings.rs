//! Compiler settings.
//!
//! Settings control where pass sources live, which file extensions identify pass
//! files and the frame graph ordering file, which shader model the shader compiler
//! targets, and the draw area used to resolve fractional viewports. They are usually
//! loaded from a YAML file, with every field defaulted.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::FrameGraphError;

/// Default extension of pass definition files
pub const DEFAULT_PASS_FILE_EXT: &str = "pass";
/// Default extension of the frame graph ordering file
pub const DEFAULT_FRAME_GRAPH_FILE_EXT: &str = "fg";
/// Default shader model suffix appended to the stage profile (`vs_5_1`)
pub const DEFAULT_SHADER_MODEL: &str = "5_1";
/// Default shader entry point symbol
pub const DEFAULT_ENTRY_POINT: &str = "main";

/// Size of the area passes draw into, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DrawArea {
    pub width: u32,
    pub height: u32,
}

impl Default for DrawArea {
    fn default() -> Self {
        Self { width: 1920, height: 1080 }
    }
}

/// Settings for one frame graph compiler instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Directory containing pass files, include files and the ordering file
    pub pass_dir: PathBuf,
    /// Extension (without dot) of pass definition files
    pub pass_file_ext: String,
    /// Extension (without dot) of the frame graph ordering file
    pub frame_graph_file_ext: String,
    /// Shader model suffix, e.g. `5_1`
    pub shader_model: String,
    /// Entry point symbol passed to the shader compiler
    pub entry_point: String,
    /// Draw area used to resolve fractional viewport values
    pub draw_area: DrawArea,
    /// Whether cross-pass resource validation runs. Defaults to on in debug builds only.
    pub validate_resources: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            pass_dir: PathBuf::from("passes"),
            pass_file_ext: DEFAULT_PASS_FILE_EXT.to_string(),
            frame_graph_file_ext: DEFAULT_FRAME_GRAPH_FILE_EXT.to_string(),
            shader_model: DEFAULT_SHADER_MODEL.to_string(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            draw_area: DrawArea::default(),
            validate_resources: cfg!(debug_assertions),
        }
    }
}

impl CompilerSettings {
    /// Creates default settings reading passes from `pass_dir`
    pub fn with_pass_dir<P: Into<PathBuf>>(pass_dir: P) -> Self {
        Self { pass_dir: pass_dir.into(), ..Self::default() }
    }

    /// Parses settings from YAML content
    ///
    /// # Arguments
    /// * `yaml_content` - YAML string containing the settings
    pub fn from_yaml(yaml_content: &str) -> Result<Self, serde_norway::Error> {
        serde_norway::from_str(yaml_content)
    }

    /// Parses settings from a YAML file
    ///
    /// A relative `pass_dir` is resolved against the directory of the settings file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FrameGraphError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| FrameGraphError::io(path, e))?;
        let mut settings = Self::from_yaml(&content)?;
        if settings.pass_dir.is_relative() {
            if let Some(parent) = path.parent() {
                settings.pass_dir = parent.join(&settings.pass_dir);
            }
        }
        Ok(settings)
    }
}
