//! Graphics backend seams
//!
//! The compiler never talks to a GPU API directly. Shader compilation and
//! creation of root signatures and pipeline state objects go through the traits
//! in this module, so a frame graph can be compiled against a real device, an
//! out-of-process shader compiler, or the in-memory [`offline`] backend.

mod dxc;
pub mod offline;

pub use dxc::DxcShaderCompiler;
pub use offline::{OfflineDevice, OfflineShaderCompiler};

use crate::pipelines::GraphicsPipelineDesc;

/// A request to compile one shader stage
#[derive(Debug, Clone, Copy)]
pub struct ShaderCompileRequest<'a> {
    /// Debug name, `<pass><STAGE>`
    pub name: &'a str,
    /// Fully assembled source text
    pub source: &'a str,
    pub entry_point: &'a str,
    /// Target profile, e.g. `ps_5_1`
    pub profile: &'a str,
}

/// Output of a successful shader compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    pub bytecode: Vec<u8>,
    /// Warnings reported by the compiler, if any
    pub diagnostics: Option<String>,
}

/// A rejected shader with the compiler's diagnostic text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{diagnostics}")]
pub struct ShaderCompileFailure {
    pub diagnostics: String,
}

/// Compiles assembled shader source into bytecode
pub trait ShaderCompiler {
    fn compile(&self, request: &ShaderCompileRequest<'_>) -> Result<CompiledShader, ShaderCompileFailure>;
}

/// Failure to create a backend object
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to create '{label}': {message}")]
pub struct DeviceError {
    pub label: String,
    pub message: String,
}

impl DeviceError {
    pub fn new(label: &str, message: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            message: message.into(),
        }
    }
}

/// Creates the backend objects of a compiled pass
pub trait GraphicsDevice {
    type RootSignature: std::fmt::Debug;
    type PipelineState: std::fmt::Debug;

    /// Creates a root signature from shader bytecode that embeds its definition
    fn create_root_signature(&self, label: &str, bytecode: &[u8]) -> Result<Self::RootSignature, DeviceError>;

    fn create_graphics_pipeline_state(&self, label: &str, desc: &GraphicsPipelineDesc<'_, Self::RootSignature>) -> Result<Self::PipelineState, DeviceError>;
}
