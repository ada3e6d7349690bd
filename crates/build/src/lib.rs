//! Render pass description compiler
//!
//! This crate compiles a directory of pass description files into a
//! [`FrameGraph`](pipelines::FrameGraph): every pass file is preprocessed,
//! parsed and lowered to a [`PassSource`](pass_source::PassSource), resources are
//! validated across passes, and passes are compiled in the order the frame graph
//! file lists them into root signatures, pipeline state objects and resource
//! argument templates. Shader compilation and object creation go through the
//! [`backend`] traits.

mod error;
mod hash;

pub mod backend;
pub mod pass_source;
pub mod pipelines;
pub mod preprocess;
pub mod settings;
pub mod sources;
pub mod syntax;
pub mod types;
pub mod validate;

pub use error::FrameGraphError;
pub use hash::NameHash;

/// Compiles the pass directory named by `settings`
///
/// # Arguments
/// * `settings` - Compiler settings, including the pass directory
/// * `shader_compiler` - Backend compiling assembled shader source
/// * `device` - Backend creating root signatures and pipeline states
///
/// # Returns
/// The compiled frame graph, or the first error of the rebuild
pub fn compile_frame_graph<C, D>(settings: &settings::CompilerSettings, shader_compiler: &C, device: &D) -> Result<pipelines::FrameGraph<D>, FrameGraphError>
where
    C: backend::ShaderCompiler,
    D: backend::GraphicsDevice,
{
    pipelines::FrameGraphCompiler::new(settings, shader_compiler, device).compile_dir()
}
