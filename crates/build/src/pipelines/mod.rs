//! Frame graph compilation
//!
//! This module turns validated [`PassSource`](crate::pass_source::PassSource)s
//! into a [`FrameGraph`]: shader assembly and compilation, input layout, root
//! signature and pipeline state generation, and the resource argument templates
//! with cross-pass deduplication of global resources.

mod assemble;
mod compiler;
mod frame_graph;
mod pipeline_state;
mod root_args;

pub use assemble::assemble_shader_source;
pub use compiler::FrameGraphCompiler;
pub use frame_graph::*;
pub use pipeline_state::{GraphicsPipelineDesc, InputElement, generate_input_layout};
pub use root_args::*;

use crate::pass_source::ResourceKind;
use crate::types::{ResourceBindFrequency, ResourceScope, ShaderStage};

/// Errors raised while compiling one pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("{stage:?} shader imports '{name}', which is not a resource, vertex attribute or function of the pass")]
    UnresolvedExternal { stage: ShaderStage, name: String },
    #[error("shader '{shader}' failed to compile:\n{diagnostics}")]
    ShaderCompilation { shader: String, diagnostics: String },
    #[error("vertex attribute '{0}' is not declared")]
    MissingVertAttr(String),
    #[error("vertex attribute '{vert_attr}' has {expected} field(s) but {found} slot(s) are assigned")]
    SlotMapSize { vert_attr: String, expected: usize, found: usize },
    #[error("no input slot is assigned to field '{field}' of vertex attribute '{vert_attr}'")]
    MissingSlot { vert_attr: String, field: String },
    #[error("field '{field}' of vertex attribute '{vert_attr}' uses input slot {slot}, the limit is 16")]
    SlotOutOfRange { vert_attr: String, field: String, slot: u32 },
    #[error("no {kind:?} resource is bound to register {register_id}")]
    MissingResource { kind: ResourceKind, register_id: u32 },
    #[error("more than one {kind:?} resource is bound to register {register_id}")]
    AmbiguousResource { kind: ResourceKind, register_id: u32 },
    #[error("descriptor range of root parameter {bind_index} starting at register {register_id} with {num} descriptor(s) exceeds the register space")]
    RegisterRangeOverflow { bind_index: u32, register_id: u32, num: u32 },
    #[error("descriptor table of root parameter {bind_index} mixes [{:?}, {:?}] with [{:?}, {:?}] in resource '{resource}'", .expected.0, .expected.1, .found.0, .found.1)]
    MixedDescTable {
        bind_index: u32,
        resource: String,
        expected: (ResourceScope, ResourceBindFrequency),
        found: (ResourceScope, ResourceBindFrequency),
    },
}
