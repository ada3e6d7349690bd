//! The compiled frame graph

use serde::Serialize;

use super::{InputElement, PassRootArgs, RootArg};
use crate::backend::GraphicsDevice;
use crate::hash::NameHash;
use crate::types::{PassInputType, PrimitiveTopology, Viewport};

/// `[Global, PerObject]` argument templates, one list per pass input type
pub type PerObjectGlobalTemplate = [Vec<RootArg>; PassInputType::COUNT];

/// GPU-ready form of one pass
#[derive(Debug, Serialize)]
#[serde(bound(serialize = "D::RootSignature: Serialize, D::PipelineState: Serialize"))]
pub struct PassParameters<D: GraphicsDevice> {
    pub name: String,
    pub input: PassInputType,
    pub color_target: NameHash,
    pub depth_target: NameHash,
    pub viewport: Viewport,
    pub topology: PrimitiveTopology,
    pub input_layout: Vec<InputElement>,
    pub root_signature: D::RootSignature,
    pub pipeline_state: D::PipelineState,
    #[serde(flatten)]
    pub root_args: PassRootArgs,
}

/// A compiled pass, tagged with the kind of objects it draws
#[derive(Debug, Serialize)]
#[serde(bound(serialize = "D::RootSignature: Serialize, D::PipelineState: Serialize"))]
pub enum Pass<D: GraphicsDevice> {
    Ui(PassParameters<D>),
    Static(PassParameters<D>),
    Dynamic(PassParameters<D>),
    Particles(PassParameters<D>),
}

impl<D: GraphicsDevice> Pass<D> {
    pub fn new(params: PassParameters<D>) -> Self {
        match params.input {
            PassInputType::Ui => Self::Ui(params),
            PassInputType::Static => Self::Static(params),
            PassInputType::Dynamic => Self::Dynamic(params),
            PassInputType::Particles => Self::Particles(params),
        }
    }

    pub fn params(&self) -> &PassParameters<D> {
        match self {
            Self::Ui(params) | Self::Static(params) | Self::Dynamic(params) | Self::Particles(params) => params,
        }
    }

    pub fn input_type(&self) -> PassInputType {
        match self {
            Self::Ui(_) => PassInputType::Ui,
            Self::Static(_) => PassInputType::Static,
            Self::Dynamic(_) => PassInputType::Dynamic,
            Self::Particles(_) => PassInputType::Particles,
        }
    }
}

/// Ordered passes plus the global argument templates they reference by index
#[derive(Debug, Serialize)]
#[serde(bound(serialize = "D::RootSignature: Serialize, D::PipelineState: Serialize"))]
pub struct FrameGraph<D: GraphicsDevice> {
    pub passes: Vec<Pass<D>>,
    /// Deduplicated `[Global, PerPass]` arguments shared by all passes
    pub pass_global_root_args: Vec<RootArg>,
    pub per_object_global_root_args_template: PerObjectGlobalTemplate,
}

impl<D: GraphicsDevice> FrameGraph<D> {
    pub fn pass(&self, name: &str) -> Option<&Pass<D>> {
        self.passes.iter().find(|pass| pass.params().name == name)
    }

    /// Global per-pass arguments referenced by a pass, in root parameter order
    pub fn pass_global_root_args<'a>(&'a self, params: &'a PassParameters<D>) -> impl Iterator<Item = &'a RootArg> + 'a {
        params.root_args.pass_global_root_args_indices.iter().filter_map(|&i| self.pass_global_root_args.get(i))
    }

    /// Global per-object arguments referenced by a pass
    pub fn per_object_global_root_args<'a>(&'a self, params: &'a PassParameters<D>) -> impl Iterator<Item = &'a RootArg> + 'a {
        let template = &self.per_object_global_root_args_template[params.input.index()];
        params.root_args.per_object_global_root_args_indices.iter().filter_map(move |&i| template.get(i))
    }
}
