//! Abstract syntax tree of a pass file
//!
//! The tree is immutable output of the parser. It records declarations exactly as
//! written, in order; mandatory/duplicate checks, viewport resolution and the other
//! semantic rules run afterwards in [`crate::pass_source`].

use crate::types::{BlendFactor, DataType, PassInputType, PrimitiveTopology, ResourceBindFrequency, ResourceScope, ShaderStage};

use super::Span;

/// A whole pass file
#[derive(Debug, Clone, PartialEq)]
pub struct PassFile {
    pub items: Vec<Item>,
}

/// A top level declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    PassInput(PassInputType, Span),
    PassVertAttr(String, Span),
    PassVertAttrSlots(Vec<VertAttrSlot>, Span),
    State(Vec<StateDecl>),
    Shader(ShaderDecl),
    RootSig(RootSigDecl),
    ShaderDefs(Vec<ShaderDef>),
}

/// Explicit input slot of one vertex attribute field
#[derive(Debug, Clone, PartialEq)]
pub struct VertAttrSlot {
    pub field: String,
    pub slot: i64,
    pub span: Span,
}

/// A number as written; integers are absolute, floats are fractions of the draw area
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateDecl {
    ColorTarget(String),
    DepthTarget(String),
    Viewport([Number; 4], Span),
    BlendEnabled(bool),
    SrcBlend(BlendFactor),
    DestBlend(BlendFactor),
    Topology(PrimitiveTopology),
    DepthWriteMask(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDecl {
    pub stage: ShaderStage,
    /// Names of definitions to splice in front of the shader body
    pub externals: Vec<String>,
    /// Shader body text
    pub source: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RootSigDecl {
    /// Root signature text with newlines removed
    pub raw_view: String,
    pub params: Vec<RootParam>,
    pub span: Span,
}

/// A contiguous range of registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterRange {
    pub register_id: u32,
    /// Number of consecutive registers, `numDescriptors`, defaults to 1
    pub num: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RootParam {
    /// Inline constant buffer view
    ConstBuffView(RegisterRange, Span),
    DescTable(Vec<DescTableEntity>, Span),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DescTableEntity {
    ConstBuffView(RegisterRange),
    TextView(RegisterRange),
    SamplerView(RegisterRange),
}

/// Entries of a `ShaderDefs` block
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderDef {
    Resource(ResourceDecl),
    VertAttr(VertAttrDecl),
    Function(FunctionDecl),
}

/// Register as written, e.g. `b0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub class: char,
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDecl {
    pub scope: ResourceScope,
    pub bind_frequency: ResourceBindFrequency,
    pub name: String,
    pub register: Register,
    pub body: ResourceBody,
    /// Declaration text without the scope attribute
    pub raw_view: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceBody {
    ConstBuff(Vec<FieldDecl>),
    Texture,
    Sampler,
}

/// Typed, named field of a constant buffer or vertex attribute struct
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub data_type: DataType,
    pub name: String,
    /// Vertex semantic, e.g. `TEXCOORD1`
    pub semantic: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertAttrDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub raw_view: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub raw_view: String,
    pub span: Span,
}
