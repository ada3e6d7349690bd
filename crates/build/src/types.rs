//! Vocabulary shared by the parser, the validator and the compiled frame graph
//!
//! These are closed sum types: every consumer matches them exhaustively, so an
//! unknown kind is a compile error rather than a runtime condition.

use serde::Serialize;
use std::fmt;

/// Kind of objects a pass draws. Each input type is an independent namespace
/// for global per-object resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PassInputType {
    #[serde(rename = "ui")]
    Ui,
    #[serde(rename = "static")]
    Static,
    #[serde(rename = "dynamic")]
    Dynamic,
    #[serde(rename = "particles")]
    Particles,
}

impl PassInputType {
    /// Number of input types
    pub const COUNT: usize = 4;

    /// All input types in declaration order
    pub const ALL: [PassInputType; Self::COUNT] = [Self::Ui, Self::Static, Self::Dynamic, Self::Particles];

    /// Dense index usable for per-input-type tables
    pub fn index(self) -> usize {
        match self {
            Self::Ui => 0,
            Self::Static => 1,
            Self::Dynamic => 2,
            Self::Particles => 3,
        }
    }

    /// Parses the DSL keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "UI" => Some(Self::Ui),
            "Static" => Some(Self::Static),
            "Dynamic" => Some(Self::Dynamic),
            "Particles" => Some(Self::Particles),
            _ => None,
        }
    }
}

impl fmt::Display for PassInputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ui => write!(f, "UI"),
            Self::Static => write!(f, "Static"),
            Self::Dynamic => write!(f, "Dynamic"),
            Self::Particles => write!(f, "Particles"),
        }
    }
}

/// Programmable pipeline stage a shader block targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Pixel,
}

impl ShaderStage {
    /// Parses the DSL keyword (`VS`, `GS`, `PS`)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "VS" => Some(Self::Vertex),
            "GS" => Some(Self::Geometry),
            "PS" => Some(Self::Pixel),
            _ => None,
        }
    }

    /// Upper-case stage tag used in shader names
    pub fn tag(self) -> &'static str {
        match self {
            Self::Vertex => "VS",
            Self::Geometry => "GS",
            Self::Pixel => "PS",
        }
    }

    /// Shader compiler target profile for the given shader model, e.g. `vs_5_1`
    pub fn profile(self, shader_model: &str) -> String {
        format!("{}_{shader_model}", self.tag().to_lowercase())
    }
}

/// Visibility of a resource across passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceScope {
    /// Only visible in its own pass
    Local,
    /// May be shared by name with other passes
    Global,
}

/// How often a resource is rebound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceBindFrequency {
    /// Rebound for every drawn object
    PerObject,
    /// Bound once for as long as the pass runs
    PerPass,
}

/// Scalar, vector and matrix types usable in constant buffers and vertex attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    Float,
    Float2,
    Float3,
    Float4,
    Float4x4,
    Int,
    Int2,
    Int3,
    Int4,
    Uint,
    Uint2,
    Uint3,
    Uint4,
}

impl DataType {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "float" => Some(Self::Float),
            "float2" => Some(Self::Float2),
            "float3" => Some(Self::Float3),
            "float4" => Some(Self::Float4),
            "float4x4" => Some(Self::Float4x4),
            "int" => Some(Self::Int),
            "int2" => Some(Self::Int2),
            "int3" => Some(Self::Int3),
            "int4" => Some(Self::Int4),
            "uint" => Some(Self::Uint),
            "uint2" => Some(Self::Uint2),
            "uint3" => Some(Self::Uint3),
            "uint4" => Some(Self::Uint4),
            _ => None,
        }
    }

    /// Size in bytes
    pub fn size(self) -> u32 {
        match self {
            Self::Float | Self::Int | Self::Uint => 4,
            Self::Float2 | Self::Int2 | Self::Uint2 => 8,
            Self::Float3 | Self::Int3 | Self::Uint3 => 12,
            Self::Float4 | Self::Int4 | Self::Uint4 => 16,
            Self::Float4x4 => 64,
        }
    }

    /// Vertex input format, if this type can be fed through the input assembler
    pub fn vertex_format(self) -> Option<VertexFormat> {
        match self {
            Self::Float => Some(VertexFormat::R32Float),
            Self::Float2 => Some(VertexFormat::R32G32Float),
            Self::Float3 => Some(VertexFormat::R32G32B32Float),
            Self::Float4 => Some(VertexFormat::R32G32B32A32Float),
            Self::Int => Some(VertexFormat::R32Sint),
            Self::Int2 => Some(VertexFormat::R32G32Sint),
            Self::Int3 => Some(VertexFormat::R32G32B32Sint),
            Self::Int4 => Some(VertexFormat::R32G32B32A32Sint),
            Self::Uint => Some(VertexFormat::R32Uint),
            Self::Uint2 => Some(VertexFormat::R32G32Uint),
            Self::Uint3 => Some(VertexFormat::R32G32B32Uint),
            Self::Uint4 => Some(VertexFormat::R32G32B32A32Uint),
            Self::Float4x4 => None,
        }
    }
}

/// Per-vertex element formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VertexFormat {
    R32Float,
    R32G32Float,
    R32G32B32Float,
    R32G32B32A32Float,
    R32Sint,
    R32G32Sint,
    R32G32B32Sint,
    R32G32B32A32Sint,
    R32Uint,
    R32G32Uint,
    R32G32B32Uint,
    R32G32B32A32Uint,
}

/// Blend factors accepted by `SrcBlend` / `DestBlend`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    InvSrcAlpha,
}

impl BlendFactor {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Zero" => Some(Self::Zero),
            "One" => Some(Self::One),
            "SrcAlpha" => Some(Self::SrcAlpha),
            "InvSrcAlpha" => Some(Self::InvSrcAlpha),
            _ => None,
        }
    }
}

/// Blend state of the single render target a pass writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlendState {
    pub enabled: bool,
    pub src: BlendFactor,
    pub dest: BlendFactor,
}

impl Default for BlendState {
    fn default() -> Self {
        Self { enabled: false, src: BlendFactor::One, dest: BlendFactor::Zero }
    }
}

/// Depth write mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DepthWriteMask {
    Zero,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DepthStencilState {
    pub depth_enabled: bool,
    pub write_mask: DepthWriteMask,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self { depth_enabled: true, write_mask: DepthWriteMask::All }
    }
}

/// Primitive topology used when drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    PointList,
}

/// Topology class the pipeline state object is created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrimitiveTopologyType {
    Triangle,
    Point,
}

impl PrimitiveTopology {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Triangle" => Some(Self::TriangleList),
            "Point" => Some(Self::PointList),
            _ => None,
        }
    }

    pub fn topology_type(self) -> PrimitiveTopologyType {
        match self {
            Self::TriangleList => PrimitiveTopologyType::Triangle,
            Self::PointList => PrimitiveTopologyType::Point,
        }
    }
}

/// Viewport in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub top_left_x: f32,
    pub top_left_y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering the whole draw area
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            top_left_x: 0.0,
            top_left_y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}
