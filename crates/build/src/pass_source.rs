//! Semantic lowering of a parsed pass file
//!
//! [`PassSource`] is the checked, defaulted form of one pass file. Lowering walks
//! the syntax tree once, enforces the per-file rules (mandatory declarations,
//! register classes, viewport sanity) and resolves fractional viewports against
//! the draw area. Cross-pass rules live in [`crate::validate`].

use serde::Serialize;

use crate::settings::DrawArea;
use crate::syntax::ast::{self, Item, Number, PassFile, ResourceBody, RootParam, ShaderDef, StateDecl};
use crate::syntax::parse_pass;
use crate::types::{BlendState, DataType, DepthStencilState, DepthWriteMask, PassInputType, PrimitiveTopology, ResourceBindFrequency, ResourceScope, ShaderStage, Viewport};
use crate::FrameGraphError;

/// Number of vertex input slots
pub const MAX_VERTEX_INPUT_SLOTS: u32 = 16;

/// Per-file semantic errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SemanticError {
    #[error("missing mandatory '{0}' declaration")]
    MissingDeclaration(&'static str),
    #[error("'{0}' is declared more than once")]
    DuplicateDeclaration(&'static str),
    #[error("more than one {0:?} shader")]
    DuplicateShaderStage(ShaderStage),
    #[error("viewport ({x}, {y}, {width}, {height}) has its top left corner outside of its extent")]
    InvalidViewport { x: f32, y: f32, width: f32, height: f32 },
    #[error("resource '{resource}' must use a '{expected}' register, found '{found}'")]
    RegisterClassMismatch { resource: String, expected: char, found: char },
    #[error("vertex attribute slot {slot} of field '{field}' is out of range (0..16)")]
    SlotOutOfRange { field: String, slot: i64 },
    #[error("field '{field}' of vertex attribute '{vert_attr}' has invalid semantic '{semantic}'")]
    InvalidSemantic { vert_attr: String, field: String, semantic: String },
    #[error("field '{field}' of vertex attribute '{vert_attr}' has type {data_type:?}, which cannot be a vertex input")]
    InvalidVertexFieldType { vert_attr: String, field: String, data_type: DataType },
}

/// Kind of a bindable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    ConstBuff,
    Texture,
    Sampler,
}

impl ResourceKind {
    /// Register class letter used by this kind (`b`, `t`, `s`)
    pub fn register_class(self) -> char {
        match self {
            Self::ConstBuff => 'b',
            Self::Texture => 't',
            Self::Sampler => 's',
        }
    }
}

/// A named, typed constant buffer field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstBuffField {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResourceContent {
    ConstBuff(Vec<ConstBuffField>),
    Texture,
    Sampler,
}

/// A resource declared in `ShaderDefs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub name: String,
    pub scope: ResourceScope,
    pub bind_frequency: ResourceBindFrequency,
    pub register_id: u32,
    pub content: ResourceContent,
    /// Declaration text, spliced into shaders that import the resource
    pub raw_view: String,
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self.content {
            ResourceContent::ConstBuff(_) => ResourceKind::ConstBuff,
            ResourceContent::Texture => ResourceKind::Texture,
            ResourceContent::Sampler => ResourceKind::Sampler,
        }
    }

    /// Returns true if both declarations describe the same resource, byte for byte
    pub fn same_content(&self, other: &Resource) -> bool {
        self.kind() == other.kind() && self.raw_view == other.raw_view
    }
}

/// Vertex attribute field with its split semantic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VertAttrField {
    pub name: String,
    pub data_type: DataType,
    /// Semantic without trailing index, e.g. `TEXCOORD`
    pub semantic_name: String,
    pub semantic_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VertAttr {
    pub name: String,
    pub fields: Vec<VertAttrField>,
    pub raw_view: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: String,
    pub raw_view: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    pub externals: Vec<String>,
    pub source: String,
}

/// One entry of a descriptor table, covering `num` consecutive registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DescTableEntry {
    pub kind: ResourceKind,
    pub register_id: u32,
    pub num: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RootParameter {
    /// Inline constant buffer view bound to one `b` register
    ConstBuffView { register_id: u32 },
    DescTable(Vec<DescTableEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootSignature {
    /// Root signature text on a single line
    pub raw_view: String,
    pub params: Vec<RootParameter>,
}

/// A checked pass, ready for cross-pass validation and compilation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassSource {
    pub name: String,
    pub input: PassInputType,
    pub vert_attr_name: String,
    /// Explicit input slot per vertex attribute field, in declaration order
    pub vert_attr_slots: Vec<(String, u32)>,
    pub color_target_name: String,
    pub depth_target_name: String,
    pub viewport: Viewport,
    pub blend: BlendState,
    pub depth_stencil: DepthStencilState,
    pub topology: PrimitiveTopology,
    pub shaders: Vec<ShaderSource>,
    pub root_signature: RootSignature,
    pub resources: Vec<Resource>,
    pub vert_attrs: Vec<VertAttr>,
    pub functions: Vec<Function>,
}

impl PassSource {
    /// Parses and lowers one preprocessed pass file
    ///
    /// # Arguments
    /// * `name` - Pass name
    /// * `file` - File name for error reporting
    /// * `src` - Preprocessed pass text
    /// * `draw_area` - Extent fractional viewports are resolved against
    pub fn parse(name: &str, file: &str, src: &str, draw_area: DrawArea) -> Result<Self, FrameGraphError> {
        let ast = parse_pass(src).map_err(|source| FrameGraphError::Parse { file: file.to_string(), source })?;
        Self::from_ast(name, &ast, draw_area).map_err(|source| FrameGraphError::Semantic { pass: name.to_string(), source })
    }

    /// Lowers a parsed pass file
    pub fn from_ast(name: &str, ast: &PassFile, draw_area: DrawArea) -> Result<Self, SemanticError> {
        let mut input = None;
        let mut vert_attr_name = None;
        let mut vert_attr_slots = None;
        let mut root_signature = None;
        let mut shaders: Vec<ShaderSource> = Vec::new();
        let mut resources = Vec::new();
        let mut vert_attrs = Vec::new();
        let mut functions = Vec::new();

        let mut color_target_name = String::new();
        let mut depth_target_name = String::new();
        let mut viewport = Viewport::full(draw_area.width, draw_area.height);
        let mut blend = BlendState::default();
        let mut depth_stencil = DepthStencilState::default();
        let mut topology = PrimitiveTopology::default();

        for item in &ast.items {
            match item {
                Item::PassInput(value, _) => set_once(&mut input, *value, "PassInput")?,
                Item::PassVertAttr(value, _) => set_once(&mut vert_attr_name, value.clone(), "PassVertAttr")?,
                Item::PassVertAttrSlots(slots, _) => {
                    let slots = slots
                        .iter()
                        .map(|s| match u32::try_from(s.slot) {
                            Ok(slot) if slot < MAX_VERTEX_INPUT_SLOTS => Ok((s.field.clone(), slot)),
                            _ => Err(SemanticError::SlotOutOfRange { field: s.field.clone(), slot: s.slot }),
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    set_once(&mut vert_attr_slots, slots, "PassVertAttrSlots")?;
                }
                Item::State(decls) => {
                    for decl in decls {
                        match decl {
                            StateDecl::ColorTarget(target) => color_target_name = target.clone(),
                            StateDecl::DepthTarget(target) => depth_target_name = target.clone(),
                            StateDecl::Viewport(values, _) => viewport = resolve_viewport(values, draw_area)?,
                            StateDecl::BlendEnabled(enabled) => blend.enabled = *enabled,
                            StateDecl::SrcBlend(factor) => blend.src = *factor,
                            StateDecl::DestBlend(factor) => blend.dest = *factor,
                            StateDecl::Topology(value) => topology = *value,
                            StateDecl::DepthWriteMask(enabled) => depth_stencil.write_mask = if *enabled { DepthWriteMask::All } else { DepthWriteMask::Zero },
                        }
                    }
                }
                Item::Shader(shader) => {
                    if shaders.iter().any(|s| s.stage == shader.stage) {
                        return Err(SemanticError::DuplicateShaderStage(shader.stage));
                    }
                    shaders.push(ShaderSource {
                        stage: shader.stage,
                        externals: shader.externals.clone(),
                        source: shader.source.clone(),
                    });
                }
                Item::RootSig(decl) => set_once(&mut root_signature, lower_root_signature(decl), "RootSig")?,
                Item::ShaderDefs(defs) => {
                    for def in defs {
                        match def {
                            ShaderDef::Resource(decl) => resources.push(lower_resource(decl)?),
                            ShaderDef::VertAttr(decl) => vert_attrs.push(lower_vert_attr(decl)?),
                            ShaderDef::Function(decl) => functions.push(Function {
                                name: decl.name.clone(),
                                raw_view: decl.raw_view.clone(),
                            }),
                        }
                    }
                }
            }
        }

        if shaders.is_empty() {
            return Err(SemanticError::MissingDeclaration("Shader"));
        }

        Ok(Self {
            name: name.to_string(),
            input: input.ok_or(SemanticError::MissingDeclaration("PassInput"))?,
            vert_attr_name: vert_attr_name.ok_or(SemanticError::MissingDeclaration("PassVertAttr"))?,
            vert_attr_slots: vert_attr_slots.unwrap_or_default(),
            color_target_name,
            depth_target_name,
            viewport,
            blend,
            depth_stencil,
            topology,
            shaders,
            root_signature: root_signature.ok_or(SemanticError::MissingDeclaration("RootSig"))?,
            resources,
            vert_attrs,
            functions,
        })
    }

    /// Finds the first resource of the given kind bound to `register_id`
    pub fn find_resource(&self, kind: ResourceKind, register_id: u32) -> Option<&Resource> {
        self.resources_on(kind, register_id).next()
    }

    /// All resources of the given kind bound to `register_id`, in declaration order
    pub fn resources_on(&self, kind: ResourceKind, register_id: u32) -> impl Iterator<Item = &Resource> + '_ {
        self.resources.iter().filter(move |r| r.kind() == kind && r.register_id == register_id)
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, what: &'static str) -> Result<(), SemanticError> {
    if slot.is_some() {
        return Err(SemanticError::DuplicateDeclaration(what));
    }
    *slot = Some(value);
    Ok(())
}

/// Resolves a viewport declaration: integers are pixels, floats are fractions of the draw area
pub fn resolve_viewport(values: &[Number; 4], draw_area: DrawArea) -> Result<Viewport, SemanticError> {
    let resolve = |value: Number, extent: u32| match value {
        Number::Int(pixels) => pixels as f32,
        Number::Float(fraction) => fraction * extent as f32,
    };

    let viewport = Viewport {
        top_left_x: resolve(values[0], draw_area.width),
        top_left_y: resolve(values[1], draw_area.height),
        width: resolve(values[2], draw_area.width),
        height: resolve(values[3], draw_area.height),
        min_depth: 0.0,
        max_depth: 1.0,
    };

    if viewport.top_left_x >= viewport.width || viewport.top_left_y >= viewport.height {
        return Err(SemanticError::InvalidViewport {
            x: viewport.top_left_x,
            y: viewport.top_left_y,
            width: viewport.width,
            height: viewport.height,
        });
    }
    Ok(viewport)
}

fn lower_root_signature(decl: &ast::RootSigDecl) -> RootSignature {
    let params = decl
        .params
        .iter()
        .map(|param| match param {
            RootParam::ConstBuffView(range, _) => RootParameter::ConstBuffView { register_id: range.register_id },
            RootParam::DescTable(entities, _) => RootParameter::DescTable(
                entities
                    .iter()
                    .map(|entity| {
                        let (kind, range) = match entity {
                            ast::DescTableEntity::ConstBuffView(range) => (ResourceKind::ConstBuff, range),
                            ast::DescTableEntity::TextView(range) => (ResourceKind::Texture, range),
                            ast::DescTableEntity::SamplerView(range) => (ResourceKind::Sampler, range),
                        };
                        DescTableEntry {
                            kind,
                            register_id: range.register_id,
                            num: range.num,
                        }
                    })
                    .collect(),
            ),
        })
        .collect();

    RootSignature {
        raw_view: decl.raw_view.clone(),
        params,
    }
}

fn lower_resource(decl: &ast::ResourceDecl) -> Result<Resource, SemanticError> {
    let content = match &decl.body {
        ResourceBody::ConstBuff(fields) => ResourceContent::ConstBuff(
            fields
                .iter()
                .map(|f| ConstBuffField {
                    name: f.name.clone(),
                    data_type: f.data_type,
                })
                .collect(),
        ),
        ResourceBody::Texture => ResourceContent::Texture,
        ResourceBody::Sampler => ResourceContent::Sampler,
    };

    let resource = Resource {
        name: decl.name.clone(),
        scope: decl.scope,
        bind_frequency: decl.bind_frequency,
        register_id: decl.register.id,
        content,
        raw_view: decl.raw_view.clone(),
    };

    let expected = resource.kind().register_class();
    if decl.register.class != expected {
        return Err(SemanticError::RegisterClassMismatch {
            resource: resource.name,
            expected,
            found: decl.register.class,
        });
    }
    Ok(resource)
}

fn lower_vert_attr(decl: &ast::VertAttrDecl) -> Result<VertAttr, SemanticError> {
    let fields = decl
        .fields
        .iter()
        .map(|field| {
            if field.data_type.vertex_format().is_none() {
                return Err(SemanticError::InvalidVertexFieldType {
                    vert_attr: decl.name.clone(),
                    field: field.name.clone(),
                    data_type: field.data_type,
                });
            }
            let (semantic_name, semantic_index) = match &field.semantic {
                Some(semantic) => split_semantic(semantic).ok_or_else(|| SemanticError::InvalidSemantic {
                    vert_attr: decl.name.clone(),
                    field: field.name.clone(),
                    semantic: semantic.clone(),
                })?,
                None => (field.name.to_uppercase(), 0),
            };
            Ok(VertAttrField {
                name: field.name.clone(),
                data_type: field.data_type,
                semantic_name,
                semantic_index,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(VertAttr {
        name: decl.name.clone(),
        fields,
        raw_view: decl.raw_view.clone(),
    })
}

/// Splits a semantic into its name and trailing index: `TEXCOORD1` becomes (`TEXCOORD`, 1)
///
/// Returns `None` if nothing but digits remains or the index does not fit in a `u32`.
pub fn split_semantic(semantic: &str) -> Option<(String, u32)> {
    let name = semantic.trim_end_matches(|c: char| c.is_ascii_digit());
    if name.is_empty() {
        return None;
    }
    let digits = &semantic[name.len()..];
    let index = if digits.is_empty() { 0 } else { digits.parse().ok()? };
    Some((name.to_string(), index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlendFactor;

    const MINIMAL: &str = r#"
PassInput : Dynamic
PassVertAttr : VertexIn
RootSig <[ CBV(b0), DescriptorTable(SRV(t0), Sampler(s0)) ]>
ShaderDefs
{
    [Global, PerPass] cbuffer FrameConstants : register(b0) { float4x4 viewProj; };
    [Local, PerObject] Texture2D Albedo : register(t0);
    [Local, PerObject] SamplerState Linear : register(s0);
    struct VertexIn { float3 pos; float2 uv : TEXCOORD1; };
}
Shader VS : External(FrameConstants, VertexIn) <[ float4 main() : SV_POSITION { return 0; } ]>
"#;

    fn lower(src: &str) -> Result<PassSource, SemanticError> {
        let ast = parse_pass(src).unwrap();
        PassSource::from_ast("Test", &ast, DrawArea::default())
    }

    #[test]
    fn test_defaults() {
        let pass = lower(MINIMAL).unwrap();
        assert_eq!(pass.input, PassInputType::Dynamic);
        assert_eq!(pass.viewport, Viewport::full(1920, 1080));
        assert_eq!(pass.blend, BlendState { enabled: false, src: BlendFactor::One, dest: BlendFactor::Zero });
        assert_eq!(pass.topology, PrimitiveTopology::TriangleList);
        assert_eq!(pass.depth_stencil.write_mask, DepthWriteMask::All);
        assert_eq!(pass.color_target_name, "");
        assert!(pass.vert_attr_slots.is_empty());
    }

    #[test]
    fn test_lowered_declarations() {
        let pass = lower(MINIMAL).unwrap();
        assert_eq!(pass.resources.len(), 3);
        assert_eq!(pass.find_resource(ResourceKind::Texture, 0).map(|r| r.name.as_str()), Some("Albedo"));
        assert_eq!(
            pass.root_signature.params,
            vec![
                RootParameter::ConstBuffView { register_id: 0 },
                RootParameter::DescTable(vec![
                    DescTableEntry { kind: ResourceKind::Texture, register_id: 0, num: 1 },
                    DescTableEntry { kind: ResourceKind::Sampler, register_id: 0, num: 1 },
                ]),
            ]
        );

        let fields = &pass.vert_attrs[0].fields;
        assert_eq!((fields[0].semantic_name.as_str(), fields[0].semantic_index), ("POS", 0));
        assert_eq!((fields[1].semantic_name.as_str(), fields[1].semantic_index), ("TEXCOORD", 1));
    }

    #[test]
    fn test_fractional_viewport_resolves_against_draw_area() {
        let viewport = resolve_viewport(&[Number::Float(0.0), Number::Float(0.0), Number::Float(1.0), Number::Float(1.0)], DrawArea::default()).unwrap();
        assert_eq!((viewport.top_left_x, viewport.top_left_y, viewport.width, viewport.height), (0.0, 0.0, 1920.0, 1080.0));
    }

    #[test]
    fn test_viewport_corner_outside_extent_fails() {
        let err = resolve_viewport(&[Number::Int(1920), Number::Int(0), Number::Int(0), Number::Int(1080)], DrawArea::default()).unwrap_err();
        assert!(matches!(err, SemanticError::InvalidViewport { .. }));
    }

    #[test]
    fn test_viewport_state_is_applied() {
        let src = format!("{MINIMAL}\nState {{ Viewport : 0, 0, 0.5, 540 }}");
        let pass = lower(&src).unwrap();
        assert_eq!((pass.viewport.width, pass.viewport.height), (960.0, 540.0));
    }

    #[test]
    fn test_missing_declarations() {
        let err = lower("PassVertAttr : V RootSig <[ ]> Shader VS <[ ]>").unwrap_err();
        assert_eq!(err, SemanticError::MissingDeclaration("PassInput"));

        let err = lower("PassInput : UI PassVertAttr : V RootSig <[ ]>").unwrap_err();
        assert_eq!(err, SemanticError::MissingDeclaration("Shader"));
    }

    #[test]
    fn test_duplicate_declarations() {
        let err = lower(&format!("{MINIMAL}\nPassInput : UI")).unwrap_err();
        assert_eq!(err, SemanticError::DuplicateDeclaration("PassInput"));

        let err = lower(&format!("{MINIMAL}\nShader VS <[ ]>")).unwrap_err();
        assert_eq!(err, SemanticError::DuplicateShaderStage(ShaderStage::Vertex));
    }

    #[test]
    fn test_register_class_must_match() {
        let src = MINIMAL.replace("Texture2D Albedo : register(t0)", "Texture2D Albedo : register(b3)");
        let err = lower(&src).unwrap_err();
        assert_eq!(err, SemanticError::RegisterClassMismatch { resource: "Albedo".to_string(), expected: 't', found: 'b' });
    }

    #[test]
    fn test_slot_out_of_range() {
        let err = lower(&format!("{MINIMAL}\nPassVertAttrSlots : (pos, 0), (uv, 16)")).unwrap_err();
        assert_eq!(err, SemanticError::SlotOutOfRange { field: "uv".to_string(), slot: 16 });
    }

    #[test]
    fn test_matrix_vertex_field_is_rejected() {
        let src = MINIMAL.replace("float3 pos;", "float4x4 pos;");
        assert!(matches!(lower(&src).unwrap_err(), SemanticError::InvalidVertexFieldType { .. }));
    }

    #[test]
    fn test_split_semantic() {
        assert_eq!(split_semantic("TEXCOORD1"), Some(("TEXCOORD".to_string(), 1)));
        assert_eq!(split_semantic("POSITION"), Some(("POSITION".to_string(), 0)));
        assert_eq!(split_semantic("COLOR12"), Some(("COLOR".to_string(), 12)));
        assert_eq!(split_semantic("COLOR99999999999"), None);
    }

    #[test]
    fn test_invalid_semantic_is_rejected() {
        assert_eq!(split_semantic("0"), None);

        let src = MINIMAL.replace("float2 uv : TEXCOORD1;", "float2 uv : TEXCOORD99999999999;");
        let err = PassSource::from_ast("Test", &parse_pass(&src).unwrap(), DrawArea::default()).unwrap_err();
        assert_eq!(
            err,
            SemanticError::InvalidSemantic {
                vert_attr: "VertexIn".to_string(),
                field: "uv".to_string(),
                semantic: "TEXCOORD99999999999".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_wraps_errors_with_context() {
        let err = PassSource::parse("Broken", "Broken.pass", "PassInput : Nope", DrawArea::default()).unwrap_err();
        assert!(matches!(err, FrameGraphError::Parse { ref file, .. } if file == "Broken.pass"));

        let err = PassSource::parse("Empty", "Empty.pass", "", DrawArea::default()).unwrap_err();
        assert!(matches!(err, FrameGraphError::Semantic { ref pass, .. } if pass == "Empty"));
    }
}
