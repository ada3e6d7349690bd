//! Input layout, root signature and pipeline state generation

use serde::Serialize;

use super::CompileError;
use crate::backend::{CompiledShader, DeviceError, GraphicsDevice};
use crate::pass_source::{MAX_VERTEX_INPUT_SLOTS, PassSource, VertAttr};
use crate::types::{BlendState, DepthStencilState, PrimitiveTopologyType, ShaderStage, VertexFormat};

/// One element of a vertex input layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputElement {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: VertexFormat,
    pub input_slot: u32,
    /// Byte offset of the element within its input slot
    pub aligned_byte_offset: u32,
}

/// Everything a device needs to create a graphics pipeline state object
#[derive(Debug)]
pub struct GraphicsPipelineDesc<'a, R> {
    pub root_signature: &'a R,
    pub vertex_shader: Option<&'a [u8]>,
    pub geometry_shader: Option<&'a [u8]>,
    pub pixel_shader: Option<&'a [u8]>,
    pub input_layout: &'a [InputElement],
    pub blend: BlendState,
    pub depth_stencil: DepthStencilState,
    pub topology_type: PrimitiveTopologyType,
}

/// Generates the vertex input layout of a vertex attribute struct
///
/// Fields are laid out in declaration order. Each field goes to input slot 0 unless
/// `slots` assigns it one; every slot keeps its own running byte offset.
///
/// # Arguments
/// * `vert_attr` - Vertex attribute struct the pass draws with
/// * `slots` - Explicit slot per field; empty, or exactly one entry per field
pub fn generate_input_layout(vert_attr: &VertAttr, slots: &[(String, u32)]) -> Result<Vec<InputElement>, CompileError> {
    if !slots.is_empty() && slots.len() != vert_attr.fields.len() {
        return Err(CompileError::SlotMapSize {
            vert_attr: vert_attr.name.clone(),
            expected: vert_attr.fields.len(),
            found: slots.len(),
        });
    }

    let mut offsets = [0u32; MAX_VERTEX_INPUT_SLOTS as usize];
    let mut layout = Vec::with_capacity(vert_attr.fields.len());
    for field in &vert_attr.fields {
        let input_slot = if slots.is_empty() {
            0
        } else {
            slots
                .iter()
                .find(|(name, _)| *name == field.name)
                .map(|(_, slot)| *slot)
                .ok_or_else(|| CompileError::MissingSlot {
                    vert_attr: vert_attr.name.clone(),
                    field: field.name.clone(),
                })?
        };

        // Lowering rejects types without a vertex format
        let Some(format) = field.data_type.vertex_format() else {
            continue;
        };

        let offset = offsets.get_mut(input_slot as usize).ok_or_else(|| CompileError::SlotOutOfRange {
            vert_attr: vert_attr.name.clone(),
            field: field.name.clone(),
            slot: input_slot,
        })?;
        layout.push(InputElement {
            semantic_name: field.semantic_name.clone(),
            semantic_index: field.semantic_index,
            format,
            input_slot,
            aligned_byte_offset: *offset,
        });
        *offset += field.data_type.size();
    }

    Ok(layout)
}

/// Creates the root signature of a pass from its first compiled shader
///
/// Every shader of a pass embeds the same root signature text, so any of them will do.
pub fn create_root_signature<D: GraphicsDevice>(device: &D, pass: &PassSource, shaders: &[(ShaderStage, CompiledShader)]) -> Result<D::RootSignature, DeviceError> {
    let label = format!("Root sig, pass: {}", pass.name);
    let (_, first) = shaders.first().ok_or_else(|| DeviceError::new(&label, "pass has no compiled shaders"))?;

    tracing::debug!("Creating root signature for pass {}", pass.name);
    device.create_root_signature(&label, &first.bytecode)
}

/// Creates the graphics pipeline state object of a pass
pub fn create_pipeline_state<D: GraphicsDevice>(
    device: &D,
    pass: &PassSource,
    root_signature: &D::RootSignature,
    shaders: &[(ShaderStage, CompiledShader)],
    input_layout: &[InputElement],
) -> Result<D::PipelineState, DeviceError> {
    let stage = |wanted: ShaderStage| shaders.iter().find(|(stage, _)| *stage == wanted).map(|(_, shader)| shader.bytecode.as_slice());

    let desc = GraphicsPipelineDesc {
        root_signature,
        vertex_shader: stage(ShaderStage::Vertex),
        geometry_shader: stage(ShaderStage::Geometry),
        pixel_shader: stage(ShaderStage::Pixel),
        input_layout,
        blend: pass.blend,
        depth_stencil: pass.depth_stencil,
        topology_type: pass.topology.topology_type(),
    };

    tracing::debug!("Creating pipeline state for pass {}", pass.name);
    device.create_graphics_pipeline_state(&format!("PSO, pass: {}", pass.name), &desc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass_source::VertAttrField;
    use crate::types::DataType;

    fn vert_attr() -> VertAttr {
        let field = |name: &str, data_type, semantic: &str, index| VertAttrField {
            name: name.to_string(),
            data_type,
            semantic_name: semantic.to_string(),
            semantic_index: index,
        };
        VertAttr {
            name: "VertexIn".to_string(),
            fields: vec![
                field("pos", DataType::Float3, "POSITION", 0),
                field("normal", DataType::Float3, "NORMAL", 0),
                field("uv", DataType::Float2, "TEXCOORD", 0),
                field("color", DataType::Float4, "COLOR", 0),
            ],
            raw_view: String::new(),
        }
    }

    #[test]
    fn test_single_slot_offsets_accumulate() {
        let layout = generate_input_layout(&vert_attr(), &[]).unwrap();
        assert_eq!(layout.iter().map(|e| (e.input_slot, e.aligned_byte_offset)).collect::<Vec<_>>(), vec![(0, 0), (0, 12), (0, 24), (0, 32)]);
        assert_eq!(layout[2].format, VertexFormat::R32G32Float);
    }

    #[test]
    fn test_slot_map_offsets_are_per_slot() {
        let slots = vec![("pos".to_string(), 0), ("normal".to_string(), 1), ("uv".to_string(), 0), ("color".to_string(), 1)];
        let layout = generate_input_layout(&vert_attr(), &slots).unwrap();
        assert_eq!(layout.iter().map(|e| (e.input_slot, e.aligned_byte_offset)).collect::<Vec<_>>(), vec![(0, 0), (1, 0), (0, 12), (1, 12)]);
    }

    #[test]
    fn test_slot_map_must_cover_all_fields() {
        let slots = vec![("pos".to_string(), 0)];
        let err = generate_input_layout(&vert_attr(), &slots).unwrap_err();
        assert_eq!(err, CompileError::SlotMapSize { vert_attr: "VertexIn".to_string(), expected: 4, found: 1 });

        let slots = vec![("pos".to_string(), 0), ("normal".to_string(), 1), ("uv".to_string(), 0), ("tangent".to_string(), 1)];
        let err = generate_input_layout(&vert_attr(), &slots).unwrap_err();
        assert_eq!(err, CompileError::MissingSlot { vert_attr: "VertexIn".to_string(), field: "color".to_string() });
    }
}
