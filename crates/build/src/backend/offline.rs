//! In-memory backend
//!
//! Compiles and "creates" everything without a GPU. The shader compiler performs
//! structural checks only and returns the source text as bytecode; the device
//! records the descriptors it is given. Used by the `analyze` tool and by tests.

use serde::Serialize;
use std::cell::Cell;

use super::{CompiledShader, DeviceError, GraphicsDevice, ShaderCompileFailure, ShaderCompileRequest, ShaderCompiler};
use crate::pipelines::{GraphicsPipelineDesc, InputElement};
use crate::types::{BlendState, DepthStencilState, PrimitiveTopologyType, ShaderStage};

/// Shader compiler that checks the entry point and bracket balance
#[derive(Debug, Default)]
pub struct OfflineShaderCompiler;

impl OfflineShaderCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl ShaderCompiler for OfflineShaderCompiler {
    fn compile(&self, request: &ShaderCompileRequest<'_>) -> Result<CompiledShader, ShaderCompileFailure> {
        let fail = |message: String| ShaderCompileFailure {
            diagnostics: format!("{}({}): error: {message}", request.name, request.profile),
        };

        let mut depth = [0i64; 3];
        for c in request.source.chars() {
            let (index, delta) = match c {
                '(' => (0, 1),
                ')' => (0, -1),
                '[' => (1, 1),
                ']' => (1, -1),
                '{' => (2, 1),
                '}' => (2, -1),
                _ => continue,
            };
            depth[index] += delta;
            if depth[index] < 0 {
                return Err(fail(format!("unexpected '{c}'")));
            }
        }
        if depth.iter().any(|d| *d != 0) {
            return Err(fail("unbalanced brackets".to_string()));
        }

        if !declares_function(request.source, request.entry_point) {
            return Err(fail(format!("missing entry point '{}'", request.entry_point)));
        }

        Ok(CompiledShader {
            bytecode: request.source.as_bytes().to_vec(),
            diagnostics: None,
        })
    }
}

/// Returns true if `source` contains `name` as a whole identifier followed by `(`
fn declares_function(source: &str, name: &str) -> bool {
    source.match_indices(name).any(|(start, _)| {
        let before = source[..start].chars().next_back();
        let after = source[start + name.len()..].trim_start().chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') && after == Some('(')
    })
}

/// Root signature recorded by [`OfflineDevice`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfflineRootSignature {
    pub label: String,
    /// Root signature text extracted from the shader
    pub definition: String,
}

/// Pipeline state recorded by [`OfflineDevice`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfflinePipelineState {
    pub label: String,
    pub root_signature: String,
    pub stages: Vec<ShaderStage>,
    pub input_layout: Vec<InputElement>,
    pub blend: BlendState,
    pub depth_stencil: DepthStencilState,
    pub topology_type: PrimitiveTopologyType,
}

/// Device that records created objects
#[derive(Debug, Default)]
pub struct OfflineDevice {
    root_signatures_created: Cell<usize>,
    pipeline_states_created: Cell<usize>,
}

impl OfflineDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_signatures_created(&self) -> usize {
        self.root_signatures_created.get()
    }

    pub fn pipeline_states_created(&self) -> usize {
        self.pipeline_states_created.get()
    }
}

const ROOT_SIGNATURE_OPEN: &str = "[RootSignature( \"";
const ROOT_SIGNATURE_CLOSE: &str = "\" )]";

impl GraphicsDevice for OfflineDevice {
    type RootSignature = OfflineRootSignature;
    type PipelineState = OfflinePipelineState;

    fn create_root_signature(&self, label: &str, bytecode: &[u8]) -> Result<Self::RootSignature, DeviceError> {
        let text = std::str::from_utf8(bytecode).map_err(|e| DeviceError::new(label, format!("bytecode is not text: {e}")))?;
        let definition = text
            .find(ROOT_SIGNATURE_OPEN)
            .map(|start| &text[start + ROOT_SIGNATURE_OPEN.len()..])
            .and_then(|rest| rest.find(ROOT_SIGNATURE_CLOSE).map(|end| rest[..end].trim()))
            .ok_or_else(|| DeviceError::new(label, "shader does not embed a root signature"))?;

        self.root_signatures_created.set(self.root_signatures_created.get() + 1);
        Ok(OfflineRootSignature {
            label: label.to_string(),
            definition: definition.to_string(),
        })
    }

    fn create_graphics_pipeline_state(&self, label: &str, desc: &GraphicsPipelineDesc<'_, Self::RootSignature>) -> Result<Self::PipelineState, DeviceError> {
        if desc.vertex_shader.is_none() {
            return Err(DeviceError::new(label, "pipeline has no vertex shader"));
        }

        let stages = [
            (ShaderStage::Vertex, desc.vertex_shader),
            (ShaderStage::Geometry, desc.geometry_shader),
            (ShaderStage::Pixel, desc.pixel_shader),
        ]
        .into_iter()
        .filter_map(|(stage, bytecode)| bytecode.map(|_| stage))
        .collect();

        self.pipeline_states_created.set(self.pipeline_states_created.get() + 1);
        Ok(OfflinePipelineState {
            label: label.to_string(),
            root_signature: desc.root_signature.label.clone(),
            stages,
            input_layout: desc.input_layout.to_vec(),
            blend: desc.blend,
            depth_stencil: desc.depth_stencil,
            topology_type: desc.topology_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: &str) -> ShaderCompileRequest<'_> {
        ShaderCompileRequest {
            name: "OpaqueVS",
            source,
            entry_point: "main",
            profile: "vs_5_1",
        }
    }

    #[test]
    fn test_compiles_balanced_source_with_entry_point() {
        let compiled = OfflineShaderCompiler::new().compile(&request("float4 main() : SV_POSITION { return 0; }")).unwrap();
        assert_eq!(compiled.bytecode, b"float4 main() : SV_POSITION { return 0; }");
    }

    #[test]
    fn test_rejects_missing_entry_point() {
        let failure = OfflineShaderCompiler::new().compile(&request("float4 domain() { return 0; }")).unwrap_err();
        assert_eq!(failure.diagnostics, "OpaqueVS(vs_5_1): error: missing entry point 'main'");
    }

    #[test]
    fn test_rejects_unbalanced_source() {
        assert!(OfflineShaderCompiler::new().compile(&request("float4 main() { return 0;")).is_err());
        assert!(OfflineShaderCompiler::new().compile(&request("float4 main() { return 0; }}")).is_err());
    }

    #[test]
    fn test_root_signature_is_extracted() {
        let device = OfflineDevice::new();
        let source = b"cbuffer A : register(b0) { float x; };\n[RootSignature( \"  CBV(b0)  \" )]float4 main() {}";
        let root_signature = device.create_root_signature("Root sig, pass: A", source).unwrap();
        assert_eq!(root_signature.definition, "CBV(b0)");
        assert_eq!(device.root_signatures_created(), 1);

        assert!(device.create_root_signature("Root sig, pass: B", b"float4 main() {}").is_err());
    }
}
