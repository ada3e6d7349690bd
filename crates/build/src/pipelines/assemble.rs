use super::CompileError;
use crate::pass_source::{PassSource, ShaderSource};

/// Builds the complete source text of one shader
///
/// Every name in the shader's external list is looked up in the pass's resources,
/// then vertex attribute structs, then functions; the first match's declaration
/// text is emitted, terminated with `;`. The root signature attribute follows and
/// annotates the shader body, which comes last.
///
/// # Arguments
/// * `pass` - Pass that owns the shader
/// * `shader` - Shader to assemble
///
/// # Returns
/// * `Ok(String)` - Source text ready for the shader compiler
/// * `Err(CompileError::UnresolvedExternal)` - An imported name is not declared in the pass
pub fn assemble_shader_source(pass: &PassSource, shader: &ShaderSource) -> Result<String, CompileError> {
    let mut source = String::new();

    for external in &shader.externals {
        let raw_view = pass
            .resources
            .iter()
            .find(|r| &r.name == external)
            .map(|r| &r.raw_view)
            .or_else(|| pass.vert_attrs.iter().find(|v| &v.name == external).map(|v| &v.raw_view))
            .or_else(|| pass.functions.iter().find(|f| &f.name == external).map(|f| &f.raw_view))
            .ok_or_else(|| CompileError::UnresolvedExternal {
                stage: shader.stage,
                name: external.clone(),
            })?;

        source.push_str(raw_view);
        source.push_str(";\n");
    }

    source.push_str("[RootSignature( \" ");
    source.push_str(&pass.root_signature.raw_view);
    source.push_str(" \" )]");
    source.push_str(&shader.source);

    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DrawArea;
    use crate::types::ShaderStage;

    const PASS: &str = r#"
PassInput : UI
PassVertAttr : VertexIn
RootSig <[ CBV(b0),
  DescriptorTable(SRV(t0)) ]>
ShaderDefs
{
    [Global, PerPass] cbuffer FrameConstants : register(b0) { float4x4 viewProj; };
    [Local, PerObject] Texture2D Albedo : register(t0);
    struct VertexIn { float2 pos; };
    float4 Tint(float4 c) { return c; }
}
Shader VS : External(VertexIn, FrameConstants) <[float4 main(VertexIn v) : SV_POSITION { return 0; }]>
Shader PS : External(Tint, Missing) <[float4 main() : SV_TARGET { return Tint(1); }]>
"#;

    fn pass() -> PassSource {
        PassSource::parse("Ui", "Ui.pass", PASS, DrawArea::default()).unwrap()
    }

    #[test]
    fn test_externals_precede_root_signature_and_body() {
        let pass = pass();
        let source = assemble_shader_source(&pass, &pass.shaders[0]).unwrap();
        assert_eq!(
            source,
            "struct VertexIn { float2 pos; };\n\
             cbuffer FrameConstants : register(b0) { float4x4 viewProj; };\n\
             [RootSignature( \"  CBV(b0),  DescriptorTable(SRV(t0))  \" )]float4 main(VertexIn v) : SV_POSITION { return 0; }"
        );
    }

    #[test]
    fn test_unresolved_external() {
        let pass = pass();
        let err = assemble_shader_source(&pass, &pass.shaders[1]).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnresolvedExternal {
                stage: ShaderStage::Pixel,
                name: "Missing".to_string(),
            }
        );
    }
}
