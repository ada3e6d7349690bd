//! Frame graph compiler
//!
//! Drives a full rebuild: preprocess and parse every pass file, parse the
//! ordering file, validate resources across passes, then compile the passes one
//! by one in frame graph order. Passes compiled later reuse the global argument
//! templates created by earlier ones.

use super::pipeline_state::{create_pipeline_state, create_root_signature};
use super::{CompileError, FrameGraph, Pass, PassParameters, assemble_shader_source, build_root_args, generate_input_layout};
use crate::FrameGraphError;
use crate::backend::{CompiledShader, GraphicsDevice, ShaderCompileRequest, ShaderCompiler};
use crate::hash::NameHash;
use crate::pass_source::PassSource;
use crate::preprocess::Preprocessor;
use crate::settings::CompilerSettings;
use crate::sources::SourceSet;
use crate::syntax::parse_frame_graph;
use crate::types::ShaderStage;
use crate::validate::validate_resources;

/// Compiles pass sources into a [`FrameGraph`] using a shader compiler and a device
pub struct FrameGraphCompiler<'a, C, D> {
    settings: &'a CompilerSettings,
    shader_compiler: &'a C,
    device: &'a D,
}

impl<'a, C: ShaderCompiler, D: GraphicsDevice> FrameGraphCompiler<'a, C, D> {
    pub fn new(settings: &'a CompilerSettings, shader_compiler: &'a C, device: &'a D) -> Self {
        Self { settings, shader_compiler, device }
    }

    /// Loads and compiles the configured pass directory
    pub fn compile_dir(&self) -> Result<FrameGraph<D>, FrameGraphError> {
        let sources = SourceSet::load(&self.settings.pass_dir, &self.settings.pass_file_ext, &self.settings.frame_graph_file_ext)?;
        self.compile_sources(&sources)
    }

    /// Compiles already loaded sources
    pub fn compile_sources(&self, sources: &SourceSet) -> Result<FrameGraph<D>, FrameGraphError> {
        let preprocessor = Preprocessor::new()?;

        let mut passes = Vec::with_capacity(sources.passes.len());
        for (name, text) in &sources.passes {
            let file = format!("{name}.{}", self.settings.pass_file_ext);
            tracing::info!("Parsing {file}");

            let expanded = preprocessor.expand(&file, text, |include| sources.read_include(include))?;
            passes.push(PassSource::parse(name, &file, &expanded, self.settings.draw_area)?);
        }

        tracing::info!("Parsing {}", sources.frame_graph_file);
        let order = parse_frame_graph(&sources.frame_graph).map_err(|source| FrameGraphError::Parse {
            file: sources.frame_graph_file.clone(),
            source,
        })?;

        self.compile_passes(&passes, &order)
    }

    /// Validates and compiles lowered passes in the given order
    ///
    /// # Arguments
    /// * `passes` - All passes of the rebuild
    /// * `order` - Pass names in execution order
    ///
    /// # Returns
    /// * `Ok(FrameGraph)` - The compiled frame graph
    /// * `Err(FrameGraphError)` - The first error; nothing is partially returned
    pub fn compile_passes(&self, passes: &[PassSource], order: &[String]) -> Result<FrameGraph<D>, FrameGraphError> {
        if self.settings.validate_resources {
            validate_resources(passes)?;
        }

        for pass in passes.iter().filter(|pass| !order.contains(&pass.name)) {
            tracing::warn!("Pass {} is not listed in the frame graph and is skipped", pass.name);
        }

        let mut graph = FrameGraph {
            passes: Vec::with_capacity(order.len()),
            pass_global_root_args: Vec::new(),
            per_object_global_root_args_template: Default::default(),
        };

        for name in order {
            let pass = passes.iter().find(|pass| &pass.name == name).ok_or_else(|| FrameGraphError::UnknownPass(name.clone()))?;
            let compiled = self.compile_pass(pass, &mut graph)?;
            graph.passes.push(compiled);
        }

        tracing::info!(
            "Compiled frame graph: {} pass(es), {} global per-pass argument(s)",
            graph.passes.len(),
            graph.pass_global_root_args.len()
        );
        Ok(graph)
    }

    fn compile_pass(&self, pass: &PassSource, graph: &mut FrameGraph<D>) -> Result<Pass<D>, FrameGraphError> {
        tracing::info!("Compiling pass {}", pass.name);

        let compile_error = |source: CompileError| FrameGraphError::Compile { pass: pass.name.clone(), source };
        let device_error = |source| FrameGraphError::Device { pass: pass.name.clone(), source };

        let shaders = self.compile_shaders(pass).map_err(compile_error)?;

        let vert_attr = pass
            .vert_attrs
            .iter()
            .find(|v| v.name == pass.vert_attr_name)
            .ok_or_else(|| compile_error(CompileError::MissingVertAttr(pass.vert_attr_name.clone())))?;
        let input_layout = generate_input_layout(vert_attr, &pass.vert_attr_slots).map_err(compile_error)?;

        let root_signature = create_root_signature(self.device, pass, &shaders).map_err(device_error)?;
        let pipeline_state = create_pipeline_state(self.device, pass, &root_signature, &shaders, &input_layout).map_err(device_error)?;

        let root_args = build_root_args(pass, &mut graph.pass_global_root_args, &mut graph.per_object_global_root_args_template).map_err(compile_error)?;

        Ok(Pass::new(PassParameters {
            name: pass.name.clone(),
            input: pass.input,
            color_target: NameHash::of(&pass.color_target_name),
            depth_target: NameHash::of(&pass.depth_target_name),
            viewport: pass.viewport,
            topology: pass.topology,
            input_layout,
            root_signature,
            pipeline_state,
            root_args,
        }))
    }

    fn compile_shaders(&self, pass: &PassSource) -> Result<Vec<(ShaderStage, CompiledShader)>, CompileError> {
        pass.shaders
            .iter()
            .map(|shader| {
                let source = assemble_shader_source(pass, shader)?;
                let name = format!("{}{}", pass.name, shader.stage.tag());
                let profile = shader.stage.profile(&self.settings.shader_model);

                tracing::debug!("Compiling shader {name} ({profile})");
                let request = ShaderCompileRequest {
                    name: &name,
                    source: &source,
                    entry_point: &self.settings.entry_point,
                    profile: &profile,
                };

                match self.shader_compiler.compile(&request) {
                    Ok(compiled) => {
                        if let Some(diagnostics) = &compiled.diagnostics {
                            tracing::warn!("Shader {name}: {diagnostics}");
                        }
                        Ok((shader.stage, compiled))
                    }
                    Err(failure) => {
                        tracing::error!("Shader {name} failed to compile:\n{}", failure.diagnostics);
                        Err(CompileError::ShaderCompilation {
                            shader: name,
                            diagnostics: failure.diagnostics,
                        })
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{OfflineDevice, OfflineShaderCompiler};
    use crate::pipelines::RootArg;
    use crate::types::PassInputType;

    const COMMON: &str = r#"[Global, PerPass] cbuffer FrameConstants : register(b0) { float4x4 viewProj; float time; };"#;

    fn pass_text(input: &str, extra_defs: &str, body: &str) -> String {
        format!(
            r#"
PassInput : {input}
PassVertAttr : VertexIn
State {{ ColorTarget : SceneColor DepthTarget : SceneDepth }}
RootSig <[ CBV(b0), DescriptorTable(SRV(t0)) ]>
ShaderDefs
{{
    #include "common.hlsli"
    struct VertexIn {{ float3 pos : POSITION; float2 uv : TEXCOORD0; }};
    {extra_defs}
}}
Shader VS : External(FrameConstants, VertexIn) <[ float4 main(VertexIn v) : SV_POSITION {{ return mul(viewProj, float4(v.pos, 1)); }} ]>
Shader PS : External(Albedo) <[ float4 main() : SV_TARGET {{ {body} }} ]>
"#
        )
    }

    fn write_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn compile(dir: &tempfile::TempDir, device: &OfflineDevice) -> Result<FrameGraph<OfflineDevice>, FrameGraphError> {
        let settings = CompilerSettings {
            validate_resources: true,
            ..CompilerSettings::with_pass_dir(dir.path())
        };
        FrameGraphCompiler::new(&settings, &OfflineShaderCompiler::new(), device).compile_dir()
    }

    fn two_pass_dir(order: &str) -> tempfile::TempDir {
        let opaque = pass_text("Static", "[Local, PerObject] Texture2D Albedo : register(t0);", "return 1;");
        let dynamic = pass_text("Dynamic", "[Global, PerObject] Texture2D Albedo : register(t0);", "return 0.5;");
        write_dir(&[("common.hlsli", COMMON), ("Opaque.pass", &opaque), ("Skinned.pass", &dynamic), ("Main.fg", order)])
    }

    #[test]
    fn test_shared_global_per_pass_argument() {
        let dir = two_pass_dir("Opaque Skinned");
        let graph = compile(&dir, &OfflineDevice::new()).unwrap();

        assert_eq!(graph.passes.len(), 2);
        assert_eq!(graph.pass_global_root_args.len(), 1);
        assert!(matches!(graph.pass_global_root_args[0], RootArg::ConstBuffView { bind_index: 0, .. }));
        for pass in &graph.passes {
            assert_eq!(pass.params().root_args.pass_global_root_args_indices, vec![0]);
        }
    }

    #[test]
    fn test_passes_follow_frame_graph_order() {
        let dir = two_pass_dir("Skinned, Opaque");
        let graph = compile(&dir, &OfflineDevice::new()).unwrap();

        let names: Vec<_> = graph.passes.iter().map(|p| p.params().name.as_str()).collect();
        assert_eq!(names, vec!["Skinned", "Opaque"]);
        assert_eq!(graph.passes[0].input_type(), PassInputType::Dynamic);
        assert!(matches!(graph.passes[1], Pass::Static(_)));
    }

    #[test]
    fn test_pass_parameters() {
        let dir = two_pass_dir("Opaque Skinned");
        let device = OfflineDevice::new();
        let graph = compile(&dir, &device).unwrap();

        let skinned = graph.pass("Skinned").unwrap().params();
        assert_eq!(skinned.color_target, NameHash::of("SceneColor"));
        assert_eq!(skinned.depth_target, NameHash::of("SceneDepth"));
        assert_eq!(skinned.input_layout.len(), 2);
        assert_eq!(skinned.root_args.per_object_global_root_args_indices, vec![0]);
        assert_eq!(graph.per_object_global_root_args(skinned).count(), 1);
        assert_eq!(graph.per_object_global_root_args_template[PassInputType::Dynamic.index()].len(), 1);
        assert_eq!(skinned.root_signature.label, "Root sig, pass: Skinned");
        assert_eq!(skinned.pipeline_state.label, "PSO, pass: Skinned");
        assert!(skinned.root_signature.definition.contains("DescriptorTable(SRV(t0))"));

        let opaque = graph.pass("Opaque").unwrap().params();
        assert_eq!(opaque.root_args.per_object_local_root_args.len(), 1);
        assert_eq!(graph.pass_global_root_args(opaque).count(), 1);
        assert_eq!(device.pipeline_states_created(), 2);
    }

    #[test]
    fn test_unknown_pass_in_order() {
        let dir = two_pass_dir("Opaque Shadow");
        let err = compile(&dir, &OfflineDevice::new()).unwrap_err();
        assert!(matches!(err, FrameGraphError::UnknownPass(ref name) if name == "Shadow"));
    }

    #[test]
    fn test_unlisted_pass_is_skipped() {
        let dir = two_pass_dir("Opaque");
        let graph = compile(&dir, &OfflineDevice::new()).unwrap();
        assert_eq!(graph.passes.len(), 1);
        assert!(graph.pass("Skinned").is_none());
    }

    #[test]
    fn test_shader_compile_failure_carries_diagnostics() {
        let broken = pass_text("Static", "[Local, PerObject] Texture2D Albedo : register(t0);", "return 1; }");
        let dir = write_dir(&[("common.hlsli", COMMON), ("Broken.pass", &broken), ("Main.fg", "Broken")]);
        let err = compile(&dir, &OfflineDevice::new()).unwrap_err();

        let FrameGraphError::Compile {
            pass,
            source: CompileError::ShaderCompilation { shader, diagnostics },
        } = &err
        else {
            panic!("expected shader compilation error, got {err:?}");
        };
        assert_eq!(pass, "Broken");
        assert_eq!(shader, "BrokenPS");
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn test_validation_runs_before_compilation() {
        let a = pass_text("Static", "[Local, PerObject] Texture2D Albedo : register(t0);", "return 1;");
        let b = pass_text("Static", "[Global, PerObject] Texture2D Albedo : register(t0);", "return 1;");
        let dir = write_dir(&[("common.hlsli", COMMON), ("A.pass", &a), ("B.pass", &b), ("Main.fg", "A B")]);
        let device = OfflineDevice::new();

        let err = compile(&dir, &device).unwrap_err();
        assert!(matches!(err, FrameGraphError::Validation(_)));
        assert_eq!(device.pipeline_states_created(), 0);
    }

    #[test]
    fn test_missing_include() {
        let a = pass_text("Static", "", "return 1;");
        let dir = write_dir(&[("A.pass", &a), ("Main.fg", "A")]);
        let err = compile(&dir, &OfflineDevice::new()).unwrap_err();
        assert!(matches!(err, FrameGraphError::Preprocess(_)));
    }

    #[test]
    fn test_missing_vertex_attribute() {
        let a = pass_text("Static", "[Local, PerObject] Texture2D Albedo : register(t0);", "return 1;").replace("PassVertAttr : VertexIn", "PassVertAttr : Other");
        let dir = write_dir(&[("common.hlsli", COMMON), ("A.pass", &a), ("Main.fg", "A")]);
        let err = compile(&dir, &OfflineDevice::new()).unwrap_err();
        assert!(matches!(err, FrameGraphError::Compile { source: CompileError::MissingVertAttr(_), .. }));
    }
}
