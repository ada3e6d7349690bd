//! Hot-reloading frame graph owner
//!
//! [`FrameGraphBuilder`] is created once at startup for a pass directory. Each
//! frame the host calls [`FrameGraphBuilder::build_frame_graph`]; it returns
//! immediately unless the sources changed, in which case in-flight frames are
//! flushed, the directory is recompiled and the published frame graph is
//! replaced as a whole. A failed rebuild leaves the previous frame graph in place.

use framegraph_build::FrameGraphError;
use framegraph_build::backend::{GraphicsDevice, ShaderCompiler};
use framegraph_build::pipelines::FrameGraph;
use framegraph_build::settings::CompilerSettings;

use crate::watcher::{ChangeMonitor, SourceWatcher, WatchError};

/// Host side of the GPU frame queue
pub trait FrameSync {
    /// Blocks until no submitted frame references the current frame graph
    fn flush_all_frames(&mut self);
}

impl<F: FnMut()> FrameSync for F {
    fn flush_all_frames(&mut self) {
        self()
    }
}

/// Owns the compiler backend and the change monitor of one pass directory
#[derive(Debug)]
pub struct FrameGraphBuilder<C, M = SourceWatcher> {
    settings: CompilerSettings,
    shader_compiler: C,
    monitor: M,
    initial_build_pending: bool,
    rebuilds: usize,
}

impl<C: ShaderCompiler> FrameGraphBuilder<C, SourceWatcher> {
    /// Creates a builder watching `settings.pass_dir`
    ///
    /// # Arguments
    /// * `settings` - Compiler settings naming the pass directory
    /// * `shader_compiler` - Backend compiling assembled shader source
    ///
    /// # Returns
    /// The builder, or an error if the directory watch could not be installed
    pub fn new(settings: CompilerSettings, shader_compiler: C) -> Result<Self, WatchError> {
        let monitor = SourceWatcher::new(&settings.pass_dir)?;
        Ok(Self::with_monitor(settings, shader_compiler, monitor))
    }
}

impl<C: ShaderCompiler, M: ChangeMonitor> FrameGraphBuilder<C, M> {
    /// Creates a builder driven by a custom change monitor
    pub fn with_monitor(settings: CompilerSettings, shader_compiler: C, monitor: M) -> Self {
        Self {
            settings,
            shader_compiler,
            monitor,
            initial_build_pending: true,
            rebuilds: 0,
        }
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    pub fn monitor_mut(&mut self) -> &mut M {
        &mut self.monitor
    }

    /// Number of successful builds so far
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Returns true if the sources changed since the previous query
    ///
    /// Never blocks. The first query after construction always reports a change.
    pub fn is_source_changed(&mut self) -> bool {
        let changed = self.monitor.poll_changed();
        std::mem::take(&mut self.initial_build_pending) || changed
    }

    /// Rebuilds the frame graph if the sources changed
    ///
    /// # Arguments
    /// * `device` - Device creating root signatures and pipeline states
    /// * `frames` - Frame queue flushed before recompilation
    /// * `frame_graph` - Published frame graph, replaced only on success
    ///
    /// # Returns
    /// `Ok(true)` if a new frame graph was published, `Ok(false)` if nothing changed.
    /// On error `frame_graph` is left untouched.
    pub fn build_frame_graph<D, F>(&mut self, device: &D, frames: &mut F, frame_graph: &mut Option<FrameGraph<D>>) -> Result<bool, FrameGraphError>
    where
        D: GraphicsDevice,
        F: FrameSync + ?Sized,
    {
        if !self.is_source_changed() {
            return Ok(false);
        }

        tracing::info!("Rebuilding frame graph from {}", self.settings.pass_dir.display());
        frames.flush_all_frames();

        let built = match framegraph_build::compile_frame_graph(&self.settings, &self.shader_compiler, device) {
            Ok(built) => built,
            Err(e) => {
                if e.is_unrecoverable() {
                    tracing::error!("Frame graph object creation failed: {e}");
                } else {
                    tracing::error!("Frame graph rebuild failed, keeping previous frame graph: {e}");
                }
                return Err(e);
            }
        };

        tracing::info!("Frame graph rebuilt with {} passes", built.passes.len());
        *frame_graph = Some(built);
        self.rebuilds += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framegraph_build::backend::{OfflineDevice, OfflineShaderCompiler};

    #[derive(Debug, Default)]
    struct ManualMonitor {
        pending: bool,
    }

    impl ManualMonitor {
        fn touch(&mut self) {
            self.pending = true;
        }
    }

    impl ChangeMonitor for ManualMonitor {
        fn poll_changed(&mut self) -> bool {
            std::mem::take(&mut self.pending)
        }
    }

    #[derive(Debug, Default)]
    struct CountingFrames {
        flushes: usize,
    }

    impl FrameSync for CountingFrames {
        fn flush_all_frames(&mut self) {
            self.flushes += 1;
        }
    }

    const FRAME_CONSTANTS: &str = "[Global, PerPass] cbuffer FrameConstants : register(b0) { float4x4 viewProj; };";

    fn pass_text(body: &str) -> String {
        format!(
            r#"
PassInput : Static
PassVertAttr : VertexIn
State {{ ColorTarget : SceneColor DepthTarget : SceneDepth }}
RootSig <[ CBV(b0) ]>
ShaderDefs
{{
    #include "common.hlsli"
    struct VertexIn {{ float3 pos : POSITION; }};
}}
Shader VS : External(FrameConstants, VertexIn) <[ float4 main(VertexIn v) : SV_POSITION {{ return mul(viewProj, float4(v.pos, 1)); }} ]>
Shader PS <[ float4 main() : SV_TARGET {{ {body} }} ]>
"#
        )
    }

    fn pass_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("common.hlsli"), FRAME_CONSTANTS).unwrap();
        std::fs::write(dir.path().join("Opaque.pass"), pass_text("return 1;")).unwrap();
        std::fs::write(dir.path().join("Transparent.pass"), pass_text("return 0.5;")).unwrap();
        std::fs::write(dir.path().join("Main.fg"), "Opaque Transparent").unwrap();
        dir
    }

    fn builder(dir: &tempfile::TempDir) -> FrameGraphBuilder<OfflineShaderCompiler, ManualMonitor> {
        let settings = CompilerSettings {
            validate_resources: true,
            ..CompilerSettings::with_pass_dir(dir.path())
        };
        FrameGraphBuilder::with_monitor(settings, OfflineShaderCompiler::new(), ManualMonitor::default())
    }

    #[test]
    fn test_first_query_reports_change() {
        let dir = pass_dir();
        let mut builder = builder(&dir);
        assert!(builder.is_source_changed());
        assert!(!builder.is_source_changed());
    }

    #[test]
    fn test_unchanged_sources_do_not_rebuild() {
        let dir = pass_dir();
        let mut builder = builder(&dir);
        let device = OfflineDevice::new();
        let mut frames = CountingFrames::default();
        let mut frame_graph = None;

        assert!(builder.build_frame_graph(&device, &mut frames, &mut frame_graph).unwrap());
        assert!(!builder.build_frame_graph(&device, &mut frames, &mut frame_graph).unwrap());
        assert!(!builder.build_frame_graph(&device, &mut frames, &mut frame_graph).unwrap());

        assert_eq!(frame_graph.as_ref().map(|graph| graph.passes.len()), Some(2));
        assert_eq!(builder.rebuilds(), 1);
        assert_eq!(frames.flushes, 1);
        assert_eq!(device.pipeline_states_created(), 2);
    }

    #[test]
    fn test_touch_triggers_exactly_one_rebuild() {
        let dir = pass_dir();
        let mut builder = builder(&dir);
        let device = OfflineDevice::new();
        let mut frames = CountingFrames::default();
        let mut frame_graph = None;
        builder.build_frame_graph(&device, &mut frames, &mut frame_graph).unwrap();

        std::fs::write(dir.path().join("Main.fg"), "Transparent").unwrap();
        builder.monitor_mut().touch();

        assert!(builder.build_frame_graph(&device, &mut frames, &mut frame_graph).unwrap());
        assert!(!builder.build_frame_graph(&device, &mut frames, &mut frame_graph).unwrap());

        let graph = frame_graph.unwrap();
        assert_eq!(graph.passes.len(), 1);
        assert_eq!(graph.passes[0].params().name, "Transparent");
        assert_eq!(builder.rebuilds(), 2);
        assert_eq!(frames.flushes, 2);
        assert_eq!(device.pipeline_states_created(), 3);
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_frame_graph() {
        let dir = pass_dir();
        let mut builder = builder(&dir);
        let device = OfflineDevice::new();
        let mut frames = CountingFrames::default();
        let mut frame_graph = None;
        builder.build_frame_graph(&device, &mut frames, &mut frame_graph).unwrap();

        std::fs::write(dir.path().join("Transparent.pass"), pass_text("return 0.5; }")).unwrap();
        builder.monitor_mut().touch();

        let err = builder.build_frame_graph(&device, &mut frames, &mut frame_graph).unwrap_err();
        assert!(matches!(err, FrameGraphError::Compile { ref pass, .. } if pass == "Transparent"));
        assert!(!err.is_unrecoverable());
        assert_eq!(frame_graph.as_ref().map(|graph| graph.passes.len()), Some(2));
        assert_eq!(builder.rebuilds(), 1);

        // Waits for the next edit instead of retrying every frame
        assert!(!builder.build_frame_graph(&device, &mut frames, &mut frame_graph).unwrap());
    }

    #[test]
    fn test_closure_frame_sync() {
        let dir = pass_dir();
        let mut builder = builder(&dir);
        let device = OfflineDevice::new();
        let mut flushed = 0;
        let mut frame_graph = None;

        let mut flush = || flushed += 1;
        builder.build_frame_graph(&device, &mut flush, &mut frame_graph).unwrap();
        assert_eq!(flushed, 1);
    }
}
