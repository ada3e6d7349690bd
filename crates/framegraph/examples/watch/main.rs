//! Pass directory watcher
//!
//! Compiles a pass directory with the offline backend, then keeps polling it and
//! rebuilds the frame graph whenever a file changes. Stands in for a renderer
//! main loop: one poll per "frame", with a no-op frame flush.
//!
//! # Usage
//! ```bash
//! watch data/passes --frame-ms 16
//! ```

use clap::Parser;
use framegraph::backend::{OfflineDevice, OfflineShaderCompiler};
use framegraph::{CompilerSettings, FrameGraphBuilder};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(version, about = "Rebuilds a frame graph whenever its pass directory changes")]
struct Args {
    /// Pass directory
    pass_dir: PathBuf,

    /// YAML settings file; its pass directory is replaced by the argument
    #[arg(long, short)]
    settings: Option<PathBuf>,

    /// Delay between polls in milliseconds
    #[arg(long, default_value = "16")]
    frame_ms: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let mut settings = match &args.settings {
        Some(path) => CompilerSettings::from_file(path)?,
        None => CompilerSettings::default(),
    };
    settings.pass_dir = args.pass_dir;

    let device = OfflineDevice::new();
    let mut builder = FrameGraphBuilder::new(settings, OfflineShaderCompiler::new())?;
    let mut frame_graph = None;
    let mut flush = || tracing::debug!("Flushing in-flight frames");

    loop {
        match builder.build_frame_graph(&device, &mut flush, &mut frame_graph) {
            Ok(true) => {
                if let Some(graph) = &frame_graph {
                    for pass in &graph.passes {
                        let params = pass.params();
                        tracing::info!("  {} ({:?}): {} input elements", params.name, pass.input_type(), params.input_layout.len());
                    }
                }
            }
            Ok(false) => {}
            Err(e) if e.is_unrecoverable() => return Err(e.into()),
            Err(_) => {}
        }

        std::thread::sleep(Duration::from_millis(args.frame_ms));
    }
}
