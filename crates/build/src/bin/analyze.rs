//! Frame graph analysis tool
//!
//! Compiles a pass directory with the offline backend and dumps the resulting
//! frame graph to stdout, either with Debug formatting or as JSON.
//!
//! # Usage
//! ```bash
//! analyze data/passes
//! analyze --settings framegraph.yaml --json
//! ```

use clap::Parser;
use framegraph_build::backend::{OfflineDevice, OfflineShaderCompiler};
use framegraph_build::settings::CompilerSettings;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(version, about = "Compiles a pass directory and dumps the frame graph")]
struct Args {
    /// Pass directory; overrides the one from the settings file
    pass_dir: Option<PathBuf>,

    /// YAML settings file
    #[arg(long, short)]
    settings: Option<PathBuf>,

    /// Dump as JSON instead of Debug formatting
    #[arg(long)]
    json: bool,

    /// Run cross-pass resource validation even in release builds
    #[arg(long)]
    validate: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt().with_max_level(args.log_level).with_writer(std::io::stderr).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error installing logger: {e}");
    }

    let mut settings = match &args.settings {
        Some(path) => match CompilerSettings::from_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Error loading settings '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => CompilerSettings::default(),
    };
    if let Some(pass_dir) = args.pass_dir {
        settings.pass_dir = pass_dir;
    }
    settings.validate_resources |= args.validate;

    let device = OfflineDevice::new();
    let frame_graph = match framegraph_build::compile_frame_graph(&settings, &OfflineShaderCompiler::new(), &device) {
        Ok(frame_graph) => frame_graph,
        Err(e) => {
            eprintln!("Error compiling '{}': {e}", settings.pass_dir.display());
            process::exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&frame_graph) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing frame graph: {e}");
                process::exit(1);
            }
        }
    } else {
        println!("{frame_graph:#?}");
    }
}
