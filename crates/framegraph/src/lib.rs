//! Frame graph host
//!
//! Keeps a compiled [`FrameGraph`] in sync with its pass directory. The
//! [`FrameGraphBuilder`] watches the directory, flushes in-flight frames before
//! recompiling, and publishes the new frame graph only when the whole rebuild
//! succeeded.

mod builder;
mod watcher;

pub use builder::{FrameGraphBuilder, FrameSync};
pub use watcher::{ChangeMonitor, SourceWatcher, WatchError};

pub use framegraph_build::FrameGraphError;
pub use framegraph_build::backend;
pub use framegraph_build::pipelines::{FrameGraph, Pass, PassParameters};
pub use framegraph_build::settings::CompilerSettings;
