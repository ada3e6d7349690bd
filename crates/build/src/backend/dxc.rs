use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use super::{CompiledShader, ShaderCompileFailure, ShaderCompileRequest, ShaderCompiler};

/// Shader compiler that runs the DirectX shader compiler (`dxc`) as a child process
///
/// The assembled source is written to a temporary file and compiled with
/// `dxc -T <profile> -E <entry> -Fo <output>`. Anything the compiler prints to
/// stderr is reported as diagnostics.
#[derive(Debug, Clone)]
pub struct DxcShaderCompiler {
    executable: PathBuf,
    extra_args: Vec<String>,
}

impl Default for DxcShaderCompiler {
    fn default() -> Self {
        Self::new("dxc")
    }
}

impl DxcShaderCompiler {
    pub fn new<P: Into<PathBuf>>(executable: P) -> Self {
        Self {
            executable: executable.into(),
            extra_args: Vec::new(),
        }
    }

    /// Adds arguments passed to every invocation, e.g. `-Zi` or `-spirv`
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    fn fail(request: &ShaderCompileRequest<'_>, message: impl std::fmt::Display) -> ShaderCompileFailure {
        ShaderCompileFailure {
            diagnostics: format!("{}: {message}", request.name),
        }
    }
}

impl ShaderCompiler for DxcShaderCompiler {
    fn compile(&self, request: &ShaderCompileRequest<'_>) -> Result<CompiledShader, ShaderCompileFailure> {
        let mut input = tempfile::Builder::new()
            .prefix(request.name)
            .suffix(".hlsl")
            .tempfile()
            .map_err(|e| Self::fail(request, format!("cannot create source file: {e}")))?;
        input
            .write_all(request.source.as_bytes())
            .map_err(|e| Self::fail(request, format!("cannot write source file: {e}")))?;

        let output_path = input.path().with_extension("cso");
        let output = Command::new(&self.executable)
            .args(["-T", request.profile])
            .args(["-E", request.entry_point])
            .args(&self.extra_args)
            .arg(input.path())
            .arg("-Fo")
            .arg(&output_path)
            .output()
            .map_err(|e| Self::fail(request, format!("cannot run {}: {e}", self.executable.display())))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            let _ = std::fs::remove_file(&output_path);
            return Err(ShaderCompileFailure {
                diagnostics: if stderr.is_empty() { format!("{}: dxc exited with {}", request.name, output.status) } else { stderr },
            });
        }

        let bytecode = std::fs::read(&output_path).map_err(|e| Self::fail(request, format!("cannot read compiled shader: {e}")))?;
        let _ = std::fs::remove_file(&output_path);

        Ok(CompiledShader {
            bytecode,
            diagnostics: (!stderr.is_empty()).then_some(stderr),
        })
    }
}
