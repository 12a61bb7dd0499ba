use indexmap::IndexSet;
use rayon::prelude::*;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, warn};

use crate::config::CompilerOptions;
use crate::diagnostics::DiagnosticHandler;
use crate::fs::FileSystem;

use super::SourcePath;

/// Result of running the external compiler once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOutput {
    /// `None` if the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl CompilerOutput {
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// External shader compiler: turns one source file into one artifact
///
/// `Err` means the compiler could not be launched at all.
pub trait ShaderCompiler: Send + Sync {
    fn compile(&self, input: &Path, output: &Path) -> io::Result<CompilerOutput>;
}

impl<F> ShaderCompiler for F
where
    F: Fn(&Path, &Path) -> io::Result<CompilerOutput> + Send + Sync,
{
    fn compile(&self, input: &Path, output: &Path) -> io::Result<CompilerOutput> {
        self(input, output)
    }
}

/// Runs `glslc` (or a compatible executable) as a child process
#[derive(Debug, Clone)]
pub struct GlslcCompiler {
    executable: PathBuf,
    options: CompilerOptions,
}

impl GlslcCompiler {
    pub fn new(options: &CompilerOptions) -> Self {
        let executable = options
            .executable
            .clone()
            .unwrap_or_else(default_executable);
        Self {
            executable,
            options: options.clone(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments for compiling `input` into `output`
    pub fn command_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let options = &self.options;
        let mut args: Vec<OsString> = Vec::new();

        if let Some(ref env) = options.target_env {
            args.push(format!("--target-env={}", env).into());
        }
        args.push(format!("--target-spv={}", options.target_spv).into());
        args.push(if options.optimize { "-O" } else { "-O0" }.into());

        for dir in &options.include_dirs {
            args.push("-I".into());
            args.push(dir.as_os_str().to_os_string());
        }
        for definition in &options.definitions {
            args.push(format!("-D{}", definition).into());
        }
        if let Some(ref entry_point) = options.entry_point {
            args.push(format!("-fentry-point={}", entry_point).into());
        }
        args.extend(options.additional_options.iter().map(OsString::from));

        args.push("-o".into());
        args.push(output.as_os_str().to_os_string());
        args.push(input.as_os_str().to_os_string());
        args
    }
}

impl ShaderCompiler for GlslcCompiler {
    fn compile(&self, input: &Path, output: &Path) -> io::Result<CompilerOutput> {
        let result = Command::new(&self.executable)
            .args(self.command_args(input, output))
            .output()?;

        Ok(CompilerOutput {
            exit_code: result.status.code(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        })
    }
}

fn default_executable() -> PathBuf {
    let name = if cfg!(windows) { "glslc.exe" } else { "glslc" };
    match std::env::var_os("VULKAN_SDK") {
        Some(sdk) => PathBuf::from(sdk).join("bin").join(name),
        None => PathBuf::from(name),
    }
}

/// Outcome of compiling one stale shader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Succeeded,
    Failed { at: SystemTime, reason: String },
}

/// Invokes the compiler for stale shaders and classifies the result
pub struct CompilerDriver {
    compiler: Arc<dyn ShaderCompiler>,
    file_system: Arc<dyn FileSystem>,
    diagnostic_handler: Arc<dyn DiagnosticHandler>,
    artifact_suffix: String,
}

impl CompilerDriver {
    pub fn new(
        compiler: Arc<dyn ShaderCompiler>,
        file_system: Arc<dyn FileSystem>,
        diagnostic_handler: Arc<dyn DiagnosticHandler>,
        artifact_suffix: impl Into<String>,
    ) -> Self {
        Self {
            compiler,
            file_system,
            diagnostic_handler,
            artifact_suffix: artifact_suffix.into(),
        }
    }

    pub fn artifact_suffix(&self) -> &str {
        &self.artifact_suffix
    }

    pub fn artifact_path(&self, source: &SourcePath) -> PathBuf {
        source.with_suffix(&self.artifact_suffix)
    }

    /// Compile one shader
    ///
    /// A zero exit status only counts as success if the artifact exists
    /// afterwards. Failures are stamped with the file system clock.
    pub fn compile(&self, source: &SourcePath) -> CompileOutcome {
        let output = self.artifact_path(source);
        info!("Compiling {}", source);

        let reason = match self.compiler.compile(source.as_path(), &output) {
            Ok(result) if result.is_success() => {
                if self.file_system.exists(&output) {
                    if !result.stderr.trim().is_empty() {
                        self.diagnostic_handler
                            .warning(source.as_path(), result.stderr.trim());
                    }
                    info!("Compiled {}", source);
                    return CompileOutcome::Succeeded;
                }
                format!(
                    "compiler exited successfully but wrote no output to {}",
                    output.display()
                )
            }
            Ok(result) => {
                if !result.stderr.trim().is_empty() {
                    self.diagnostic_handler
                        .error(source.as_path(), result.stderr.trim());
                }
                match result.exit_code {
                    Some(code) => format!("compiler exited with status {}", code),
                    None => "compiler was terminated by a signal".to_string(),
                }
            }
            Err(e) => format!("failed to launch compiler: {}", e),
        };

        warn!("Failed to compile {}: {}", source, reason);
        self.diagnostic_handler.error(source.as_path(), &reason);
        CompileOutcome::Failed {
            at: self.file_system.now(),
            reason,
        }
    }

    /// Compile every shader in `stale`, returning outcomes in the same order
    ///
    /// With `parallel` set the compiles run on the rayon pool. Each compile
    /// only reads sources and writes its own artifact.
    pub fn compile_all(
        &self,
        stale: &IndexSet<SourcePath>,
        parallel: bool,
    ) -> Vec<(SourcePath, CompileOutcome)> {
        if parallel && stale.len() > 1 {
            let targets: Vec<&SourcePath> = stale.iter().collect();
            targets
                .par_iter()
                .map(|source| ((*source).clone(), self.compile(source)))
                .collect()
        } else {
            stale
                .iter()
                .map(|source| (source.clone(), self.compile(source)))
                .collect()
        }
    }
}
