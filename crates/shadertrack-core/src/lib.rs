//! Include tracking and incremental recompilation for GLSL shaders.
//!
//! A [`ShaderManager`] hands out compiled SPIR-V for shader source files. The
//! first request for a file scans its `#include` closure; every request then
//! re-evaluates all tracked shaders against their sources and recompiles the
//! stale ones through an external compiler. A shader whose last compile failed
//! is only retried after one of its sources changes.

pub mod config;
pub mod di;
pub mod diagnostics;
pub mod errors;
pub mod fs;
pub mod shader;

pub use config::{CliOverrides, CompilerOptions, ManagerOptions, ShaderConfig};
pub use di::Container;
pub use diagnostics::{
    CollectingDiagnosticHandler, ConsoleDiagnosticHandler, Diagnostic, DiagnosticHandler,
    DiagnosticLevel,
};
pub use errors::{PathError, Result, ScanError, ShaderError};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use shader::{
    CompileOutcome, CompilerDriver, CompilerOutput, DependencyGraph, GlslcCompiler,
    IncludeScanner, PassReport, PathResolver, ShaderCompiler, ShaderManager, SourcePath,
    StalenessEvaluator,
};
