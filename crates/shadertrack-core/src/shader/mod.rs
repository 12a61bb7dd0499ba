//! Shader dependency tracking and incremental recompilation
//!
//! Requested shaders are scanned once for their transitive `#include`
//! closure. Every check pass compares the sources of each requested shader
//! against its compiled artifact (or its last failed compile) and rebuilds
//! whatever is out of date.

mod compiler;
mod graph;
mod manager;
mod path;
mod scanner;
mod staleness;

pub use compiler::{CompileOutcome, CompilerDriver, CompilerOutput, GlslcCompiler, ShaderCompiler};
pub use graph::{DependencyGraph, ScanContext};
pub use manager::{PassReport, ShaderManager};
pub use path::{normalize, PathResolver, SourcePath};
pub use scanner::{parse_include_directives, IncludeDirectives, IncludeScanner};
pub use staleness::{FailedCompileRecord, StalenessEvaluator, WriteTimeLookup};
