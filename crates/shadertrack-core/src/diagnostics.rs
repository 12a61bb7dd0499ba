use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

/// A diagnostic message about one shader source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: PathBuf,
    pub message: String,
}

impl Diagnostic {
    pub fn error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn warning(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn info(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Trait for handling diagnostics
/// Compiler output is routed here; callers decide where it ends up
pub trait DiagnosticHandler: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);

    fn error(&self, path: &Path, message: &str) {
        self.report(Diagnostic::error(path, message));
    }

    fn warning(&self, path: &Path, message: &str) {
        self.report(Diagnostic::warning(path, message));
    }

    fn info(&self, path: &Path, message: &str) {
        self.report(Diagnostic::info(path, message));
    }

    fn has_errors(&self) -> bool;
    fn error_count(&self) -> usize;
    fn warning_count(&self) -> usize;
    fn get_diagnostics(&self) -> Vec<Diagnostic>;
}

fn count_level(diagnostics: &Mutex<Vec<Diagnostic>>, level: DiagnosticLevel) -> usize {
    diagnostics
        .lock()
        .unwrap()
        .iter()
        .filter(|d| d.level == level)
        .count()
}

/// Console-based diagnostic handler that prints to stderr
pub struct ConsoleDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
    pretty: bool,
}

impl ConsoleDiagnosticHandler {
    pub fn new(pretty: bool) -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            pretty,
        }
    }

    fn render(&self, diagnostic: &Diagnostic) -> String {
        let level_str = match diagnostic.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Info => "info",
        };

        if self.pretty {
            format!(
                "\x1b[1m{}\x1b[0m in {}: {}",
                level_str,
                diagnostic.path.display(),
                diagnostic.message
            )
        } else {
            format!(
                "{} in {}: {}",
                level_str,
                diagnostic.path.display(),
                diagnostic.message
            )
        }
    }
}

impl DiagnosticHandler for ConsoleDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        eprintln!("{}", self.render(&diagnostic));
        self.diagnostics.lock().unwrap().push(diagnostic);
    }

    fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn error_count(&self) -> usize {
        count_level(&self.diagnostics, DiagnosticLevel::Error)
    }

    fn warning_count(&self) -> usize {
        count_level(&self.diagnostics, DiagnosticLevel::Warning)
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }
}

/// Collecting diagnostic handler for testing
/// Collects all diagnostics without printing
pub struct CollectingDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnosticHandler {
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
        }
    }
}

impl Default for CollectingDiagnosticHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticHandler for CollectingDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().unwrap().push(diagnostic);
    }

    fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn error_count(&self) -> usize {
        count_level(&self.diagnostics, DiagnosticLevel::Error)
    }

    fn warning_count(&self) -> usize {
        count_level(&self.diagnostics, DiagnosticLevel::Warning)
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }
}
