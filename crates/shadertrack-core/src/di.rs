use crate::config::ShaderConfig;
use crate::diagnostics::{ConsoleDiagnosticHandler, DiagnosticHandler};
use crate::fs::{FileSystem, RealFileSystem};
use crate::shader::{GlslcCompiler, ShaderCompiler};
use std::sync::Arc;

/// Dependency injection container
/// Manages all shared dependencies and creates instances with proper wiring
pub struct Container {
    config: Arc<ShaderConfig>,
    diagnostic_handler: Arc<dyn DiagnosticHandler>,
    file_system: Arc<dyn FileSystem>,
    compiler: Arc<dyn ShaderCompiler>,
}

impl Container {
    /// Create a new container with production dependencies
    pub fn new(config: ShaderConfig) -> Self {
        let config = Arc::new(config);

        let diagnostic_handler = Arc::new(ConsoleDiagnosticHandler::new(config.manager.pretty));
        let file_system = Arc::new(RealFileSystem::new());
        let compiler = Arc::new(GlslcCompiler::new(&config.compiler));

        Container {
            config,
            diagnostic_handler,
            file_system,
            compiler,
        }
    }

    /// Create a container with custom dependencies (for testing)
    pub fn with_dependencies(
        config: ShaderConfig,
        diagnostic_handler: Arc<dyn DiagnosticHandler>,
        file_system: Arc<dyn FileSystem>,
        compiler: Arc<dyn ShaderCompiler>,
    ) -> Self {
        Container {
            config: Arc::new(config),
            diagnostic_handler,
            file_system,
            compiler,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Arc<ShaderConfig> {
        &self.config
    }

    /// Get the diagnostic handler
    pub fn diagnostic_handler(&self) -> &Arc<dyn DiagnosticHandler> {
        &self.diagnostic_handler
    }

    /// Get the file system
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.file_system
    }

    /// Get the external shader compiler
    pub fn compiler(&self) -> &Arc<dyn ShaderCompiler> {
        &self.compiler
    }

    /// Check if any errors have been reported
    pub fn has_errors(&self) -> bool {
        self.diagnostic_handler.has_errors()
    }

    /// Get the error count
    pub fn error_count(&self) -> usize {
        self.diagnostic_handler.error_count()
    }

    /// Get the warning count
    pub fn warning_count(&self) -> usize {
        self.diagnostic_handler.warning_count()
    }
}
