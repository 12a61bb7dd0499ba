//! Test wiring for the shader manager
//!
//! Builds a [`ShaderManager`] on top of an in-memory file system and a
//! scripted compiler, using proper DI through the Container.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use shadertrack_core::config::ShaderConfig;
use shadertrack_core::di::Container;
use shadertrack_core::diagnostics::CollectingDiagnosticHandler;
use shadertrack_core::errors::Result;
use shadertrack_core::fs::MockFileSystem;
use shadertrack_core::shader::{PathResolver, ShaderManager};

use crate::mocks::ScriptedCompiler;

/// Directory all relative test paths live under
pub const BASE_DIR: &str = "/shaders";

/// Create a container with mock file system, scripted compiler and
/// collecting diagnostics
pub fn create_test_container(
    config: ShaderConfig,
    file_system: Arc<MockFileSystem>,
    compiler: Arc<ScriptedCompiler>,
) -> (Container, Arc<CollectingDiagnosticHandler>) {
    let diagnostics = Arc::new(CollectingDiagnosticHandler::new());
    let container =
        Container::with_dependencies(config, diagnostics.clone(), file_system, compiler);
    (container, diagnostics)
}

/// A shader manager with everything it talks to exposed for assertions
pub struct TestBench {
    pub fs: Arc<MockFileSystem>,
    pub compiler: Arc<ScriptedCompiler>,
    pub diagnostics: Arc<CollectingDiagnosticHandler>,
    pub manager: ShaderManager,
}

impl TestBench {
    pub fn new() -> Self {
        Self::with_config(ShaderConfig::default())
    }

    pub fn with_config(config: ShaderConfig) -> Self {
        let fs = Arc::new(MockFileSystem::new());
        let compiler = ScriptedCompiler::new(fs.clone());
        let (container, diagnostics) =
            create_test_container(config, fs.clone(), compiler.clone());
        let manager = ShaderManager::with_resolver(&container, PathResolver::with_base_dir(BASE_DIR));

        Self {
            fs,
            compiler,
            diagnostics,
            manager,
        }
    }

    /// Absolute path of `relative` below [`BASE_DIR`]
    pub fn path(&self, relative: &str) -> PathBuf {
        Path::new(BASE_DIR).join(relative)
    }

    /// Write a file below [`BASE_DIR`], returning its modification time
    pub fn write(&self, relative: &str, contents: &str) -> SystemTime {
        self.fs.write_file(self.path(relative), contents)
    }

    pub fn touch(&self, relative: &str) -> Option<SystemTime> {
        self.fs.touch(&self.path(relative))
    }

    pub fn request(&mut self, relative: &str) -> Result<Vec<u8>> {
        self.manager.request_binary(Path::new(relative))
    }

    /// Request `relative` and decode the artifact written by the scripted compiler
    pub fn request_text(&mut self, relative: &str) -> Result<String> {
        let bytes = self.request(relative)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn compile_count(&self, relative: &str) -> usize {
        self.compiler.compile_count(&self.path(relative))
    }
}

impl Default for TestBench {
    fn default() -> Self {
        Self::new()
    }
}
