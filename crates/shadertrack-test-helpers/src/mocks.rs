//! Mock implementations for testing

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use shadertrack_core::fs::{FileSystem, MockFileSystem};
use shadertrack_core::shader::{CompilerOutput, ShaderCompiler};

use crate::fixtures::FAIL_MARKER;

/// Compiler that works entirely inside a [`MockFileSystem`]
///
/// Successful compiles write `SPIRV:` followed by the source text to the
/// output path. A compile fails if the source contains [`FAIL_MARKER`] or its
/// path was registered with [`ScriptedCompiler::fail_on`].
#[derive(Debug)]
pub struct ScriptedCompiler {
    file_system: Arc<MockFileSystem>,
    failing: Mutex<HashSet<PathBuf>>,
    invocations: Mutex<Vec<PathBuf>>,
}

impl ScriptedCompiler {
    pub fn new(file_system: Arc<MockFileSystem>) -> Arc<Self> {
        Arc::new(Self {
            file_system,
            failing: Mutex::new(HashSet::new()),
            invocations: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_on(&self, input: impl Into<PathBuf>) {
        self.failing.lock().unwrap().insert(input.into());
    }

    pub fn succeed_on(&self, input: &Path) {
        self.failing.lock().unwrap().remove(input);
    }

    /// Every input path compiled so far, in call order
    pub fn invocations(&self) -> Vec<PathBuf> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    /// How often `input` was compiled
    pub fn compile_count(&self, input: &Path) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_path() == input)
            .count()
    }

    pub fn clear_invocations(&self) {
        self.invocations.lock().unwrap().clear();
    }
}

impl ShaderCompiler for ScriptedCompiler {
    fn compile(&self, input: &Path, output: &Path) -> io::Result<CompilerOutput> {
        self.invocations.lock().unwrap().push(input.to_path_buf());

        let source = match self.file_system.read_to_string(input) {
            Ok(source) => source,
            Err(e) => {
                return Ok(CompilerOutput::failure(
                    2,
                    format!("{}: error: {}", input.display(), e),
                ))
            }
        };

        if self.failing.lock().unwrap().contains(input) || source.contains(FAIL_MARKER) {
            return Ok(CompilerOutput::failure(
                1,
                format!("{}:2: error: '#error' : compilation terminated", input.display()),
            ));
        }

        self.file_system
            .write_file(output, format!("SPIRV:{}", source));
        Ok(CompilerOutput::success())
    }
}
