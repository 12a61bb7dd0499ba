use shadertrack_core::config::ShaderConfig;
use shadertrack_core::di::Container;
use shadertrack_core::diagnostics::{CollectingDiagnosticHandler, DiagnosticHandler};
use shadertrack_core::errors::ShaderError;
use shadertrack_core::fs::RealFileSystem;
use shadertrack_core::shader::{CompilerOutput, GlslcCompiler, PathResolver, ShaderManager};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn set_mtime(path: &Path, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

/// Manager over a temp directory whose compiler copies the source to the artifact
fn copying_manager(dir: &TempDir) -> (ShaderManager, Arc<AtomicUsize>) {
    let compiles = Arc::new(AtomicUsize::new(0));
    let counter = compiles.clone();
    let compiler = move |input: &Path, output: &Path| -> io::Result<CompilerOutput> {
        counter.fetch_add(1, Ordering::SeqCst);
        fs::copy(input, output)?;
        Ok(CompilerOutput::success())
    };

    let container = Container::with_dependencies(
        ShaderConfig::default(),
        Arc::new(CollectingDiagnosticHandler::new()),
        Arc::new(RealFileSystem::new()),
        Arc::new(compiler),
    );
    let manager = ShaderManager::with_resolver(&container, PathResolver::with_base_dir(dir.path()));
    (manager, compiles)
}

#[test]
fn test_artifact_written_next_to_source() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.frag"), "#include \"common.glsl\"\n").unwrap();
    fs::write(dir.path().join("common.glsl"), "float x;\n").unwrap();

    let (mut manager, compiles) = copying_manager(&dir);
    let binary = manager.request_binary(Path::new("main.frag")).unwrap();

    assert_eq!(binary, b"#include \"common.glsl\"\n");
    assert!(dir.path().join("main.frag.spv").exists());
    assert_eq!(compiles.load(Ordering::SeqCst), 1);
}

#[test]
fn test_newer_include_triggers_rebuild() {
    let dir = TempDir::new().unwrap();
    let main = dir.path().join("main.frag");
    let common = dir.path().join("common.glsl");
    fs::write(&main, "#include \"common.glsl\"\n").unwrap();
    fs::write(&common, "float x;\n").unwrap();

    let base = SystemTime::now() - Duration::from_secs(60);
    set_mtime(&main, base);
    set_mtime(&common, base);

    let (mut manager, compiles) = copying_manager(&dir);
    manager.request_binary(&main).unwrap();
    set_mtime(&dir.path().join("main.frag.spv"), base + Duration::from_secs(10));

    manager.request_binary(&main).unwrap();
    assert_eq!(compiles.load(Ordering::SeqCst), 1);

    set_mtime(&common, base + Duration::from_secs(20));
    manager.request_binary(&main).unwrap();
    assert_eq!(compiles.load(Ordering::SeqCst), 2);
    assert!(manager.has_recompiled_since_last_check(&main));
}

#[test]
fn test_missing_compiler_executable_fails_request() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.frag"), "void main() {}\n").unwrap();

    let mut config = ShaderConfig::default();
    config.compiler.executable = Some(dir.path().join("no-such-glslc"));
    let diagnostics = Arc::new(CollectingDiagnosticHandler::new());
    let compiler = Arc::new(GlslcCompiler::new(&config.compiler));
    let container = Container::with_dependencies(
        config,
        diagnostics.clone(),
        Arc::new(RealFileSystem::new()),
        compiler,
    );
    let mut manager = ShaderManager::with_resolver(&container, PathResolver::with_base_dir(dir.path()));

    let err = manager.request_binary(Path::new("main.frag")).unwrap_err();
    assert!(matches!(err, ShaderError::Compile { .. }));
    assert!(diagnostics.has_errors());
    assert_eq!(manager.failed_compiles().len(), 1);
}
