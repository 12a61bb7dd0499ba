use shadertrack_core::config::ShaderConfig;
use shadertrack_core::diagnostics::DiagnosticHandler;
use shadertrack_core::errors::{ScanError, ShaderError};
use shadertrack_core::shader::SourcePath;
use shadertrack_test_helpers::compile::TestBench;
use shadertrack_test_helpers::fixtures::{
    broken_shader, common_include, include_chain, include_line, main_shader, standalone_shader,
};
use std::path::{Path, PathBuf};

fn bench_with_depth(max_depth: u32) -> TestBench {
    let mut config = ShaderConfig::default();
    config.manager.max_recursion_depth = max_depth;
    TestBench::with_config(config)
}

fn write_chain(bench: &TestBench, root: &str, depth: u32) {
    for (path, contents) in include_chain(root, depth) {
        bench.write(&path, &contents);
    }
}

fn includees(bench: &mut TestBench, relative: &str) -> Vec<PathBuf> {
    let root = bench.manager.track(Path::new(relative)).unwrap();
    bench
        .manager
        .graph()
        .includees_of(&root)
        .map(|p| p.as_path().to_path_buf())
        .collect()
}

// ============================================================================
// Dependency Scanning Tests
// ============================================================================

#[test]
fn test_scan_is_idempotent() {
    let mut bench = TestBench::new();
    bench.write("main.glsl", main_shader());
    bench.write("common.glsl", common_include());

    bench.manager.track(Path::new("main.glsl")).unwrap();
    let before = bench.manager.graph().clone();

    bench.write("main.glsl", &include_line("other.glsl"));
    bench.manager.track(Path::new("main.glsl")).unwrap();

    assert_eq!(bench.manager.graph(), &before);
}

#[test]
fn test_transitive_closure_is_tracked() {
    let mut bench = TestBench::new();
    bench.write("main.frag", &include_line("b.glsl"));
    bench.write("b.glsl", &include_line("lib/c.glsl"));
    bench.write("lib/c.glsl", "float c;\n");

    let root = bench.manager.track(Path::new("main.frag")).unwrap();
    let graph = bench.manager.graph();

    let deep = graph
        .all_tracked_includees()
        .find(|p| p.as_path() == Path::new("/shaders/lib/c.glsl"))
        .cloned()
        .expect("lib/c.glsl should be tracked");
    assert!(graph.includers_of(&deep).any(|p| *p == root));
    assert_eq!(graph.includees_of(&root).count(), 2);
}

#[test]
fn test_spellings_of_same_file_are_one_includee() {
    let mut bench = TestBench::new();
    bench.write(
        "passes/main.frag",
        "#include \"../common.glsl\"\n#include \"./../common.glsl\"\n",
    );
    bench.write("common.glsl", common_include());

    assert_eq!(
        includees(&mut bench, "passes/main.frag"),
        vec![PathBuf::from("/shaders/common.glsl")]
    );
}

#[test]
fn test_include_dirs_are_searched() {
    let mut config = ShaderConfig::default();
    config.compiler.include_dirs = vec![PathBuf::from("lib")];
    let mut bench = TestBench::with_config(config);

    bench.write("passes/main.frag", &include_line("noise.glsl"));
    bench.write("lib/noise.glsl", "float noise(vec2 p);\n");

    bench.request("passes/main.frag").unwrap();
    bench.touch("lib/noise.glsl");
    bench.request("passes/main.frag").unwrap();

    assert_eq!(bench.compile_count("passes/main.frag"), 2);
}

#[test]
fn test_circular_include_fails_scan() {
    let mut bench = TestBench::new();
    bench.write("main.frag", &include_line("a.glsl"));
    bench.write("a.glsl", &include_line("b.glsl"));
    bench.write("b.glsl", &include_line("a.glsl"));

    let err = bench.request("main.frag").unwrap_err();
    assert!(matches!(
        err,
        ShaderError::DependencyScan(ScanError::CircularInclude { .. })
    ));
    assert_eq!(bench.manager.graph().includer_count(), 0);
    assert_eq!(bench.compiler.invocation_count(), 0);
}

// ============================================================================
// Depth Bound Tests
// ============================================================================

#[test]
fn test_chain_at_max_depth_is_accepted() {
    let mut bench = TestBench::new();
    write_chain(&bench, "main.frag", 10);

    assert!(bench.request("main.frag").is_ok());
    assert_eq!(includees(&mut bench, "main.frag").len(), 10);
}

#[test]
fn test_chain_beyond_max_depth_is_rejected() {
    let mut bench = TestBench::new();
    write_chain(&bench, "main.frag", 11);

    match bench.request("main.frag").unwrap_err() {
        ShaderError::DependencyScan(ScanError::DepthExceeded { max_depth, chain }) => {
            assert_eq!(max_depth, 10);
            assert_eq!(chain.len(), 12);
            assert_eq!(chain[0], PathBuf::from("/shaders/main.frag"));
        }
        other => panic!("expected depth error, got {other:?}"),
    }
    assert_eq!(bench.manager.graph().includer_count(), 0);
    assert_eq!(bench.compiler.invocation_count(), 0);
}

#[test]
fn test_missing_include_beyond_max_depth_is_rejected() {
    let mut bench = bench_with_depth(1);
    bench.write("main.frag", &include_line("level1.glsl"));
    bench.write("level1.glsl", &include_line("absent.glsl"));

    match bench.request("main.frag").unwrap_err() {
        ShaderError::DependencyScan(ScanError::DepthExceeded { chain, .. }) => {
            assert_eq!(chain.last(), Some(&PathBuf::from("/shaders/absent.glsl")));
        }
        other => panic!("expected depth error, got {other:?}"),
    }
    assert_eq!(bench.manager.graph().includer_count(), 0);
}

#[test]
fn test_configured_depth_bound() {
    let mut bench = bench_with_depth(2);
    write_chain(&bench, "ok.frag", 2);
    assert!(bench.request("ok.frag").is_ok());

    write_chain(&bench, "deep.frag", 3);
    assert!(bench.request("deep.frag").is_err());
}

// ============================================================================
// Recompilation Tests
// ============================================================================

#[test]
fn test_includee_change_propagates() {
    let mut bench = TestBench::new();
    bench.write("main.frag", &include_line("b.glsl"));
    bench.write("b.glsl", &include_line("c.glsl"));
    bench.write("c.glsl", "float c;\n");
    bench.request("main.frag").unwrap();

    bench.touch("c.glsl");
    let report = bench.manager.check_and_update_shaders();

    assert!(report.any_recompiled());
    assert!(bench
        .manager
        .has_recompiled_since_last_check(Path::new("main.frag")));
    assert_eq!(bench.compile_count("main.frag"), 2);
}

#[test]
fn test_shared_includee_recompiles_every_includer() {
    let mut bench = TestBench::new();
    bench.write("a.frag", &include_line("common.glsl"));
    bench.write("b.frag", &include_line("common.glsl"));
    bench.write("c.frag", standalone_shader());
    bench.write("common.glsl", common_include());
    for shader in ["a.frag", "b.frag", "c.frag"] {
        bench.request(shader).unwrap();
    }

    bench.touch("common.glsl");
    let report = bench.manager.check_and_update_shaders();

    let recompiled: Vec<_> = report
        .recompiled
        .iter()
        .map(SourcePath::as_path)
        .collect();
    assert_eq!(
        recompiled,
        vec![Path::new("/shaders/a.frag"), Path::new("/shaders/b.frag")]
    );
    assert!(!bench
        .manager
        .has_recompiled_since_last_check(Path::new("c.frag")));
}

#[test]
fn test_recompiled_set_only_covers_last_pass() {
    let mut bench = TestBench::new();
    bench.write("main.frag", standalone_shader());
    bench.request("main.frag").unwrap();
    assert!(bench
        .manager
        .has_recompiled_since_last_check(Path::new("main.frag")));

    let report = bench.manager.check_and_update_shaders();
    assert!(report.is_empty());
    assert!(!bench
        .manager
        .has_recompiled_since_last_check(Path::new("main.frag")));
}

#[test]
fn test_request_refreshes_other_shaders() {
    let mut bench = TestBench::new();
    bench.write("a.frag", standalone_shader());
    bench.write("b.frag", standalone_shader());
    bench.request("a.frag").unwrap();
    bench.request("b.frag").unwrap();

    bench.touch("b.frag");
    bench.request("a.frag").unwrap();

    assert_eq!(bench.compile_count("b.frag"), 2);
    assert_eq!(bench.compile_count("a.frag"), 1);
}

#[test]
fn test_missing_artifact_is_rebuilt() {
    let mut bench = TestBench::new();
    bench.write("main.frag", standalone_shader());
    bench.request("main.frag").unwrap();

    bench.fs.remove_file(&bench.path("main.frag.spv"));
    bench.request("main.frag").unwrap();

    assert_eq!(bench.compile_count("main.frag"), 2);
}

// ============================================================================
// Failure Handling Tests
// ============================================================================

#[test]
fn test_failed_shader_is_not_retried_without_changes() {
    let mut bench = TestBench::new();
    bench.write("main.frag", broken_shader());

    assert!(matches!(
        bench.request("main.frag"),
        Err(ShaderError::Compile { .. })
    ));
    assert!(matches!(
        bench.request("main.frag"),
        Err(ShaderError::Compile { .. })
    ));
    assert!(!bench.manager.check_and_update_shaders().any_recompiled());

    assert_eq!(bench.compile_count("main.frag"), 1);
    assert!(bench.diagnostics.get_diagnostics().iter().any(|d| d.message.contains("#error")));
}

#[test]
fn test_failed_shader_recovers_after_fix() {
    let mut bench = TestBench::new();
    bench.write("main.frag", broken_shader());
    assert!(bench.request("main.frag").is_err());

    bench.write("main.frag", standalone_shader());
    let text = bench.request_text("main.frag").unwrap();

    assert!(text.starts_with("SPIRV:"));
    assert!(bench.manager.failed_compiles().is_empty());
}

#[test]
fn test_includee_change_retries_failed_shader() {
    let mut bench = TestBench::new();
    bench.write("main.frag", &include_line("common.glsl"));
    bench.write("common.glsl", common_include());
    bench.compiler.fail_on(bench.path("main.frag"));

    assert!(bench.request("main.frag").is_err());
    bench.touch("common.glsl");
    assert!(bench.request("main.frag").is_err());
    assert_eq!(bench.compile_count("main.frag"), 2);

    bench.compiler.succeed_on(&bench.path("main.frag"));
    assert!(bench.request("main.frag").is_err(), "nothing changed since the failure");

    bench.touch("common.glsl");
    assert!(bench.request("main.frag").is_ok());
    assert_eq!(bench.compile_count("main.frag"), 3);
}

#[test]
fn test_failing_shader_does_not_affect_others() {
    let mut bench = TestBench::new();
    bench.write("bad.frag", broken_shader());
    bench.write("good.frag", standalone_shader());

    assert!(bench.request("bad.frag").is_err());
    assert!(bench.request("good.frag").is_ok());
    assert!(bench.request("bad.frag").is_err());
}

#[test]
fn test_missing_includee_created_later() {
    let mut bench = TestBench::new();
    bench.write("main.frag", &include_line("generated.glsl"));
    bench.compiler.fail_on(bench.path("main.frag"));
    assert!(bench.request("main.frag").is_err());

    // A missing input is not a change for a failed shader
    assert!(bench.request("main.frag").is_err());
    assert_eq!(bench.compile_count("main.frag"), 1);

    bench.compiler.succeed_on(&bench.path("main.frag"));
    bench.write("generated.glsl", "float generated;\n");
    assert!(bench.request("main.frag").is_ok());
}

#[test]
fn test_absent_optional_include_does_not_force_recompiles() {
    let mut bench = TestBench::new();
    bench.write(
        "main.frag",
        "#ifdef USE_SHADOWS\n#include \"shadows.glsl\"\n#endif\nvoid main() {}\n",
    );

    for _ in 0..3 {
        assert!(bench.request("main.frag").is_ok());
    }
    let report = bench.manager.check_and_update_shaders();

    assert!(report.is_empty());
    assert!(!bench.manager.has_recompiled_since_last_check(Path::new("main.frag")));
    assert_eq!(bench.compile_count("main.frag"), 1);

    // Once the include appears it counts like any other edit
    bench.write("shadows.glsl", "float shadow;\n");
    assert!(bench.request("main.frag").is_ok());
    assert_eq!(bench.compile_count("main.frag"), 2);
}

#[test]
fn test_missing_shader_request_fails() {
    let mut bench = TestBench::new();

    assert!(matches!(
        bench.request("missing.frag"),
        Err(ShaderError::Io { .. })
    ));
}

// ============================================================================
// Parallel Compilation Tests
// ============================================================================

#[test]
fn test_parallel_compile_matches_sequential() {
    let run = |parallel: bool| {
        let mut config = ShaderConfig::default();
        config.manager.parallel_compile = parallel;
        let mut bench = TestBench::with_config(config);

        for name in ["a.frag", "b.frag", "c.frag", "d.frag"] {
            bench.write(name, &include_line("common.glsl"));
            bench.manager.track(Path::new(name)).unwrap();
        }
        bench.write("common.glsl", common_include());
        bench.compiler.fail_on(bench.path("c.frag"));

        bench.manager.check_and_update_shaders()
    };

    let sequential = run(false);
    let parallel = run(true);

    assert_eq!(sequential, parallel);
    assert_eq!(sequential.recompiled.len(), 3);
    assert_eq!(
        sequential.failed[0].as_path(),
        Path::new("/shaders/c.frag")
    );
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

#[test]
fn test_edit_compile_cycle() {
    let mut bench = TestBench::new();
    bench.write("main.glsl", main_shader());
    bench.write("common.glsl", common_include());

    // First request compiles
    let first = bench.request_text("main.glsl").unwrap();
    assert!(first.contains("#include \"common.glsl\""));
    assert_eq!(bench.compile_count("main.glsl"), 1);

    // Nothing changed
    bench.request("main.glsl").unwrap();
    assert_eq!(bench.compile_count("main.glsl"), 1);

    // Edit the include
    bench.write("common.glsl", "vec3 tone_map(vec3 c) { return c; }\n");
    bench.request("main.glsl").unwrap();
    assert_eq!(bench.compile_count("main.glsl"), 2);

    // Break the shader
    bench.write("main.glsl", broken_shader());
    assert!(bench.request("main.glsl").is_err());
    assert!(bench.request("main.glsl").is_err());
    assert_eq!(bench.compile_count("main.glsl"), 3);

    // Fix it
    bench.write("main.glsl", main_shader());
    assert!(bench.request("main.glsl").is_ok());
    assert_eq!(bench.compile_count("main.glsl"), 4);
}
