use clap::Parser;
use rustc_hash::FxHashSet;
use shadertrack_core::config::{CliOverrides, ShaderConfig};
use shadertrack_core::di::Container;
use shadertrack_core::shader::{normalize, PassReport, ShaderManager, SourcePath};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_FILE_NAME: &str = "shadertrack.yaml";

/// shadertrack - Incremental GLSL compiler that tracks #include dependencies
#[derive(Parser, Debug, Clone)]
#[command(name = "shadertrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Shader files to compile
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Path to shadertrack.yaml (or .json) configuration file
    #[arg(short, long, value_name = "FILE")]
    project: Option<PathBuf>,

    /// Maximum #include nesting below a requested shader
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Shader compiler executable (default: glslc)
    #[arg(long, value_name = "EXE")]
    compiler: Option<PathBuf>,

    /// Additional include directory
    #[arg(short = 'I', value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Preprocessor definition (NAME or NAME=VALUE)
    #[arg(short = 'D', value_name = "DEF")]
    definitions: Vec<String>,

    /// Shader entry point
    #[arg(long, value_name = "NAME")]
    entry_point: Option<String>,

    /// SPIR-V version to target (e.g. spv1.5)
    #[arg(long, value_name = "VERSION")]
    target_spv: Option<String>,

    /// Compile without optimizations
    #[arg(long)]
    no_optimize: bool,

    /// Compile stale shaders in parallel
    #[arg(long)]
    parallel: bool,

    /// Print compiler diagnostics without ANSI styling
    #[arg(long)]
    no_pretty: bool,

    /// Watch shader sources and their includes for changes
    #[arg(short, long)]
    watch: bool,

    /// Initialize a new shadertrack project
    #[arg(long)]
    init: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    // Set RUST_LOG=debug for detailed logs, RUST_LOG=info for normal output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    if cli.init {
        init_project()?;
        return Ok(());
    }

    let (config, files) = load_config_and_files(&cli)?;

    if files.is_empty() {
        eprintln!("Error: No input files specified. Use --help for usage information.");
        std::process::exit(1);
    }

    info!("Input files: {} file(s)", files.len());
    debug!("Maximum include depth: {}", config.manager.max_recursion_depth);
    debug!("Watch mode: {}", cli.watch);

    let container = Container::new(config);
    let mut manager = ShaderManager::new(&container);

    if cli.watch {
        watch_mode(&mut manager, &files)?;
    } else if !compile(&mut manager, &files) {
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize a new project with a configuration file and sample shaders
fn init_project() -> anyhow::Result<()> {
    println!("Initializing new shadertrack project...");

    ShaderConfig::init_file(Path::new(CONFIG_FILE_NAME))
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", CONFIG_FILE_NAME, e))?;
    println!("Created {}", CONFIG_FILE_NAME);

    std::fs::create_dir_all("shaders")?;
    println!("Created shaders/ directory");

    let common = r#"// Shared helpers, included by the sample shaders
vec3 tone_map(vec3 color) {
    return color / (color + vec3(1.0));
}
"#;
    std::fs::write("shaders/common.glsl", common)?;

    let fragment = r#"#version 460
#include "common.glsl"

layout(location = 0) in vec3 in_color;
layout(location = 0) out vec4 out_color;

void main() {
    out_color = vec4(tone_map(in_color), 1.0);
}
"#;
    std::fs::write("shaders/main.frag", fragment)?;
    println!("Created shaders/main.frag");

    println!("\nProject initialized successfully!");
    println!("Run 'shadertrack' to compile, or 'shadertrack --watch' to recompile on change.");

    Ok(())
}

/// Load configuration from file (if specified) and resolve input files
fn load_config_and_files(cli: &Cli) -> anyhow::Result<(ShaderConfig, Vec<PathBuf>)> {
    let mut config = if let Some(ref project_path) = cli.project {
        ShaderConfig::from_file(project_path)
            .map_err(|e| anyhow::anyhow!("Failed to load config file: {}", e))?
    } else {
        let default_path = PathBuf::from(CONFIG_FILE_NAME);
        if default_path.exists() {
            ShaderConfig::from_file(&default_path)
                .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", CONFIG_FILE_NAME, e))?
        } else {
            ShaderConfig::default()
        }
    };

    let overrides = CliOverrides {
        max_recursion_depth: cli.max_depth,
        parallel_compile: cli.parallel.then_some(true),
        pretty: cli.no_pretty.then_some(false),
        executable: cli.compiler.clone(),
        target_spv: cli.target_spv.clone(),
        optimize: cli.no_optimize.then_some(false),
        include_dirs: cli.include_dirs.clone(),
        definitions: cli.definitions.clone(),
        entry_point: cli.entry_point.clone(),
    };
    config.merge(&overrides);

    let files = if !cli.files.is_empty() {
        cli.files.clone()
    } else {
        expand_patterns(&config.shaders)?
    };

    Ok((config, files))
}

/// Expand the configuration's glob patterns, skipping duplicates
fn expand_patterns(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut seen = FxHashSet::default();
    let mut files = Vec::new();

    for pattern in patterns {
        let entries = glob::glob(pattern)
            .map_err(|e| anyhow::anyhow!("Invalid shader pattern '{}': {}", pattern, e))?;

        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    if seen.insert(path.clone()) {
                        files.push(path);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable path: {}", e),
            }
        }
    }

    Ok(files)
}

/// Track every input, run one check pass and report the outcome
///
/// Returns `false` if any input could not be tracked or failed to compile.
fn compile(manager: &mut ShaderManager, files: &[PathBuf]) -> bool {
    let mut success = true;
    let mut requested: Vec<SourcePath> = Vec::new();

    for file in files {
        match manager.track(file) {
            Ok(source) => requested.push(source),
            Err(e) => {
                eprintln!("error: {}: {}", file.display(), e);
                success = false;
            }
        }
    }

    let report = manager.check_and_update_shaders();
    print_report(&report, requested.len());

    let failed = requested
        .iter()
        .filter(|source| manager.failed_compiles().contains_key(*source))
        .count();
    if failed > 0 {
        eprintln!("{} shader(s) failed to compile", failed);
        success = false;
    }

    success
}

fn print_report(report: &PassReport, requested: usize) {
    for source in &report.recompiled {
        println!("Compiled {}", source);
    }
    for source in &report.failed {
        println!("Failed {}", source);
    }
    if report.is_empty() {
        println!("All {} shader(s) up to date", requested);
    }
}

/// Directories that must be watched to see every tracked file change
fn watch_dirs(manager: &ShaderManager) -> FxHashSet<PathBuf> {
    manager
        .tracked_files()
        .map(|file| file.directory().to_path_buf())
        .collect()
}

fn watch_mode(manager: &mut ShaderManager, files: &[PathBuf]) -> anyhow::Result<()> {
    use notify::{
        event::{EventKind, ModifyKind},
        Event, RecursiveMode, Watcher,
    };
    use std::sync::mpsc::channel;
    use std::time::Duration;

    println!("Watching for changes... (Press Ctrl+C to stop)");

    println!("\nInitial compilation:");
    compile(manager, files);

    let (tx, rx) = channel();

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    // Editors often replace files on save, so watch directories
    for dir in watch_dirs(manager) {
        if dir.is_dir() {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            debug!("Watching {}", dir.display());
        }
    }

    let mut last_compile = std::time::Instant::now();
    let debounce_duration = Duration::from_millis(100);
    // Set by changes that arrive inside the debounce window
    let mut pending = false;

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                let should_recompile = matches!(
                    event.kind,
                    EventKind::Modify(ModifyKind::Data(_))
                        | EventKind::Modify(ModifyKind::Any)
                        | EventKind::Modify(ModifyKind::Name(_))
                        | EventKind::Create(_)
                );
                if should_recompile {
                    let changed_our_files =
                        event.paths.iter().map(|path| normalize(path)).any(|path| {
                            manager
                                .tracked_files()
                                .any(|file| file.as_path() == path.as_path())
                        });
                    pending |= changed_our_files;
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                return Err(anyhow::anyhow!("File watcher disconnected"));
            }
        }

        if pending && last_compile.elapsed() >= debounce_duration {
            println!("\n\nFile changed, recompiling...");
            let report = manager.check_and_update_shaders();
            print_report(&report, manager.graph().includer_count());
            last_compile = std::time::Instant::now();
            pending = false;
        }
    }
}
