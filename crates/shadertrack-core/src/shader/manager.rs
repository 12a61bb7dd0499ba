use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ManagerOptions;
use crate::di::Container;
use crate::errors::{Result, ShaderError};
use crate::fs::FileSystem;

use super::{
    CompileOutcome, CompilerDriver, DependencyGraph, FailedCompileRecord, IncludeScanner,
    PathResolver, ScanContext, SourcePath, StalenessEvaluator,
};

/// Shaders rebuilt and shaders that failed during one check pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub recompiled: Vec<SourcePath>,
    pub failed: Vec<SourcePath>,
}

impl PassReport {
    pub fn any_recompiled(&self) -> bool {
        !self.recompiled.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.recompiled.is_empty() && self.failed.is_empty()
    }
}

/// Hands out compiled shader binaries and keeps them up to date
///
/// Every request re-checks all tracked shaders, not just the requested one,
/// so a caller polling a single shader still refreshes the rest.
pub struct ShaderManager {
    /// Tracking and compile behavior
    options: ManagerOptions,

    /// Extra directories searched for include literals
    include_dirs: Vec<PathBuf>,

    resolver: PathResolver,
    scanner: IncludeScanner,
    driver: CompilerDriver,
    file_system: Arc<dyn FileSystem>,

    graph: DependencyGraph,

    /// Time of the last failed compile for each failing shader
    failed: FailedCompileRecord,

    /// Shaders rebuilt successfully during the most recent pass
    recompiled: FxHashSet<SourcePath>,
}

impl ShaderManager {
    /// Create a manager that resolves relative paths against the working directory
    pub fn new(container: &Container) -> Self {
        Self::with_resolver(container, PathResolver::new())
    }

    pub fn with_resolver(container: &Container, resolver: PathResolver) -> Self {
        let config = container.config();
        let file_system = container.file_system().clone();

        let driver = CompilerDriver::new(
            container.compiler().clone(),
            file_system.clone(),
            container.diagnostic_handler().clone(),
            config.manager.artifact_suffix.clone(),
        );

        Self {
            options: config.manager.clone(),
            include_dirs: config.compiler.include_dirs.clone(),
            resolver,
            scanner: IncludeScanner::new(file_system.clone()),
            driver,
            file_system,
            graph: DependencyGraph::new(),
            failed: FailedCompileRecord::default(),
            recompiled: FxHashSet::default(),
        }
    }

    /// Scan `path` and start tracking it without compiling anything
    ///
    /// Already tracked shaders are not rescanned.
    pub fn track(&mut self, path: &Path) -> Result<SourcePath> {
        let source = self.resolver.resolve(path)?;

        let ctx = ScanContext {
            resolver: &self.resolver,
            scanner: &self.scanner,
            include_dirs: &self.include_dirs,
            max_depth: self.options.max_recursion_depth,
        };
        if self.graph.scan_includer(&source, &ctx)? {
            info!("Tracking {}", source);
        }

        Ok(source)
    }

    /// Compiled binary for `path`, rebuilding anything out of date first
    ///
    /// Fails with [`ShaderError::Compile`] while the shader's last compile is
    /// the most recent relevant event. Other shaders failing does not affect
    /// this request.
    pub fn request_binary(&mut self, path: &Path) -> Result<Vec<u8>> {
        let source = self.track(path)?;
        self.check_and_update_shaders();

        if let Some(&failed_at) = self.failed.get(&source) {
            return Err(ShaderError::Compile {
                path: source.into_path_buf(),
                failed_at,
            });
        }

        let artifact = self.driver.artifact_path(&source);
        self.file_system
            .read(&artifact)
            .map_err(|source| ShaderError::Io {
                path: artifact,
                source,
            })
    }

    /// Rebuild every stale tracked shader
    ///
    /// The recompiled set only reflects this pass afterwards, even if nothing
    /// was stale.
    pub fn check_and_update_shaders(&mut self) -> PassReport {
        let stale = StalenessEvaluator::new(
            &self.graph,
            &self.failed,
            self.file_system.as_ref(),
            self.driver.artifact_suffix(),
        )
        .compute_stale_includers();

        if !stale.is_empty() {
            debug!("{} shader(s) out of date", stale.len());
        }
        let outcomes = self
            .driver
            .compile_all(&stale, self.options.parallel_compile);

        self.recompiled.clear();
        let mut report = PassReport::default();

        for (source, outcome) in outcomes {
            match outcome {
                CompileOutcome::Succeeded => {
                    self.failed.remove(&source);
                    self.recompiled.insert(source.clone());
                    report.recompiled.push(source);
                }
                CompileOutcome::Failed { at, .. } => {
                    self.failed.insert(source.clone(), at);
                    report.failed.push(source);
                }
            }
        }

        report
    }

    /// Whether `path` was rebuilt by the most recent check pass
    pub fn has_recompiled_since_last_check(&self, path: &Path) -> bool {
        self.resolver
            .resolve(path)
            .is_ok_and(|source| self.recompiled.contains(&source))
    }

    pub fn artifact_path(&self, path: &Path) -> Result<PathBuf> {
        let source = self.resolver.resolve(path)?;
        Ok(self.driver.artifact_path(&source))
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn failed_compiles(&self) -> &FailedCompileRecord {
        &self.failed
    }

    pub fn tracked_files(&self) -> impl Iterator<Item = &SourcePath> + '_ {
        self.graph.tracked_files()
    }
}
