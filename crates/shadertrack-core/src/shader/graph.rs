use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::errors::{Result, ScanError};

use super::{IncludeScanner, PathResolver, SourcePath};

/// Requested shaders ("includers") and the files they transitively include
///
/// Edges always run from a requested shader to one of its transitive
/// includes. The reverse map is the transpose of the forward map; both are
/// only written by [`DependencyGraph::register_edge`]. Iteration follows
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    includers: IndexSet<SourcePath>,
    includees: IndexSet<SourcePath>,
    forward: IndexMap<SourcePath, IndexSet<SourcePath>>,
    reverse: IndexMap<SourcePath, IndexSet<SourcePath>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_includer(&mut self, path: &SourcePath) {
        if !self.includers.contains(path) {
            self.includers.insert(path.clone());
        }
    }

    pub fn register_includee(&mut self, path: &SourcePath) {
        if !self.includees.contains(path) {
            self.includees.insert(path.clone());
        }
    }

    pub fn register_edge(&mut self, includer: &SourcePath, includee: &SourcePath) {
        self.forward
            .entry(includer.clone())
            .or_default()
            .insert(includee.clone());
        self.reverse
            .entry(includee.clone())
            .or_default()
            .insert(includer.clone());
    }

    pub fn is_tracked_includer(&self, path: &SourcePath) -> bool {
        self.includers.contains(path)
    }

    pub fn is_tracked_includee(&self, path: &SourcePath) -> bool {
        self.includees.contains(path)
    }

    /// Requested shaders that (transitively) include `includee`
    pub fn includers_of(&self, includee: &SourcePath) -> impl Iterator<Item = &SourcePath> + '_ {
        self.reverse.get(includee).into_iter().flatten()
    }

    /// Every file `includer` transitively includes
    pub fn includees_of(&self, includer: &SourcePath) -> impl Iterator<Item = &SourcePath> + '_ {
        self.forward.get(includer).into_iter().flatten()
    }

    pub fn all_tracked_includers(&self) -> impl Iterator<Item = &SourcePath> + '_ {
        self.includers.iter()
    }

    pub fn all_tracked_includees(&self) -> impl Iterator<Item = &SourcePath> + '_ {
        self.includees.iter()
    }

    /// Includers followed by includees that are not includers themselves
    pub fn tracked_files(&self) -> impl Iterator<Item = &SourcePath> + '_ {
        self.includers.iter().chain(
            self.includees
                .iter()
                .filter(move |p| !self.includers.contains(*p)),
        )
    }

    pub fn includer_count(&self) -> usize {
        self.includers.len()
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(IndexSet::len).sum()
    }

    /// Scan `root` and register it with its transitive includes
    ///
    /// Returns `false` without touching the file system if `root` is already
    /// tracked. Nothing is registered when the scan fails.
    pub fn scan_includer(&mut self, root: &SourcePath, ctx: &ScanContext<'_>) -> Result<bool> {
        if self.is_tracked_includer(root) {
            return Ok(false);
        }

        let mut walker = IncludeWalker::new(ctx);
        walker.walk(root, 0)?;

        self.register_includer(root);
        for includee in walker.visited.iter().filter(|p| *p != root) {
            self.register_includee(includee);
            self.register_edge(root, includee);
        }

        debug!(
            "Tracking {} with {} include(s)",
            root,
            self.includees_of(root).count()
        );
        Ok(true)
    }
}

/// Collaborators and limits for scanning include trees
pub struct ScanContext<'a> {
    pub resolver: &'a PathResolver,
    pub scanner: &'a IncludeScanner,
    pub include_dirs: &'a [PathBuf],
    pub max_depth: u32,
}

struct IncludeWalker<'a, 'c> {
    ctx: &'c ScanContext<'a>,
    chain: Vec<SourcePath>,
    /// Deepest level each file has been fully walked at
    walked: FxHashMap<SourcePath, u32>,
    visited: IndexSet<SourcePath>,
}

impl<'a, 'c> IncludeWalker<'a, 'c> {
    fn new(ctx: &'c ScanContext<'a>) -> Self {
        Self {
            ctx,
            chain: Vec::new(),
            walked: FxHashMap::default(),
            visited: IndexSet::new(),
        }
    }

    fn chain_to(&self, file: &SourcePath) -> Vec<PathBuf> {
        self.chain
            .iter()
            .chain(std::iter::once(file))
            .map(|p| p.as_path().to_path_buf())
            .collect()
    }

    fn walk(&mut self, file: &SourcePath, depth: u32) -> Result<()> {
        if self.chain.contains(file) {
            return Err(ScanError::CircularInclude {
                chain: self.chain_to(file),
            }
            .into());
        }
        if depth > self.ctx.max_depth {
            return Err(ScanError::DepthExceeded {
                max_depth: self.ctx.max_depth,
                chain: self.chain_to(file),
            }
            .into());
        }
        // A subtree that fit below a deeper position also fits here
        if self.walked.get(file).is_some_and(|&d| d >= depth) {
            return Ok(());
        }

        let directives = self.ctx.scanner.scan_direct_includes(file)?;
        self.chain.push(file.clone());

        for literal in directives.iter() {
            let includee = self.locate(file, literal)?;
            self.visited.insert(includee.clone());

            if !self.ctx.scanner.file_system().exists(includee.as_path()) {
                if depth + 1 > self.ctx.max_depth {
                    return Err(ScanError::DepthExceeded {
                        max_depth: self.ctx.max_depth,
                        chain: self.chain_to(&includee),
                    }
                    .into());
                }
                warn!("Include \"{}\" of {} not found", literal, file);
                continue;
            }
            self.walk(&includee, depth + 1)?;
        }

        self.chain.pop();
        self.walked.insert(file.clone(), depth);
        Ok(())
    }

    /// First existing candidate, or the includer-relative one if none exists
    fn locate(&self, includer: &SourcePath, literal: &str) -> Result<SourcePath> {
        let mut candidates = self
            .ctx
            .resolver
            .include_candidates(includer, literal, self.ctx.include_dirs)?;

        let fs = self.ctx.scanner.file_system();
        match candidates.iter().position(|c| fs.exists(c.as_path())) {
            Some(index) => Ok(candidates.swap_remove(index)),
            None => Ok(candidates.swap_remove(0)),
        }
    }
}
