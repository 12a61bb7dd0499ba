use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use crate::fs::FileSystem;

use super::{DependencyGraph, SourcePath};

/// Requested shader -> time of its most recent failed compile
pub type FailedCompileRecord = FxHashMap<SourcePath, SystemTime>;

/// Memoized modification times for one evaluation pass
pub struct WriteTimeLookup<'a> {
    file_system: &'a dyn FileSystem,
    times: FxHashMap<PathBuf, Option<SystemTime>>,
}

impl<'a> WriteTimeLookup<'a> {
    pub fn new(file_system: &'a dyn FileSystem) -> Self {
        Self {
            file_system,
            times: FxHashMap::default(),
        }
    }

    pub fn get(&mut self, path: &Path) -> Option<SystemTime> {
        if let Some(time) = self.times.get(path) {
            return *time;
        }
        let time = self.file_system.modified(path);
        self.times.insert(path.to_path_buf(), time);
        time
    }
}

/// What a source modification time has to beat to make an includer stale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Threshold {
    /// Last compile failed at this time; only newer edits warrant a retry
    FailedAt(SystemTime),
    /// Artifact modification time, `None` if there is no artifact
    Artifact(Option<SystemTime>),
}

impl Threshold {
    fn is_exceeded_by(self, modified: Option<SystemTime>) -> bool {
        match (self, modified) {
            (Threshold::FailedAt(failed), Some(modified)) => modified > failed,
            // A missing input cannot have changed since the failure
            (Threshold::FailedAt(_), None) => false,
            (Threshold::Artifact(Some(artifact)), Some(modified)) => modified > artifact,
            // An absent include (e.g. behind a disabled #ifdef) is nothing new
            (Threshold::Artifact(Some(_)), None) => false,
            (Threshold::Artifact(None), _) => true,
        }
    }
}

/// Decides which requested shaders must be recompiled
pub struct StalenessEvaluator<'a> {
    graph: &'a DependencyGraph,
    failed: &'a FailedCompileRecord,
    file_system: &'a dyn FileSystem,
    artifact_suffix: &'a str,
}

impl<'a> StalenessEvaluator<'a> {
    pub fn new(
        graph: &'a DependencyGraph,
        failed: &'a FailedCompileRecord,
        file_system: &'a dyn FileSystem,
        artifact_suffix: &'a str,
    ) -> Self {
        Self {
            graph,
            failed,
            file_system,
            artifact_suffix,
        }
    }

    /// Compute every tracked includer that needs a rebuild, in tracking order
    ///
    /// Each tracked file's modification time is read once and fanned out to
    /// the includers it belongs to: the file itself if it was requested, plus
    /// everything that includes it. Each includer compares against its own
    /// threshold, so one edited include can mark several includers stale.
    pub fn compute_stale_includers(&self) -> IndexSet<SourcePath> {
        let mut lookup = WriteTimeLookup::new(self.file_system);

        let thresholds: FxHashMap<&SourcePath, Threshold> = self
            .graph
            .all_tracked_includers()
            .map(|includer| (includer, self.threshold(includer, &mut lookup)))
            .collect();

        let mut stale: FxHashSet<&SourcePath> = FxHashSet::default();

        for file in self.graph.tracked_files() {
            let affected: Vec<&SourcePath> = self
                .graph
                .is_tracked_includer(file)
                .then_some(file)
                .into_iter()
                .chain(self.graph.includers_of(file))
                .filter(|includer| !stale.contains(*includer))
                .collect();
            if affected.is_empty() {
                continue;
            }

            let modified = lookup.get(file.as_path());
            for includer in affected {
                let exceeded = thresholds
                    .get(includer)
                    .is_some_and(|threshold| threshold.is_exceeded_by(modified));
                if exceeded {
                    debug!("{} is stale because of {}", includer, file);
                    stale.insert(includer);
                }
            }
        }

        self.graph
            .all_tracked_includers()
            .filter(|includer| stale.contains(*includer))
            .cloned()
            .collect()
    }

    /// Whether a single includer needs a rebuild
    pub fn is_stale(&self, includer: &SourcePath) -> bool {
        let mut lookup = WriteTimeLookup::new(self.file_system);
        let threshold = self.threshold(includer, &mut lookup);

        std::iter::once(includer)
            .chain(self.graph.includees_of(includer))
            .any(|file| threshold.is_exceeded_by(lookup.get(file.as_path())))
    }

    fn threshold(&self, includer: &SourcePath, lookup: &mut WriteTimeLookup<'_>) -> Threshold {
        match self.failed.get(includer) {
            Some(&failed_at) => Threshold::FailedAt(failed_at),
            None => Threshold::Artifact(lookup.get(&includer.with_suffix(self.artifact_suffix))),
        }
    }
}
