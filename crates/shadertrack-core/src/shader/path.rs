use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::errors::PathError;

/// Absolute, lexically normalized path of a shader source file
///
/// Two `SourcePath`s naming the same file through different spellings
/// (`a/./b`, `a/c/../b`, `a\b`) compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePath(PathBuf);

impl SourcePath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// Directory containing this file
    pub fn directory(&self) -> &Path {
        self.0.parent().unwrap_or(&self.0)
    }

    /// This path with `suffix` appended to the file name (`a.frag` + `.spv`)
    pub fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.0.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    }
}

impl AsRef<Path> for SourcePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Lexically normalize a path without touching the file system
///
/// Backslashes become separators, `.` segments are dropped and `..` removes
/// the preceding segment. `..` never climbs above the root of an absolute
/// path; leading `..` of a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let unified = path.to_string_lossy().replace('\\', "/");
    let mut out = PathBuf::new();
    let mut segments = 0usize;

    for component in Path::new(&unified).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if segments > 0 {
                    out.pop();
                    segments -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(name) => {
                out.push(name);
                segments += 1;
            }
        }
    }

    out
}

/// Turns user-supplied and include-relative paths into [`SourcePath`]s
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    base_dir: Option<PathBuf>,
}

impl PathResolver {
    /// Resolve relative paths against the process working directory
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Resolve relative paths against `base_dir` instead of the working directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn absolute(&self, path: &Path) -> Result<PathBuf, PathError> {
        if path.is_absolute() || path.has_root() {
            return Ok(path.to_path_buf());
        }
        let base = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(PathError::WorkingDirectory)?,
        };
        Ok(base.join(path))
    }

    pub fn resolve(&self, path: &Path) -> Result<SourcePath, PathError> {
        if path.as_os_str().is_empty() {
            return Err(PathError::Empty);
        }
        let absolute = self.absolute(path)?;
        Ok(SourcePath(normalize(&absolute)))
    }

    /// Resolve an include literal against the directory of the including file
    pub fn resolve_relative_to(
        &self,
        includer: &SourcePath,
        literal: &str,
    ) -> Result<SourcePath, PathError> {
        if literal.trim().is_empty() {
            return Err(PathError::EmptyInclude {
                includer: includer.as_path().to_path_buf(),
            });
        }
        let joined = includer.directory().join(literal);
        Ok(SourcePath(normalize(&joined)))
    }

    /// All locations an include literal may refer to, in search order
    ///
    /// The includer's own directory comes first, then each include directory.
    pub fn include_candidates(
        &self,
        includer: &SourcePath,
        literal: &str,
        include_dirs: &[PathBuf],
    ) -> Result<Vec<SourcePath>, PathError> {
        let mut candidates = vec![self.resolve_relative_to(includer, literal)?];

        for dir in include_dirs {
            let joined = self.absolute(dir)?.join(literal);
            let candidate = SourcePath(normalize(&joined));
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }

        Ok(candidates)
    }
}
