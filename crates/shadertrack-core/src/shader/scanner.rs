use std::sync::Arc;

use crate::errors::{Result, ShaderError};
use crate::fs::FileSystem;

use super::SourcePath;

/// Extracts `#include "literal"` directives from shader sources
///
/// Only the quoted, one-line form is recognized. The directive must be the
/// first token on its line; whitespace is allowed before `#` and between `#`
/// and `include`. Angle-bracket includes and unterminated quotes are ignored.
/// This is a dependency scan, not a preprocessor: directives inside block
/// comments or disabled `#if` branches are still reported.
pub struct IncludeScanner {
    file_system: Arc<dyn FileSystem>,
}

impl IncludeScanner {
    pub fn new(file_system: Arc<dyn FileSystem>) -> Self {
        Self { file_system }
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.file_system.as_ref()
    }

    /// Read `path` and return its direct (non-recursive) include literals
    pub fn scan_direct_includes(&self, path: &SourcePath) -> Result<IncludeDirectives> {
        let text = self
            .file_system
            .read_to_string(path.as_path())
            .map_err(|source| ShaderError::Io {
                path: path.as_path().to_path_buf(),
                source,
            })?;
        Ok(IncludeDirectives { text })
    }
}

/// Include literals of one source file, in file order
///
/// Holds the file text; every call to [`IncludeDirectives::iter`] lazily
/// re-parses it from the start.
#[derive(Debug, Clone)]
pub struct IncludeDirectives {
    text: String,
}

impl IncludeDirectives {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        parse_include_directives(&self.text)
    }
}

impl<'a> IntoIterator for &'a IncludeDirectives {
    type Item = &'a str;
    type IntoIter = Box<dyn Iterator<Item = &'a str> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

pub fn parse_include_directives(text: &str) -> impl Iterator<Item = &str> + '_ {
    text.lines().filter_map(include_literal)
}

fn include_literal(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('#')?;
    let rest = rest.trim_start().strip_prefix("include")?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}
