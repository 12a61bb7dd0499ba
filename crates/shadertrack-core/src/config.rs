use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ShaderError;

/// Options controlling dependency tracking and recompilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerOptions {
    /// Maximum nesting of `#include` directives below a requested shader (default: 10)
    #[serde(default = "default_max_recursion_depth")]
    pub max_recursion_depth: u32,

    /// Appended to a source path to locate its compiled artifact (default: ".spv")
    #[serde(default = "default_artifact_suffix")]
    pub artifact_suffix: String,

    /// Compile stale shaders on the rayon thread pool (default: false)
    #[serde(default)]
    pub parallel_compile: bool,

    /// Pretty-print compiler diagnostics (default: true)
    #[serde(default = "default_true")]
    pub pretty: bool,
}

fn default_max_recursion_depth() -> u32 {
    10
}

fn default_artifact_suffix() -> String {
    ".spv".to_string()
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            max_recursion_depth: default_max_recursion_depth(),
            artifact_suffix: default_artifact_suffix(),
            parallel_compile: false,
            pretty: true,
        }
    }
}

/// Options passed through to the external shader compiler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Compiler executable (default: glslc from $VULKAN_SDK, or glslc on PATH)
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Value for `--target-env`
    #[serde(default)]
    pub target_env: Option<String>,

    /// Value for `--target-spv` (default: spv1.5)
    #[serde(default = "default_target_spv")]
    pub target_spv: String,

    /// Pass `-O` instead of `-O0` (default: true)
    #[serde(default = "default_true")]
    pub optimize: bool,

    /// Additional include directories, also searched when scanning includes
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,

    /// Preprocessor definitions passed as `-D<definition>`
    #[serde(default)]
    pub definitions: Vec<String>,

    /// Shader entry point passed as `-fentry-point=<name>`
    #[serde(default)]
    pub entry_point: Option<String>,

    /// Appended to the compiler arguments as-is
    #[serde(default)]
    pub additional_options: Vec<String>,
}

fn default_target_spv() -> String {
    "spv1.5".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            executable: None,
            target_env: None,
            target_spv: default_target_spv(),
            optimize: true,
            include_dirs: Vec::new(),
            definitions: Vec::new(),
            entry_point: None,
            additional_options: Vec::new(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShaderConfig {
    #[serde(default)]
    pub manager: ManagerOptions,

    #[serde(default)]
    pub compiler: CompilerOptions,

    /// Shader files to compile (glob patterns)
    #[serde(default)]
    pub shaders: Vec<String>,
}

/// Command-line values that take precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub max_recursion_depth: Option<u32>,
    pub parallel_compile: Option<bool>,
    pub pretty: Option<bool>,
    pub executable: Option<PathBuf>,
    pub target_spv: Option<String>,
    pub optimize: Option<bool>,
    pub include_dirs: Vec<PathBuf>,
    pub definitions: Vec<String>,
    pub entry_point: Option<String>,
}

impl ShaderConfig {
    /// Load configuration from a YAML or JSON file (chosen by extension)
    pub fn from_file(path: &Path) -> Result<Self, ShaderError> {
        let content = std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content).map_err(|e| ShaderError::Config(e.to_string()))
        } else {
            serde_yaml::from_str(&content).map_err(|e| ShaderError::Config(e.to_string()))
        }
    }

    /// Create a default configuration and write it to a YAML file
    pub fn init_file(path: &Path) -> Result<(), ShaderError> {
        let config = ShaderConfig {
            shaders: vec!["shaders/**/*.vert".to_string(), "shaders/**/*.frag".to_string()],
            ..Default::default()
        };

        let yaml = serde_yaml::to_string(&config).map_err(|e| ShaderError::Config(e.to_string()))?;
        std::fs::write(path, yaml).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge CLI overrides into this configuration
    ///
    /// Scalar values replace the file's values; include directories and
    /// definitions are appended.
    pub fn merge(&mut self, overrides: &CliOverrides) {
        if let Some(depth) = overrides.max_recursion_depth {
            self.manager.max_recursion_depth = depth;
        }
        if let Some(parallel) = overrides.parallel_compile {
            self.manager.parallel_compile = parallel;
        }
        if let Some(pretty) = overrides.pretty {
            self.manager.pretty = pretty;
        }
        if let Some(ref executable) = overrides.executable {
            self.compiler.executable = Some(executable.clone());
        }
        if let Some(ref target_spv) = overrides.target_spv {
            self.compiler.target_spv = target_spv.clone();
        }
        if let Some(optimize) = overrides.optimize {
            self.compiler.optimize = optimize;
        }
        if let Some(ref entry_point) = overrides.entry_point {
            self.compiler.entry_point = Some(entry_point.clone());
        }
        self.compiler
            .include_dirs
            .extend(overrides.include_dirs.iter().cloned());
        self.compiler
            .definitions
            .extend(overrides.definitions.iter().cloned());
    }
}
