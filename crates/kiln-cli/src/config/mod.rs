//! Project configuration with multi-source loading.
//!
//! Settings are merged from defaults, `kiln.config.json`, `KILN_*`
//! environment variables and command-line flags, later sources winning.
//! The result is turned into an immutable [`BuildConfig`] and a
//! [`Toolchain`] exactly once per invocation.

mod defaults;
mod loading;
mod validation;

use kiln_bundler::{BuildConfig, ElmCompiler, MinifyOptions, TerserMinifier, Toolchain};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ConfigError, Result};
pub use defaults::*;
pub use loading::{CONFIG_FILE_NAME, CliOverrides, ServerOverrides, is_production};
pub use validation::is_valid_ecma;

/// Contents of `kiln.config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KilnConfig {
    /// Entry modules, one bundle each
    #[serde(default = "default_entry")]
    pub entry: Vec<PathBuf>,

    /// Where bundles are written and served from
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    #[serde(default)]
    pub compiler: CompilerConfig,

    #[serde(default)]
    pub minifier: MinifierConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

/// External compiler for foreign modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompilerConfig {
    /// Compiler executable, optionally with leading arguments, e.g. `npx elm`
    #[serde(default = "default_compiler_command")]
    pub command: String,

    /// File extensions (without the dot) handed to the compiler
    #[serde(default = "default_compiler_extensions")]
    pub extensions: Vec<String>,

    /// Seconds a single compiler run may take
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// External minifier used for production builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MinifierConfig {
    #[serde(default = "default_minifier_command")]
    pub command: String,

    /// ECMAScript version of the minified output
    #[serde(default = "default_ecma")]
    pub ecma: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WatchConfig {
    /// Extra path fragments to ignore, matched against every path component
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Quiet period before a burst of changes triggers a rebuild
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for KilnConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            out_dir: default_out_dir(),
            compiler: CompilerConfig::default(),
            minifier: MinifierConfig::default(),
            server: ServerConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: default_compiler_command(),
            extensions: default_compiler_extensions(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for MinifierConfig {
    fn default() -> Self {
        Self {
            command: default_minifier_command(),
            ecma: default_ecma(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl KilnConfig {
    /// Resolve the build configuration for `cwd`.
    pub fn build_config(&self, is_production: bool, cwd: &Path) -> BuildConfig {
        BuildConfig::resolve(is_production, self.entry.iter().cloned(), self.out_dir.clone())
            .with_cwd(cwd)
    }

    /// External tools described by this configuration.
    pub fn toolchain(&self) -> Result<Toolchain> {
        let compiler = ElmCompiler::new(&self.compiler.command)
            .map(|elm| elm.with_timeout(self.compiler.timeout_secs))
            .map_err(|e| ConfigError::InvalidValue {
                field: "compiler.command".to_string(),
                value: self.compiler.command.clone(),
                hint: e.to_string(),
            })?;
        let minifier = TerserMinifier::new(&self.minifier.command)
            .map(|terser| terser.with_timeout(self.minifier.timeout_secs))
            .map_err(|e| ConfigError::InvalidValue {
                field: "minifier.command".to_string(),
                value: self.minifier.command.clone(),
                hint: e.to_string(),
            })?;

        Ok(Toolchain {
            compiler: Arc::new(compiler),
            minifier: Arc::new(minifier),
            foreign_extensions: self.compiler.extensions.clone(),
            minify_options: MinifyOptions::default().with_ecma(self.minifier.ecma),
        })
    }

    /// Extensions whose changes trigger a rebuild in serve mode.
    pub fn source_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = ["js", "mjs"].map(String::from).to_vec();
        for ext in &self.compiler.extensions {
            if !extensions.contains(ext) {
                extensions.push(ext.clone());
            }
        }
        extensions
    }
}
