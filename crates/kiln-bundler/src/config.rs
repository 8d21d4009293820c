//! Build configuration.
//!
//! A [`BuildConfig`] is resolved once per invocation from the production
//! signal and never mutated afterwards. Every component receives it by value
//! or reference; nothing below this point reads the environment.

use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    /// Map the production signal to a mode.
    pub fn from_production(is_production: bool) -> Self {
        if is_production {
            Mode::Production
        } else {
            Mode::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Mode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one build request.
///
/// `minify` and `source_maps` are derived from the mode and cannot be set
/// independently: production builds are minified without maps, development
/// builds keep maps and skip minification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    mode: Mode,
    entry_points: Vec<PathBuf>,
    out_dir: PathBuf,
    cwd: PathBuf,
    minify: bool,
    source_maps: bool,
}

impl BuildConfig {
    /// Resolve a configuration from the production signal.
    ///
    /// Total and side-effect free. An empty entry list is accepted here and
    /// rejected by [`crate::Pipeline::new`].
    pub fn resolve<I, P>(is_production: bool, entry_points: I, out_dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mode = Mode::from_production(is_production);
        Self {
            mode,
            entry_points: entry_points.into_iter().map(Into::into).collect(),
            out_dir: out_dir.into(),
            cwd: PathBuf::from("."),
            minify: mode == Mode::Production,
            source_maps: mode == Mode::Development,
        }
    }

    /// Set the project root that relative entry points and the output
    /// directory are resolved against.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn entry_points(&self) -> &[PathBuf] {
        &self.entry_points
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn minify(&self) -> bool {
        self.minify
    }

    pub fn source_maps(&self) -> bool {
        self.source_maps
    }

    /// Output directory joined onto the project root.
    pub fn resolved_out_dir(&self) -> PathBuf {
        resolve_path(&self.out_dir, &self.cwd)
    }

    /// Entry points joined onto the project root, in declaration order.
    pub fn resolved_entry_points(&self) -> Vec<PathBuf> {
        self.entry_points
            .iter()
            .map(|entry| resolve_path(entry, &self.cwd))
            .collect()
    }
}

/// Join `path` onto `base` unless it is already absolute.
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.clean()
    } else {
        base.join(path).clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_minifies_without_maps() {
        let config = BuildConfig::resolve(true, ["index.js"], "public");
        assert_eq!(config.mode(), Mode::Production);
        assert!(config.minify());
        assert!(!config.source_maps());
    }

    #[test]
    fn development_keeps_maps() {
        let config = BuildConfig::resolve(false, ["index.js"], "public");
        assert_eq!(config.mode(), Mode::Development);
        assert!(!config.minify());
        assert!(config.source_maps());
    }

    #[test]
    fn flags_follow_mode_for_any_entry_list() {
        let entry_lists: Vec<Vec<&str>> = vec![
            vec!["index.js"],
            vec!["a.js", "b.js"],
            vec!["src/main.mjs", "worker.js", "admin/index.js"],
        ];
        for entries in entry_lists {
            for is_production in [true, false] {
                let config = BuildConfig::resolve(is_production, entries.clone(), "out");
                assert_eq!(config.minify(), is_production);
                assert_eq!(config.source_maps(), !is_production);
            }
        }
    }

    #[test]
    fn entry_order_is_preserved() {
        let config = BuildConfig::resolve(false, ["b.js", "a.js"], "public");
        assert_eq!(
            config.entry_points(),
            &[PathBuf::from("b.js"), PathBuf::from("a.js")]
        );
    }

    #[test]
    fn paths_resolve_against_cwd() {
        let config =
            BuildConfig::resolve(false, ["./index.js"], "public").with_cwd("/project/app");
        assert_eq!(config.resolved_out_dir(), PathBuf::from("/project/app/public"));
        assert_eq!(
            config.resolved_entry_points(),
            vec![PathBuf::from("/project/app/index.js")]
        );
    }

    #[test]
    fn absolute_out_dir_is_kept() {
        let config = BuildConfig::resolve(false, ["index.js"], "/srv/www").with_cwd("/project");
        assert_eq!(config.resolved_out_dir(), PathBuf::from("/srv/www"));
    }

    #[test]
    fn mode_display() {
        assert_eq!(Mode::Production.to_string(), "production");
        assert_eq!(Mode::from_production(false).to_string(), "development");
    }
}
