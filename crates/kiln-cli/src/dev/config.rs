//! Serve-mode settings derived from the project configuration.

use crate::config::KilnConfig;
use kiln_bundler::config::resolve_path;
use std::path::PathBuf;

/// Directories that never trigger a rebuild.
const ALWAYS_IGNORED: [&str; 2] = ["node_modules", "elm-stuff"];

#[derive(Debug, Clone)]
pub struct DevConfig {
    /// Project root, watched recursively
    pub cwd: PathBuf,

    /// Absolute output directory, served and excluded from watching
    pub out_dir: PathBuf,

    pub host: String,
    pub port: u16,

    /// Path fragments to ignore when watching
    pub watch_ignore: Vec<String>,

    /// Quiet period before a burst of changes triggers a rebuild
    pub debounce_ms: u64,

    /// Extensions whose changes trigger a rebuild
    pub source_extensions: Vec<String>,
}

impl DevConfig {
    pub fn new(config: &KilnConfig, cwd: PathBuf) -> Self {
        let mut watch_ignore: Vec<String> = ALWAYS_IGNORED.map(String::from).to_vec();
        watch_ignore.extend(config.watch.ignore.iter().cloned());

        Self {
            out_dir: resolve_path(&config.out_dir, &cwd),
            cwd,
            host: config.server.host.clone(),
            port: config.server.port,
            watch_ignore,
            debounce_ms: config.watch.debounce_ms,
            source_extensions: config.source_extensions(),
        }
    }

    /// URL printed on startup.
    pub fn server_url(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("http://{}:{}", host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_config_from_kiln_config() {
        let mut config = KilnConfig::default();
        config.watch.ignore.push("*.log".to_string());

        let dev = DevConfig::new(&config, PathBuf::from("/project"));
        assert_eq!(dev.out_dir, PathBuf::from("/project/public"));
        assert_eq!(dev.watch_ignore, vec!["node_modules", "elm-stuff", "*.log"]);
        assert_eq!(dev.source_extensions, vec!["js", "mjs", "elm"]);
        assert_eq!(dev.debounce_ms, 100);
    }

    #[test]
    fn test_server_url() {
        let mut dev = DevConfig::new(&KilnConfig::default(), PathBuf::from("/project"));
        assert_eq!(dev.server_url(), "http://127.0.0.1:8000");

        dev.host = "::1".to_string();
        dev.port = 3000;
        assert_eq!(dev.server_url(), "http://[::1]:3000");
    }
}
