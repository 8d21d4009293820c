use crate::cli::{BuildArgs, ProjectArgs, ServeArgs};
use crate::config::KilnConfig;
use crate::error::{ConfigError, Result, ResultExt};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use kiln_bundler::config::resolve_path;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "kiln.config.json";

const ENV_PREFIX: &str = "KILN_";
const ENV_SECTIONS: [&str; 4] = ["compiler", "minifier", "server", "watch"];

/// Read the production signal.
///
/// An explicit `--production`/`--development` flag wins; otherwise
/// `NODE_ENV=production` selects production. This is the only place the
/// mode is read from the environment.
pub fn is_production(mode_override: Option<bool>) -> bool {
    mode_override
        .unwrap_or_else(|| std::env::var("NODE_ENV").is_ok_and(|value| value == "production"))
}

/// Values given on the command line. Unset fields leave lower sources alone.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "ServerOverrides::is_empty")]
    pub server: ServerOverrides,
}

#[derive(Debug, Default, Serialize)]
pub struct ServerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl ServerOverrides {
    fn is_empty(&self) -> bool {
        self.host.is_none() && self.port.is_none()
    }
}

impl CliOverrides {
    fn from_project(project: &ProjectArgs) -> Self {
        Self {
            entry: (!project.entry.is_empty()).then(|| project.entry.clone()),
            out_dir: project.out_dir.clone(),
            server: ServerOverrides::default(),
        }
    }
}

impl From<&BuildArgs> for CliOverrides {
    fn from(args: &BuildArgs) -> Self {
        Self::from_project(&args.project)
    }
}

impl From<&ServeArgs> for CliOverrides {
    fn from(args: &ServeArgs) -> Self {
        Self {
            server: ServerOverrides {
                host: args.host.clone(),
                port: args.port,
            },
            ..Self::from_project(&args.project)
        }
    }
}

impl KilnConfig {
    /// Load and validate configuration for the project in `cwd`.
    ///
    /// Priority: CLI args > `KILN_*` environment > config file > defaults.
    /// An explicit `config_path` must exist; the default file is optional.
    pub fn load(cwd: &Path, config_path: Option<&Path>, overrides: &CliOverrides) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match config_path {
            Some(path) => {
                let path = resolve_path(path, cwd);
                std::fs::metadata(&path).with_path(&path)?;
                Some(path)
            }
            None => {
                let default_path = cwd.join(CONFIG_FILE_NAME);
                default_path.is_file().then_some(default_path)
            }
        };

        if let Some(path) = &config_file {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }

        // KILN_OUT_DIR, KILN_SERVER_PORT, KILN_WATCH_DEBOUNCE_MS, ...
        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .filter_map(|key| env_key(key.as_str()).map(Into::into))
                .lowercase(false),
        );

        figment = figment.merge(Serialized::defaults(overrides));

        let config: Self = figment.extract().map_err(|e| ConfigError::Invalid {
            path: config_file.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// Map an environment key (prefix stripped) to a config path.
///
/// `SERVER_PORT` becomes `server.port` and `OUT_DIR` becomes `outDir`.
/// Unknown keys are skipped so unrelated `KILN_*` variables do not trip
/// `deny_unknown_fields`.
fn env_key(key: &str) -> Option<String> {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(field) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return Some(format!("{section}.{}", camel_case(field)));
        }
    }
    match key.as_str() {
        "entry" | "out_dir" => Some(camel_case(&key)),
        _ => None,
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
