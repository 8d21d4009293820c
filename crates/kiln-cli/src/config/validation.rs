use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};

/// ECMAScript versions terser accepts for `--ecma`.
pub fn is_valid_ecma(ecma: u32) -> bool {
    matches!(ecma, 5 | 6 | 2015..=2022)
}

impl KilnConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.entry.is_empty() {
            return Err(ConfigError::MissingField {
                field: "entry".to_string(),
                hint: "Provide at least one entry point, e.g. \"entry\": [\"index.js\"]"
                    .to_string(),
            }
            .into());
        }

        if let Some(blank) = self
            .entry
            .iter()
            .find(|entry| entry.as_os_str().to_string_lossy().trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "entry".to_string(),
                value: format!("{:?}", blank),
                hint: "Entry points must be non-empty paths".to_string(),
            }
            .into());
        }

        if !is_valid_ecma(self.minifier.ecma) {
            return Err(ConfigError::InvalidValue {
                field: "minifier.ecma".to_string(),
                value: self.minifier.ecma.to_string(),
                hint: "Use 5, 6 or a year between 2015 and 2022".to_string(),
            }
            .into());
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                value: "0".to_string(),
                hint: "Pick a fixed port such as 8000".to_string(),
            }
            .into());
        }

        for (field, command) in [
            ("compiler.command", &self.compiler.command),
            ("minifier.command", &self.minifier.command),
        ] {
            if command.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: String::new(),
                    hint: "Give the executable to run".to_string(),
                }
                .into());
            }
        }

        for (field, secs) in [
            ("compiler.timeoutSecs", self.compiler.timeout_secs),
            ("minifier.timeoutSecs", self.minifier.timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: "0".to_string(),
                    hint: "Give the tool at least one second".to_string(),
                }
                .into());
            }
        }

        if let Some(ext) = self
            .compiler
            .extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(ConfigError::InvalidValue {
                field: "compiler.extensions".to_string(),
                value: ext.clone(),
                hint: "List extensions without the leading dot, e.g. \"elm\"".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
