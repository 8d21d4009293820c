use std::path::PathBuf;

pub fn default_entry() -> Vec<PathBuf> {
    vec![PathBuf::from("index.js")]
}

pub fn default_out_dir() -> PathBuf {
    PathBuf::from("public")
}

pub fn default_compiler_command() -> String {
    "elm".to_string()
}

pub fn default_compiler_extensions() -> Vec<String> {
    vec!["elm".to_string()]
}

pub fn default_minifier_command() -> String {
    "terser".to_string()
}

pub fn default_timeout_secs() -> u64 {
    kiln_bundler::tool::DEFAULT_TIMEOUT_SECS
}

pub fn default_ecma() -> u32 {
    6
}

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    8000
}

pub fn default_debounce_ms() -> u64 {
    100
}
