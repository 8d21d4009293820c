//! Minification stage, run only for production builds.

use crate::artifact::Artifact;
use crate::stage::{Stage, StageError};
use crate::tool::ToolCommand;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Minifier settings.
///
/// The defaults are tuned for compiled Elm output: its currying helpers
/// (`F2`..`F9`, `A2`..`A9`) are pure and can be dropped when unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifyOptions {
    /// ECMAScript version the output may use
    pub ecma: u32,
    /// Rename local bindings
    pub mangle: bool,
    /// Calls to these functions are assumed free of side effects
    pub pure_funcs: Vec<String>,
    /// Number of compress passes
    pub passes: u32,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        let pure_funcs = (2..=9)
            .map(|n| format!("F{n}"))
            .chain((2..=9).map(|n| format!("A{n}")))
            .collect();
        Self {
            ecma: 6,
            mangle: true,
            pure_funcs,
            passes: 2,
        }
    }
}

impl MinifyOptions {
    pub fn with_ecma(mut self, ecma: u32) -> Self {
        self.ecma = ecma;
        self
    }

    /// Command line arguments understood by `terser`.
    pub fn terser_args(&self) -> Vec<String> {
        let pure_funcs = self
            .pure_funcs
            .iter()
            .map(|name| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(",");

        let mut compress = Vec::new();
        if !pure_funcs.is_empty() {
            compress.push(format!("pure_funcs=[{pure_funcs}]"));
        }
        compress.extend(
            [
                "pure_getters=true",
                "keep_fargs=false",
                "unsafe_comps=true",
                "unsafe=true",
            ]
            .map(String::from),
        );
        compress.push(format!("passes={}", self.passes));

        let mut args = vec![
            "--ecma".to_string(),
            self.ecma.to_string(),
            "--compress".to_string(),
            compress.join(","),
            "--format".to_string(),
            "comments=false".to_string(),
        ];
        if self.mangle {
            args.push("--mangle".to_string());
        }
        args
    }
}

/// External JavaScript minifier.
#[async_trait]
pub trait Minifier: Send + Sync {
    /// Tool name, used in logs.
    fn name(&self) -> &str;

    async fn minify(
        &self,
        code: &str,
        cwd: &Path,
        options: &MinifyOptions,
    ) -> Result<String, StageError>;
}

/// `terser` wrapper; code goes in on stdin and comes out on stdout.
#[derive(Debug, Clone)]
pub struct TerserMinifier {
    command: ToolCommand,
}

impl TerserMinifier {
    pub fn new(command: &str) -> Result<Self, StageError> {
        Ok(Self {
            command: ToolCommand::parse(command)?,
        })
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.command = self.command.with_timeout(secs);
        self
    }
}

impl Default for TerserMinifier {
    fn default() -> Self {
        Self {
            command: ToolCommand::parse("terser").expect("non-empty command"),
        }
    }
}

#[async_trait]
impl Minifier for TerserMinifier {
    fn name(&self) -> &str {
        "terser"
    }

    async fn minify(
        &self,
        code: &str,
        cwd: &Path,
        options: &MinifyOptions,
    ) -> Result<String, StageError> {
        let stdout = self
            .command
            .run(&options.terser_args(), cwd, Some(code))
            .await?;
        String::from_utf8(stdout).map_err(|_| {
            StageError::Invalid(format!(
                "'{}' produced output that is not valid UTF-8",
                self.command.program()
            ))
        })
    }
}

pub struct MinifyStage {
    minifier: Arc<dyn Minifier>,
    options: MinifyOptions,
}

impl MinifyStage {
    pub fn new(minifier: Arc<dyn Minifier>, options: MinifyOptions) -> Self {
        Self { minifier, options }
    }
}

#[async_trait]
impl Stage for MinifyStage {
    fn name(&self) -> &str {
        "minify"
    }

    async fn run(&self, mut artifact: Artifact) -> Result<Artifact, StageError> {
        let cwd = artifact.cwd().to_path_buf();
        for output in artifact.scripts_mut() {
            let before = output.contents.len();
            output.contents = self
                .minifier
                .minify(&output.contents, &cwd, &self.options)
                .await?;
            tracing::debug!(
                chunk = %output.file_name,
                minifier = self.minifier.name(),
                before,
                after = output.contents.len(),
                "minified chunk"
            );
        }
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::OutputFile;

    struct Squash;

    #[async_trait]
    impl Minifier for Squash {
        fn name(&self) -> &str {
            "squash"
        }

        async fn minify(
            &self,
            code: &str,
            _cwd: &Path,
            _options: &MinifyOptions,
        ) -> Result<String, StageError> {
            Ok(code.split_whitespace().collect())
        }
    }

    #[test]
    fn default_options_mark_elm_helpers_pure() {
        let options = MinifyOptions::default();
        assert_eq!(options.ecma, 6);
        assert!(options.mangle);
        assert_eq!(options.pure_funcs.len(), 16);
        assert_eq!(options.pure_funcs.first().map(String::as_str), Some("F2"));
        assert_eq!(options.pure_funcs.last().map(String::as_str), Some("A9"));
    }

    #[test]
    fn terser_args_carry_compress_and_mangle() {
        let args = MinifyOptions::default().with_ecma(2020).terser_args();
        assert_eq!(&args[..2], &["--ecma".to_string(), "2020".to_string()]);
        let compress = &args[3];
        assert!(compress.starts_with("pure_funcs=[\"F2\",\"F3\""));
        assert!(compress.contains("keep_fargs=false"));
        assert!(compress.ends_with("passes=2"));
        assert_eq!(args.last().map(String::as_str), Some("--mangle"));
    }

    #[test]
    fn mangle_can_be_disabled() {
        let options = MinifyOptions {
            mangle: false,
            ..Default::default()
        };
        assert!(!options.terser_args().contains(&"--mangle".to_string()));
    }

    #[tokio::test]
    async fn only_scripts_are_minified() {
        let mut artifact = Artifact::new("/app", vec![]);
        artifact.outputs = vec![
            OutputFile::script("index.js", "var a = 1;\nvar b = 2;\n"),
            OutputFile::source_map("index.js.map", "{ \"version\": 3 }"),
        ];

        let stage = MinifyStage::new(Arc::new(Squash), MinifyOptions::default());
        let artifact = stage.run(artifact).await.unwrap();

        assert_eq!(artifact.outputs[0].contents, "vara=1;varb=2;");
        assert_eq!(artifact.outputs[1].contents, "{ \"version\": 3 }");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terser_minifier_pipes_through_command() {
        // `sh -c cat` swallows the terser flags as positional parameters
        let minifier = TerserMinifier::new("sh -c cat").unwrap();
        let out = minifier
            .minify("var x = 1;", Path::new("."), &MinifyOptions::default())
            .await
            .unwrap();
        assert_eq!(out, "var x = 1;");
    }
}
