//! Language-lowering stage.
//!
//! Foreign modules (Elm by default) are handed to an external [`Compiler`]
//! and replaced by the ES module it returns. Everything else passes through.

use crate::artifact::{Artifact, ModuleKind};
use crate::stage::{Stage, StageError};
use crate::tool::{ToolCommand, read_tool_output};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options passed to the compiler for every module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Build with the time-travelling debugger
    pub debug: bool,
    /// Enable compiler optimizations
    pub optimize: bool,
}

impl CompilerOptions {
    /// Debug builds when not minifying, optimized builds when minifying.
    pub fn for_minify(minify: bool) -> Self {
        Self {
            debug: !minify,
            optimize: minify,
        }
    }
}

/// External compiler for a foreign UI language.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Language name, used in logs.
    fn language(&self) -> &str;

    /// Compile the module at `path` to an ES module whose default export is
    /// the compiled program object.
    async fn compile(
        &self,
        path: &Path,
        cwd: &Path,
        options: CompilerOptions,
    ) -> Result<String, StageError>;
}

/// `elm make` wrapper.
#[derive(Debug, Clone)]
pub struct ElmCompiler {
    command: ToolCommand,
}

impl ElmCompiler {
    pub fn new(command: &str) -> Result<Self, StageError> {
        Ok(Self {
            command: ToolCommand::parse(command)?,
        })
    }

    /// Give up on a single `elm make` run after `secs` seconds.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.command = self.command.with_timeout(secs);
        self
    }

    /// Directory holding the `elm.json` that owns `module`, falling back to `cwd`.
    fn project_root(module: &Path, cwd: &Path) -> PathBuf {
        module
            .ancestors()
            .skip(1)
            .find(|dir| dir.join("elm.json").is_file())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf())
    }
}

impl Default for ElmCompiler {
    fn default() -> Self {
        Self {
            command: ToolCommand::parse("elm").expect("non-empty command"),
        }
    }
}

#[async_trait]
impl Compiler for ElmCompiler {
    fn language(&self) -> &str {
        "elm"
    }

    async fn compile(
        &self,
        path: &Path,
        cwd: &Path,
        options: CompilerOptions,
    ) -> Result<String, StageError> {
        let out_dir = tempfile::Builder::new().prefix("kiln-elm").tempdir()?;
        let out_file = out_dir.path().join("elm.js");

        let mut args = vec![
            "make".to_string(),
            path.to_string_lossy().into_owned(),
            "--output".to_string(),
            out_file.to_string_lossy().into_owned(),
        ];
        // elm rejects --debug together with --optimize
        if options.debug {
            args.push("--debug".to_string());
        } else if options.optimize {
            args.push("--optimize".to_string());
        }

        let root = Self::project_root(path, cwd);
        self.command.run(&args, &root, None).await?;

        let compiled = read_tool_output(&out_file).await?;
        Ok(wrap_elm_output(&compiled))
    }
}

/// Turn `elm make` output into an ES module.
///
/// The compiler emits a script that attaches `Elm` to `this`. Calling it with
/// an explicit receiver keeps it working under module strict mode.
pub fn wrap_elm_output(compiled: &str) -> String {
    format!(
        "const __kiln_elm_scope = {{}};\n(function () {{\n{compiled}\n}}).call(__kiln_elm_scope);\nexport default __kiln_elm_scope.Elm;\n"
    )
}

pub struct LowerStage {
    compiler: Arc<dyn Compiler>,
    options: CompilerOptions,
}

impl LowerStage {
    pub fn new(compiler: Arc<dyn Compiler>, options: CompilerOptions) -> Self {
        Self { compiler, options }
    }

    pub fn options(&self) -> CompilerOptions {
        self.options
    }
}

#[async_trait]
impl Stage for LowerStage {
    fn name(&self) -> &str {
        "lower"
    }

    fn describe(&self) -> String {
        format!("lower(debug={})", self.options.debug)
    }

    async fn run(&self, mut artifact: Artifact) -> Result<Artifact, StageError> {
        let cwd = artifact.cwd().to_path_buf();
        for module in artifact.modules.values_mut() {
            let ModuleKind::Foreign { language } = &module.kind else {
                continue;
            };
            let language = language.clone();

            tracing::debug!(
                module = %module.id,
                compiler = self.compiler.language(),
                debug = self.options.debug,
                "lowering module"
            );
            module.source = self
                .compiler
                .compile(&module.path, &cwd, self.options)
                .await?;
            module.kind = ModuleKind::Lowered { language };
        }
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Module;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(PathBuf, CompilerOptions)>>,
    }

    #[async_trait]
    impl Compiler for Recorder {
        fn language(&self) -> &str {
            "fake"
        }

        async fn compile(
            &self,
            path: &Path,
            _cwd: &Path,
            options: CompilerOptions,
        ) -> Result<String, StageError> {
            self.calls.lock().unwrap().push((path.to_path_buf(), options));
            Ok("export default { Main: {} };\n".to_string())
        }
    }

    fn artifact_with(modules: Vec<Module>) -> Artifact {
        let mut artifact = Artifact::new("/app", vec![PathBuf::from("/app/index.js")]);
        for module in modules {
            artifact.modules.insert(module.path.clone(), module);
        }
        artifact
    }

    fn module(path: &str, kind: ModuleKind) -> Module {
        Module {
            id: path.trim_start_matches("/app/").to_string(),
            path: PathBuf::from(path),
            kind,
            source: "original".to_string(),
            imports: Vec::new(),
        }
    }

    #[test]
    fn options_follow_minify() {
        assert_eq!(
            CompilerOptions::for_minify(false),
            CompilerOptions {
                debug: true,
                optimize: false
            }
        );
        assert_eq!(
            CompilerOptions::for_minify(true),
            CompilerOptions {
                debug: false,
                optimize: true
            }
        );
    }

    #[tokio::test]
    async fn only_foreign_modules_are_compiled() {
        let recorder = Arc::new(Recorder::default());
        let stage = LowerStage::new(recorder.clone(), CompilerOptions::for_minify(false));
        let artifact = artifact_with(vec![
            module(
                "/app/src/Main.elm",
                ModuleKind::Foreign {
                    language: "elm".to_string(),
                },
            ),
            module("/app/index.js", ModuleKind::Script),
        ]);

        let lowered = stage.run(artifact).await.unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("/app/src/Main.elm"));
        assert!(calls[0].1.debug);

        let elm = &lowered.modules[&PathBuf::from("/app/src/Main.elm")];
        assert_eq!(
            elm.kind,
            ModuleKind::Lowered {
                language: "elm".to_string()
            }
        );
        assert!(elm.source.starts_with("export default"));
        let js = &lowered.modules[&PathBuf::from("/app/index.js")];
        assert_eq!(js.source, "original");
    }

    #[test]
    fn describe_shows_debug_flag() {
        let stage = LowerStage::new(
            Arc::new(Recorder::default()),
            CompilerOptions::for_minify(true),
        );
        assert_eq!(stage.describe(), "lower(debug=false)");
    }

    #[test]
    fn wrapped_output_exports_program() {
        let wrapped = wrap_elm_output("(function(scope){ scope['Elm'] = {}; }(this));");
        assert!(wrapped.contains(".call(__kiln_elm_scope)"));
        assert!(wrapped.trim_end().ends_with("export default __kiln_elm_scope.Elm;"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn elm_compiler_invokes_make_with_flags() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let log = temp.path().join("args.log");
        let script = temp.path().join("fake-elm");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$@\" > {log}\nout=\"\"\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"--output\" ]; then out=\"$2\"; fi\n  shift\ndone\necho \"(function(scope){{scope['Elm']={{}};}}(this));\" > \"$out\"\n",
                log = log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(temp.path().join("elm.json"), "{}").unwrap();
        let main = temp.path().join("src/Main.elm");
        std::fs::create_dir_all(main.parent().unwrap()).unwrap();
        std::fs::write(&main, "module Main exposing (main)\n").unwrap();

        let compiler = ElmCompiler::new(&script.to_string_lossy()).unwrap();
        let output = compiler
            .compile(&main, temp.path(), CompilerOptions::for_minify(true))
            .await
            .unwrap();

        assert!(output.contains("scope['Elm']"));
        assert!(output.contains("export default __kiln_elm_scope.Elm;"));
        let args = std::fs::read_to_string(&log).unwrap();
        assert!(args.starts_with("make "));
        assert!(args.contains("--optimize"));
        assert!(!args.contains("--debug"));
    }
}
