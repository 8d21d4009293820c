//! Module resolution stage.
//!
//! Starting from the entry points, reads every module and follows its static
//! imports until the whole graph is known. The graph is stored in evaluation
//! order (dependencies before dependents) so later stages never reorder it.

use crate::artifact::{Artifact, Import, Module, ModuleKind};
use crate::stage::{Stage, StageError};
use crate::stages::scan;
use async_trait::async_trait;
use indexmap::IndexMap;
use oxc_resolver::{ResolveOptions, Resolver};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

/// Extensions treated as plain JavaScript.
const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs"];

pub struct ResolveStage {
    resolver: Resolver,
    foreign_extensions: Vec<String>,
}

impl ResolveStage {
    /// Create a resolver that treats files with `foreign_extensions` as
    /// leaves to be lowered by the compiler.
    pub fn new(foreign_extensions: &[String]) -> Self {
        let resolver = Resolver::new(ResolveOptions {
            condition_names: vec!["import".into(), "browser".into(), "default".into()],
            main_fields: vec!["module".into(), "main".into()],
            extensions: vec![".js".into(), ".mjs".into()],
            ..Default::default()
        });

        Self {
            resolver,
            foreign_extensions: foreign_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect(),
        }
    }

    fn foreign_language(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?;
        self.foreign_extensions
            .iter()
            .find(|foreign| foreign.as_str() == ext)
            .cloned()
    }

    fn resolve_specifier(
        &self,
        importer: &Path,
        specifier: &str,
    ) -> Result<PathBuf, StageError> {
        let dir = importer.parent().unwrap_or(Path::new("/"));
        self.resolver
            .resolve(dir, specifier)
            .map(|resolution| resolution.into_path_buf())
            .map_err(|e| StageError::Unresolved {
                specifier: specifier.to_string(),
                importer: importer.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn load(&self, path: &Path, artifact: &Artifact) -> Result<Module, StageError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| StageError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let id = artifact.module_id(path);

        if let Some(language) = self.foreign_language(path) {
            tracing::debug!(module = %id, %language, "foreign module");
            return Ok(Module {
                id,
                path: path.to_path_buf(),
                kind: ModuleKind::Foreign { language },
                source,
                imports: Vec::new(),
            });
        }

        let is_script = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext));
        if !is_script {
            return Err(StageError::Invalid(format!(
                "unsupported module type: {} (expected .js/.mjs or one of: {})",
                path.display(),
                self.foreign_extensions.join(", ")
            )));
        }

        let imports = scan::specifiers(&source, &id)?
            .into_iter()
            .map(|specifier| {
                let resolved = self.resolve_specifier(path, &specifier)?;
                Ok(Import {
                    specifier,
                    path: resolved,
                })
            })
            .collect::<Result<Vec<_>, StageError>>()?;

        tracing::debug!(module = %id, imports = imports.len(), "scanned module");

        Ok(Module {
            id,
            path: path.to_path_buf(),
            kind: ModuleKind::Script,
            source,
            imports,
        })
    }
}

enum Visit {
    Enter(PathBuf),
    Exit(Module),
}

#[async_trait]
impl Stage for ResolveStage {
    fn name(&self) -> &str {
        "resolve"
    }

    async fn run(&self, mut artifact: Artifact) -> Result<Artifact, StageError> {
        let mut graph: IndexMap<PathBuf, Module> = IndexMap::new();
        let mut in_progress: FxHashSet<PathBuf> = FxHashSet::default();

        for entry in artifact.entries().to_vec() {
            if tokio::fs::metadata(&entry).await.is_err() {
                return Err(StageError::EntryNotFound(entry));
            }

            // Iterative post-order DFS; a module is recorded once all of its
            // imports are recorded. Back edges (cycles) are skipped.
            let mut stack = vec![Visit::Enter(entry)];
            while let Some(visit) = stack.pop() {
                match visit {
                    Visit::Enter(path) => {
                        if graph.contains_key(&path) || !in_progress.insert(path.clone()) {
                            continue;
                        }
                        let module = self.load(&path, &artifact).await?;
                        let deps: Vec<PathBuf> =
                            module.imports.iter().map(|i| i.path.clone()).collect();
                        stack.push(Visit::Exit(module));
                        stack.extend(deps.into_iter().rev().map(Visit::Enter));
                    }
                    Visit::Exit(module) => {
                        in_progress.remove(&module.path);
                        graph.insert(module.path.clone(), module);
                    }
                }
            }
        }

        tracing::debug!(modules = graph.len(), "module graph resolved");
        artifact.modules = graph;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (name, contents) in files {
            let path = temp.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        temp
    }

    async fn resolve(temp: &TempDir, entries: &[&str]) -> Result<Artifact, StageError> {
        let cwd = temp.path().canonicalize().unwrap();
        let entries = entries.iter().map(|e| cwd.join(e)).collect();
        let stage = ResolveStage::new(&["elm".to_string()]);
        stage.run(Artifact::new(cwd, entries)).await
    }

    fn ids(artifact: &Artifact) -> Vec<String> {
        artifact.modules.values().map(|m| m.id.clone()).collect()
    }

    #[tokio::test]
    async fn dependencies_come_before_dependents() {
        let temp = project(&[
            ("index.js", "import a from './a.js';\nimport './b.js';\n"),
            ("a.js", "import './c.js';\nexport default 1;\n"),
            ("b.js", "import './c.js';\n"),
            ("c.js", "console.log('c');\n"),
        ]);
        let artifact = resolve(&temp, &["index.js"]).await.unwrap();
        assert_eq!(ids(&artifact), vec!["c.js", "a.js", "b.js", "index.js"]);
    }

    #[tokio::test]
    async fn foreign_modules_are_leaves() {
        let temp = project(&[
            ("index.js", "import Elm from './src/Main.elm';\n"),
            ("src/Main.elm", "module Main exposing (main)\nimport Html\n"),
        ]);
        let artifact = resolve(&temp, &["index.js"]).await.unwrap();
        assert_eq!(ids(&artifact), vec!["src/Main.elm", "index.js"]);
        let elm = artifact.modules.values().next().unwrap();
        assert_eq!(
            elm.kind,
            ModuleKind::Foreign {
                language: "elm".to_string()
            }
        );
        assert!(elm.imports.is_empty());
    }

    #[tokio::test]
    async fn bare_specifiers_resolve_through_node_modules() {
        let temp = project(&[
            ("index.js", "import 'widget';\n"),
            (
                "node_modules/widget/package.json",
                r#"{ "name": "widget", "module": "dist/widget.mjs", "main": "dist/widget.cjs" }"#,
            ),
            ("node_modules/widget/dist/widget.mjs", "export const w = 1;\n"),
        ]);
        let artifact = resolve(&temp, &["index.js"]).await.unwrap();
        assert_eq!(
            ids(&artifact),
            vec!["node_modules/widget/dist/widget.mjs", "index.js"]
        );
    }

    #[tokio::test]
    async fn cycles_terminate() {
        let temp = project(&[
            ("a.js", "import './b.js';\n"),
            ("b.js", "import './a.js';\n"),
        ]);
        let artifact = resolve(&temp, &["a.js"]).await.unwrap();
        assert_eq!(ids(&artifact), vec!["b.js", "a.js"]);
    }

    #[tokio::test]
    async fn shared_modules_appear_once_across_entries() {
        let temp = project(&[
            ("one.js", "import './shared.js';\n"),
            ("two.js", "import './shared.js';\n"),
            ("shared.js", "export const s = 1;\n"),
        ]);
        let artifact = resolve(&temp, &["one.js", "two.js"]).await.unwrap();
        assert_eq!(ids(&artifact), vec!["shared.js", "one.js", "two.js"]);
    }

    #[tokio::test]
    async fn unresolved_import_fails() {
        let temp = project(&[("index.js", "import './missing.js';\n")]);
        let err = resolve(&temp, &["index.js"]).await.unwrap_err();
        match err {
            StageError::Unresolved { specifier, .. } => assert_eq!(specifier, "./missing.js"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn commented_imports_are_not_dependencies() {
        let temp = project(&[(
            "index.js",
            "/* usage:\nimport x from './not-there.js';\n*/\nconst help = `import './nope.js'`;\nconsole.log(1);\n",
        )]);
        let artifact = resolve(&temp, &["index.js"]).await.unwrap();
        assert_eq!(ids(&artifact), vec!["index.js"]);
    }

    #[tokio::test]
    async fn syntax_errors_fail_with_module_name() {
        let temp = project(&[("index.js", "import { from './a.js';\n")]);
        let err = resolve(&temp, &["index.js"]).await.unwrap_err();
        assert!(err.to_string().contains("failed to parse index.js"));
    }

    #[tokio::test]
    async fn missing_entry_fails() {
        let temp = project(&[]);
        let err = resolve(&temp, &["index.js"]).await.unwrap_err();
        assert!(matches!(err, StageError::EntryNotFound(_)));
    }

    #[tokio::test]
    async fn unsupported_module_type_fails() {
        let temp = project(&[
            ("index.js", "import './style.css';\n"),
            ("style.css", "body {}\n"),
        ]);
        let err = resolve(&temp, &["index.js"]).await.unwrap_err();
        assert!(matches!(err, StageError::Invalid(_)));
    }
}
