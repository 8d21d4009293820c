//! The value that flows between pipeline stages.

use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};

/// Kind of a module in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKind {
    /// Plain JavaScript, scanned for imports and bundled as-is.
    Script,
    /// UI-language source that still has to go through the compiler.
    Foreign { language: String },
    /// UI-language source already replaced by compiled JavaScript.
    Lowered { language: String },
}

impl ModuleKind {
    pub fn is_foreign(&self) -> bool {
        matches!(self, ModuleKind::Foreign { .. })
    }
}

/// A resolved static import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Specifier as written in the source
    pub specifier: String,
    /// Absolute path it resolved to
    pub path: PathBuf,
}

/// One module of the dependency graph.
#[derive(Debug, Clone)]
pub struct Module {
    /// Stable id: path relative to the project root, `/`-separated
    pub id: String,
    pub path: PathBuf,
    pub kind: ModuleKind,
    pub source: String,
    pub imports: Vec<Import>,
}

impl Module {
    /// Path that `specifier` resolved to.
    pub fn import_path(&self, specifier: &str) -> Option<&Path> {
        self.imports
            .iter()
            .find(|import| import.specifier == specifier)
            .map(|import| import.path.as_path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Script,
    SourceMap,
}

/// A file produced by the pipeline, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub file_name: String,
    pub contents: String,
    pub kind: OutputKind,
}

impl OutputFile {
    pub fn script(file_name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
            kind: OutputKind::Script,
        }
    }

    pub fn source_map(file_name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
            kind: OutputKind::SourceMap,
        }
    }
}

/// Build state handed from one stage to the next.
///
/// `modules` is kept in evaluation order: every module appears after all of
/// the modules it imports (cycles aside), entry points last.
#[derive(Debug, Clone, Default)]
pub struct Artifact {
    cwd: PathBuf,
    entries: Vec<PathBuf>,
    pub modules: IndexMap<PathBuf, Module>,
    pub outputs: Vec<OutputFile>,
}

impl Artifact {
    /// Seed artifact: absolute entry paths and nothing else.
    pub fn new(cwd: impl Into<PathBuf>, entries: Vec<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            entries,
            modules: IndexMap::new(),
            outputs: Vec::new(),
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Stable module id for a path under the project root.
    pub fn module_id(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.cwd).unwrap_or(path);
        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Modules reachable from `entry`, in evaluation order.
    pub fn reachable_from(&self, entry: &Path) -> Vec<&Module> {
        let mut seen = rustc_hash::FxHashSet::default();
        let mut stack = vec![entry.to_path_buf()];
        while let Some(path) = stack.pop() {
            if !seen.insert(path.clone()) {
                continue;
            }
            if let Some(module) = self.modules.get(&path) {
                stack.extend(module.imports.iter().map(|import| import.path.clone()));
            }
        }
        self.modules
            .values()
            .filter(|module| seen.contains(&module.path))
            .collect()
    }

    /// Iterate over emitted scripts.
    pub fn scripts_mut(&mut self) -> impl Iterator<Item = &mut OutputFile> {
        self.outputs
            .iter_mut()
            .filter(|output| output.kind == OutputKind::Script)
    }
}
