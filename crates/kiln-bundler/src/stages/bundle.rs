//! Bundling stage.
//!
//! Every entry point becomes one self-contained script. Each reachable module
//! is wrapped in a factory registered with a tiny module runtime; static
//! `import`/`export` syntax is rewritten into calls against that runtime.
//!
//! Export getters and dependency requires go on the factory's first line,
//! ahead of the body, matching ES module evaluation order. Rewritten
//! statements keep their line count, so module line `n` always lands on a
//! known chunk line. Source maps rely on this.

use crate::artifact::{Artifact, Module, ModuleKind, OutputFile};
use crate::stage::{Stage, StageError};
use crate::stages::scan::{self, ImportBinding, ReExport, StatementKind};
use async_trait::async_trait;
use oxc_sourcemap::SourceMapBuilder;
use rustc_hash::FxHashSet;
use std::ops::Range;
use std::path::Path;

const RUNTIME: &str = r#"var __kiln_modules = {};
var __kiln_cache = {};
function __kiln_define(id, factory) {
  __kiln_modules[id] = factory;
}
function __kiln_export(target, getters) {
  for (var name in getters) {
    Object.defineProperty(target, name, { enumerable: true, get: getters[name] });
  }
}
function __kiln_export_star(target, source) {
  Object.keys(source).forEach(function (name) {
    if (name === "default" || Object.prototype.hasOwnProperty.call(target, name)) return;
    Object.defineProperty(target, name, { enumerable: true, get: function () { return source[name]; } });
  });
}
function __kiln_require(id) {
  var cached = __kiln_cache[id];
  if (cached) return cached;
  var exports = {};
  __kiln_cache[id] = exports;
  __kiln_modules[id](__kiln_require, exports);
  return exports;
}
"#;

/// A module after import/export rewriting.
#[derive(Debug)]
struct Rewritten {
    /// Getters registered before anything else runs, as `(exported, expression)`
    exports: Vec<(String, String)>,
    /// Requires and re-export registrations, in source order. They run before
    /// the body so every dependency is evaluated before the importing module.
    hoisted: Vec<String>,
    body: String,
}

/// Replaces `range` with `text`, padded to keep the original newline count.
struct Edit {
    range: Range<usize>,
    text: String,
}

fn require_call(id: &str) -> String {
    format!("__kiln_require({})", js_string(id))
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

/// Require `id` and bind the imported names.
fn import_bindings(bindings: &[ImportBinding], id: &str, slot: usize) -> String {
    if bindings.is_empty() {
        return format!("{};", require_call(id));
    }

    let module = format!("__kiln_m{slot}");
    let mut out = format!("const {module} = {};", require_call(id));
    let mut named = Vec::new();
    for binding in bindings {
        match binding {
            ImportBinding::Default { local } => {
                out.push_str(&format!(" const {local} = {module}.default;"));
            }
            ImportBinding::Namespace { local } => {
                out.push_str(&format!(" const {local} = {module};"));
            }
            ImportBinding::Named { imported, local } if imported == local => {
                named.push(local.clone());
            }
            ImportBinding::Named { imported, local } => {
                named.push(format!("{}: {local}", js_string(imported)));
            }
        }
    }
    if !named.is_empty() {
        out.push_str(&format!(" const {{ {} }} = {module};", named.join(", ")));
    }
    out
}

/// Require `id` and register what `export ... from` forwards.
fn reexport_bindings(kind: &ReExport, id: &str, slot: usize) -> String {
    let module = format!("__kiln_m{slot}");
    let require = format!("const {module} = {};", require_call(id));
    match kind {
        ReExport::Star => format!("{require} __kiln_export_star(__kiln_exports, {module});"),
        ReExport::StarAs(name) => format!(
            "{require} __kiln_export(__kiln_exports, {{ {}: () => {module} }});",
            js_string(name)
        ),
        ReExport::Named(pairs) => {
            let getters = pairs
                .iter()
                .map(|(exported, imported)| {
                    format!("{}: () => {module}[{}]", js_string(exported), js_string(imported))
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{require} __kiln_export(__kiln_exports, {{ {getters} }});")
        }
    }
}

/// Rewrite `module`'s import and export syntax against the runtime.
///
/// `id_of` maps an import path to the id the target was registered under.
fn rewrite_module(
    module: &Module,
    id_of: impl Fn(&Path) -> Option<String>,
) -> Result<Rewritten, StageError> {
    let source = module.source.as_str();
    let target_of = |specifier: &str| {
        module
            .import_path(specifier)
            .and_then(&id_of)
            .ok_or_else(|| {
                StageError::Invalid(format!(
                    "'{specifier}' imported from {} was not resolved",
                    module.id
                ))
            })
    };

    let mut edits = Vec::new();
    let mut exports = Vec::new();
    let mut hoisted = Vec::new();

    for (slot, stmt) in scan::statements(source, &module.id)?.into_iter().enumerate() {
        let text = match stmt.kind {
            StatementKind::Import {
                specifier,
                bindings,
            } => {
                hoisted.push(import_bindings(&bindings, &target_of(&specifier)?, slot));
                String::new()
            }
            StatementKind::ReExport { specifier, kind } => {
                hoisted.push(reexport_bindings(&kind, &target_of(&specifier)?, slot));
                String::new()
            }
            StatementKind::ExportList(pairs) => {
                exports.extend(pairs);
                String::new()
            }
            StatementKind::ExportDeclaration { names } => {
                exports.extend(names.into_iter().map(|name| (name.clone(), name)));
                String::new()
            }
            StatementKind::ExportDefault { name: Some(name) } => {
                exports.push(("default".to_string(), name));
                String::new()
            }
            StatementKind::ExportDefault { name: None } => "__kiln_exports.default = ".to_string(),
        };
        edits.push(Edit {
            range: stmt.range,
            text,
        });
    }

    let mut body = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        body.push_str(&source[cursor..edit.range.start]);
        body.push_str(&edit.text);
        let newlines = source[edit.range.clone()].matches('\n').count();
        body.extend(std::iter::repeat_n('\n', newlines));
        cursor = edit.range.end;
    }
    body.push_str(&source[cursor..]);

    Ok(Rewritten {
        exports,
        hoisted,
        body,
    })
}

/// Chunk file name for an entry: `src/app.mjs` becomes `app.js`.
pub fn chunk_name(entry: &Path) -> String {
    let stem = entry
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string());
    format!("{stem}.js")
}

pub struct BundleStage {
    source_maps: bool,
}

impl BundleStage {
    pub fn new(source_maps: bool) -> Self {
        Self { source_maps }
    }

    fn bundle_entry(
        &self,
        artifact: &Artifact,
        entry: &Path,
        file_name: &str,
    ) -> Result<Vec<OutputFile>, StageError> {
        let modules = artifact.reachable_from(entry);
        let entry_id = artifact
            .modules
            .get(entry)
            .map(|m| m.id.clone())
            .ok_or_else(|| StageError::Invalid(format!("entry {} was not resolved", entry.display())))?;

        let mut code = String::from("(function () {\n\"use strict\";\n");
        code.push_str(RUNTIME);
        let mut line = code.matches('\n').count() as u32;

        let mut map = self.source_maps.then(SourceMapBuilder::default);
        if let Some(builder) = map.as_mut() {
            builder.set_file(file_name);
        }

        for module in modules {
            if module.kind.is_foreign() {
                return Err(StageError::Invalid(format!(
                    "{} was not lowered before bundling",
                    module.id
                )));
            }
            let rewritten = rewrite_module(module, |path| {
                artifact.modules.get(path).map(|target| target.id.clone())
            })?;

            let getters = rewritten
                .exports
                .iter()
                .map(|(exported, local)| format!("{}: () => {local}", js_string(exported)))
                .collect::<Vec<_>>()
                .join(", ");
            code.push_str(&format!(
                "__kiln_define({}, function (__kiln_require, __kiln_exports) {{",
                js_string(&module.id)
            ));
            if !getters.is_empty() {
                code.push_str(&format!(" __kiln_export(__kiln_exports, {{ {getters} }});"));
            }
            for statement in &rewritten.hoisted {
                code.push(' ');
                code.push_str(statement);
            }
            code.push('\n');
            line += 1;

            // Compiler output has no meaningful mapping back to the foreign source
            let src_id = match (map.as_mut(), &module.kind) {
                (Some(builder), ModuleKind::Script) => {
                    Some(builder.add_source_and_content(&module.id, &module.source))
                }
                _ => None,
            };

            let body_lines = rewritten.body.lines().count() as u32;
            if let (Some(builder), Some(src_id)) = (map.as_mut(), src_id) {
                for src_line in 0..body_lines {
                    builder.add_token(line + src_line, 0, src_line, 0, Some(src_id), None);
                }
            }

            code.push_str(&rewritten.body);
            if !rewritten.body.ends_with('\n') {
                code.push('\n');
            }
            code.push_str("});\n");
            line += body_lines + 1;
        }

        code.push_str(&format!("{};\n}})();\n", require_call(&entry_id)));

        let mut files = Vec::with_capacity(2);
        match map {
            Some(builder) => {
                let map_name = format!("{file_name}.map");
                code.push_str(&format!("//# sourceMappingURL={map_name}\n"));
                files.push(OutputFile::script(file_name, code));
                files.push(OutputFile::source_map(
                    map_name,
                    builder.into_sourcemap().to_json_string(),
                ));
            }
            None => files.push(OutputFile::script(file_name, code)),
        }
        Ok(files)
    }
}

#[async_trait]
impl Stage for BundleStage {
    fn name(&self) -> &str {
        "bundle"
    }

    fn describe(&self) -> String {
        format!("bundle(sourcemap={})", self.source_maps)
    }

    async fn run(&self, mut artifact: Artifact) -> Result<Artifact, StageError> {
        let mut names = FxHashSet::default();
        let mut outputs = Vec::new();

        for entry in artifact.entries() {
            let file_name = chunk_name(entry);
            if !names.insert(file_name.clone()) {
                return Err(StageError::Invalid(format!(
                    "two entry points would both be written to '{file_name}'"
                )));
            }
            let files = self.bundle_entry(&artifact, entry, &file_name)?;
            tracing::debug!(chunk = %file_name, "bundled entry");
            outputs.extend(files);
        }

        artifact.outputs = outputs;
        Ok(artifact)
    }
}
