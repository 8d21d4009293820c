//! Static import/export extraction for JavaScript modules.
//!
//! Modules are parsed with `oxc_parser`; only top-level module declarations
//! are collected, so import-shaped text inside comments, strings or template
//! literals is never mistaken for a dependency. Dynamic `import()` is left
//! alone.

use crate::stage::StageError;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, BindingPatternKind, Declaration, ExportDefaultDeclarationKind,
    ImportDeclarationSpecifier, ModuleDeclaration, ModuleExportName,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use std::ops::Range;

/// One binding introduced by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImportBinding {
    /// `import local from "x"`
    Default { local: String },
    /// `import * as local from "x"`
    Namespace { local: String },
    /// `import { imported as local } from "x"`
    Named { imported: String, local: String },
}

/// Shape of an `export ... from "x"` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReExport {
    /// `export * from "x"`
    Star,
    /// `export * as name from "x"`
    StarAs(String),
    /// `export { imported as exported } from "x"`, as `(exported, imported)`
    Named(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StatementKind {
    /// Static import. No bindings means a side-effect only import.
    Import {
        specifier: String,
        bindings: Vec<ImportBinding>,
    },
    ReExport { specifier: String, kind: ReExport },
    /// `export { local as exported }` with no source, as `(exported, local)`
    ExportList(Vec<(String, String)>),
    /// `export const|let|var|function|class ...`; `range` covers only the
    /// `export` keyword
    ExportDeclaration { names: Vec<String> },
    /// `export default ...`; `range` covers `export default`. `name` is set
    /// for named function and class declarations.
    ExportDefault { name: Option<String> },
}

/// A module declaration and the source range it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Statement {
    pub range: Range<usize>,
    pub kind: StatementKind,
}

impl Statement {
    /// The module this statement pulls in, if any.
    pub fn specifier(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Import { specifier, .. } | StatementKind::ReExport { specifier, .. } => {
                Some(specifier)
            }
            _ => None,
        }
    }
}

fn range(span: Span) -> Range<usize> {
    span.start as usize..span.end as usize
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

fn collect_bound_names(pattern: &BindingPattern<'_>, names: &mut Vec<String>) {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(ident) => names.push(ident.name.to_string()),
        BindingPatternKind::ObjectPattern(object) => {
            for property in &object.properties {
                collect_bound_names(&property.value, names);
            }
            if let Some(rest) = &object.rest {
                collect_bound_names(&rest.argument, names);
            }
        }
        BindingPatternKind::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                collect_bound_names(element, names);
            }
            if let Some(rest) = &array.rest {
                collect_bound_names(&rest.argument, names);
            }
        }
        BindingPatternKind::AssignmentPattern(assignment) => {
            collect_bound_names(&assignment.left, names);
        }
    }
}

fn declared_names(declaration: &Declaration<'_>, module_id: &str) -> Result<Vec<String>, StageError> {
    let mut names = Vec::new();
    match declaration {
        Declaration::VariableDeclaration(var) => {
            for declarator in &var.declarations {
                collect_bound_names(&declarator.id, &mut names);
            }
        }
        Declaration::FunctionDeclaration(func) => {
            names.extend(func.id.as_ref().map(|id| id.name.to_string()));
        }
        Declaration::ClassDeclaration(class) => {
            names.extend(class.id.as_ref().map(|id| id.name.to_string()));
        }
        _ => {
            return Err(StageError::Invalid(format!(
                "unsupported export declaration in {module_id}"
            )));
        }
    }
    Ok(names)
}

/// Parse `source` and return its module declarations in source order.
///
/// `module_id` is only used in error messages.
pub(crate) fn statements(source: &str, module_id: &str) -> Result<Vec<Statement>, StageError> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::mjs()).parse();

    if let Some(error) = parsed.errors.first() {
        return Err(StageError::Invalid(format!(
            "failed to parse {module_id}: {error}"
        )));
    }

    let mut found = Vec::new();
    for stmt in &parsed.program.body {
        let Some(declaration) = stmt.as_module_declaration() else {
            continue;
        };
        let kind = match declaration {
            ModuleDeclaration::ImportDeclaration(import) => {
                let bindings = import
                    .specifiers
                    .iter()
                    .flatten()
                    .map(|spec| match spec {
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                            ImportBinding::Default {
                                local: default.local.name.to_string(),
                            }
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => {
                            ImportBinding::Namespace {
                                local: namespace.local.name.to_string(),
                            }
                        }
                        ImportDeclarationSpecifier::ImportSpecifier(named) => ImportBinding::Named {
                            imported: export_name(&named.imported),
                            local: named.local.name.to_string(),
                        },
                    })
                    .collect();
                Statement {
                    range: range(import.span),
                    kind: StatementKind::Import {
                        specifier: import.source.value.to_string(),
                        bindings,
                    },
                }
            }
            ModuleDeclaration::ExportAllDeclaration(all) => Statement {
                range: range(all.span),
                kind: StatementKind::ReExport {
                    specifier: all.source.value.to_string(),
                    kind: match &all.exported {
                        Some(name) => ReExport::StarAs(export_name(name)),
                        None => ReExport::Star,
                    },
                },
            },
            ModuleDeclaration::ExportNamedDeclaration(named) => {
                let pairs = || {
                    named
                        .specifiers
                        .iter()
                        .map(|spec| (export_name(&spec.exported), export_name(&spec.local)))
                        .collect::<Vec<_>>()
                };
                match (&named.source, &named.declaration) {
                    (Some(source), _) => Statement {
                        range: range(named.span),
                        kind: StatementKind::ReExport {
                            specifier: source.value.to_string(),
                            kind: ReExport::Named(pairs()),
                        },
                    },
                    (None, Some(decl)) => Statement {
                        range: named.span.start as usize..decl.span().start as usize,
                        kind: StatementKind::ExportDeclaration {
                            names: declared_names(decl, module_id)?,
                        },
                    },
                    (None, None) => Statement {
                        range: range(named.span),
                        kind: StatementKind::ExportList(pairs()),
                    },
                }
            }
            ModuleDeclaration::ExportDefaultDeclaration(default) => {
                let name = match &default.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        func.id.as_ref().map(|id| id.name.to_string())
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        class.id.as_ref().map(|id| id.name.to_string())
                    }
                    _ => None,
                };
                Statement {
                    range: default.span.start as usize..default.declaration.span().start as usize,
                    kind: StatementKind::ExportDefault { name },
                }
            }
            _ => {
                return Err(StageError::Invalid(format!(
                    "unsupported module syntax in {module_id}"
                )));
            }
        };
        found.push(kind);
    }
    Ok(found)
}

/// Unique import and re-export specifiers in first-seen order.
pub(crate) fn specifiers(source: &str, module_id: &str) -> Result<Vec<String>, StageError> {
    let mut seen: Vec<String> = Vec::new();
    for stmt in statements(source, module_id)? {
        let Some(specifier) = stmt.specifier() else {
            continue;
        };
        if !seen.iter().any(|s| s == specifier) {
            seen.push(specifier.to_string());
        }
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(source: &str) -> Vec<String> {
        specifiers(source, "test.js").unwrap()
    }

    #[test]
    fn finds_import_forms() {
        let source = r#"import Elm from "./src/Main.elm";
import "rapidoc";
import { a, b as c } from './util.js';
import * as ns from "./ns.js"
import def, { named } from "./both.js";
"#;
        assert_eq!(
            specs(source),
            vec![
                "./src/Main.elm",
                "rapidoc",
                "./util.js",
                "./ns.js",
                "./both.js"
            ]
        );
    }

    #[test]
    fn import_bindings() {
        let stmts = statements("import def, { a as b, c } from './x.js';", "test.js").unwrap();
        assert_eq!(
            stmts[0].kind,
            StatementKind::Import {
                specifier: "./x.js".to_string(),
                bindings: vec![
                    ImportBinding::Default {
                        local: "def".to_string()
                    },
                    ImportBinding::Named {
                        imported: "a".to_string(),
                        local: "b".to_string()
                    },
                    ImportBinding::Named {
                        imported: "c".to_string(),
                        local: "c".to_string()
                    },
                ],
            }
        );
    }

    #[test]
    fn side_effect_import_has_no_bindings() {
        let stmts = statements("import './polyfill.js';", "test.js").unwrap();
        assert_eq!(
            stmts[0].kind,
            StatementKind::Import {
                specifier: "./polyfill.js".to_string(),
                bindings: vec![],
            }
        );
        assert_eq!(stmts[0].range, 0..23);
    }

    #[test]
    fn re_exports_are_found_in_order() {
        let source = "export * from './a.js';\nimport x from './b.js';\nexport { y as z } from './c.js';\nexport * as all from './d.js';\n";
        assert_eq!(specs(source), vec!["./a.js", "./b.js", "./c.js", "./d.js"]);

        let stmts = statements(source, "test.js").unwrap();
        assert!(matches!(
            &stmts[2].kind,
            StatementKind::ReExport { kind: ReExport::Named(pairs), .. }
                if pairs == &[("z".to_string(), "y".to_string())]
        ));
        assert!(matches!(
            &stmts[3].kind,
            StatementKind::ReExport { kind: ReExport::StarAs(name), .. } if name == "all"
        ));
    }

    #[test]
    fn declarations_mid_line_are_found() {
        let source = "class R extends Object{};customElements;export{R as RapiDoc};import'./side.js';";
        let stmts = statements(source, "rapidoc-min.js").unwrap();
        assert_eq!(
            stmts[0].kind,
            StatementKind::ExportList(vec![("RapiDoc".to_string(), "R".to_string())])
        );
        assert_eq!(&source[stmts[0].range.clone()], "export{R as RapiDoc};");
        assert_eq!(stmts[1].specifier(), Some("./side.js"));
    }

    #[test]
    fn export_keyword_ranges() {
        let source = "export const { a, b: [c] } = obj;\nexport default function main() {}\n";
        let stmts = statements(source, "test.js").unwrap();
        assert_eq!(&source[stmts[0].range.clone()], "export ");
        assert_eq!(
            stmts[0].kind,
            StatementKind::ExportDeclaration {
                names: vec!["a".to_string(), "c".to_string()]
            }
        );
        assert_eq!(&source[stmts[1].range.clone()], "export default ");
        assert_eq!(
            stmts[1].kind,
            StatementKind::ExportDefault {
                name: Some("main".to_string())
            }
        );
    }

    #[test]
    fn imports_in_comments_and_strings_are_ignored() {
        let source = "/* usage:\nimport x from './not-there.js';\n*/\nconst doc = `\nimport y from './nope.js';\n`;\n// import z from './z.js';\nconst s = \"export { a }\";\n";
        assert!(statements(source, "test.js").unwrap().is_empty());
    }

    #[test]
    fn dynamic_import_and_identifiers_are_ignored() {
        let source = "const m = import('./lazy.js');\nconst important = 1;\nimportScripts('x.js');\n";
        assert!(statements(source, "test.js").unwrap().is_empty());
    }

    #[test]
    fn duplicate_specifiers_collapse() {
        let source = "import a from './x.js';\nimport { b } from './x.js';\n";
        assert_eq!(specs(source), vec!["./x.js"]);
    }

    #[test]
    fn syntax_errors_name_the_module() {
        let err = statements("import { from './x.js';", "broken.js").unwrap_err();
        assert!(err.to_string().contains("failed to parse broken.js"));
    }
}
