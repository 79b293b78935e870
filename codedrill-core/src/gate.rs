//! Static import gate for untrusted submissions.
//!
//! Enumerates the modules a submission declares importing without executing
//! anything, using the tree-sitter Python grammar. The parse is syntax-only
//! and error-tolerant; a submission that does not parse at all is reported as
//! a compilation error, never waved through.
//!
//! Two policy modes exist because the two sandboxes draw their security
//! boundary differently:
//!
//! - the subprocess sandbox runs behind an OS process boundary and uses a
//!   **denylist** of modules that could spawn processes, open sockets, or
//!   reach into the host;
//! - the in-process interpreter has no such boundary, so its **allowlist**
//!   is the boundary: only [`SAFE_MODULES`] are bound into the interpreter
//!   and everything else fails to resolve.

use std::collections::BTreeSet;
use std::sync::{Mutex, OnceLock};

use crate::error::ExecError;

/// Modules a subprocess-sandboxed submission may never import.
///
/// Covers process spawning, raw networking (client and server), low-level OS
/// and syscall access, unsafe memory access, and signal handling.
pub const DENYLIST: &[&str] = &[
    "subprocess",
    "multiprocessing",
    "os",
    "socket",
    "ssl",
    "http",
    "urllib",
    "ctypes",
    "fcntl",
    "signal",
];

/// Standard-library modules the embedded interpreter exposes.
///
/// Filtered once at interpreter construction, never per request. Anything
/// absent here simply does not exist inside that interpreter.
pub const SAFE_MODULES: &[&str] = &[
    "math",
    "cmath",
    "json",
    "re",
    "string",
    "time",
    "itertools",
    "functools",
    "operator",
    "collections",
    "random",
    "statistics",
    "textwrap",
    "unicodedata",
];

/// Lazy-initialized tree-sitter Python parser (wrapped in a Mutex because
/// parsing requires `&mut`).
static PYTHON_PARSER: OnceLock<Mutex<tree_sitter::Parser>> = OnceLock::new();

fn python_parser() -> &'static Mutex<tree_sitter::Parser> {
    PYTHON_PARSER.get_or_init(|| {
        let mut parser = tree_sitter::Parser::new();
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&language)
            .expect("failed to load Python grammar");
        Mutex::new(parser)
    })
}

/// Policy applied to a submission's declared imports.
#[derive(Debug, Clone, Copy)]
enum PolicyMode {
    Deny(&'static [&'static str]),
    Allow(&'static [&'static str]),
}

/// Pre-execution import check.
#[derive(Debug, Clone, Copy)]
pub struct ImportGate {
    mode: PolicyMode,
}

impl ImportGate {
    /// Denylist gate for the subprocess sandbox, using [`DENYLIST`].
    pub fn denylist() -> Self {
        Self::with_denylist(DENYLIST)
    }

    pub fn with_denylist(forbidden: &'static [&'static str]) -> Self {
        Self {
            mode: PolicyMode::Deny(forbidden),
        }
    }

    /// Allowlist gate matching the embedded interpreter's [`SAFE_MODULES`]
    /// surface. The interpreter fails unknown imports closed on its own;
    /// this gate exists to produce a precise error before evaluation.
    pub fn allowlist() -> Self {
        Self::with_allowlist(SAFE_MODULES)
    }

    pub fn with_allowlist(permitted: &'static [&'static str]) -> Self {
        Self {
            mode: PolicyMode::Allow(permitted),
        }
    }

    /// Parses the submission and checks every declared import against the
    /// policy. Returns the full set of declared module paths on success.
    pub fn check(&self, source: &str) -> Result<BTreeSet<String>, ExecError> {
        let imports = declared_imports(source)?;
        for module in &imports {
            // `urllib.request` is judged both as itself and as `urllib`.
            let root = module.split('.').next().unwrap_or(module);
            let violation = match self.mode {
                PolicyMode::Deny(list) => {
                    list.contains(&module.as_str()) || list.contains(&root)
                }
                PolicyMode::Allow(list) => {
                    !list.contains(&module.as_str()) && !list.contains(&root)
                }
            };
            if violation {
                return Err(ExecError::SecurityViolation {
                    package: module.clone(),
                });
            }
        }
        Ok(imports)
    }
}

/// Enumerates every module path the source textually imports, anywhere in
/// the file (imports inside function bodies count too).
pub fn declared_imports(source: &str) -> Result<BTreeSet<String>, ExecError> {
    let guard = python_parser();
    let mut parser = guard
        .lock()
        .map_err(|_| ExecError::Compilation("parser is poisoned".to_owned()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ExecError::Compilation("failed to parse submission".to_owned()))?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(ExecError::Compilation(
            "submission contains a syntax error".to_owned(),
        ));
    }

    let mut imports = BTreeSet::new();
    collect_imports(root, source, &mut imports);
    Ok(imports)
}

fn collect_imports(node: tree_sitter::Node, source: &str, out: &mut BTreeSet<String>) {
    match node.kind() {
        // `import a.b, c as d`
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "dotted_name" => push_module(child, source, out),
                    "aliased_import" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            push_module(name, source, out);
                        }
                    }
                    _ => {}
                }
            }
        }
        // `from x.y import z`: the imported names live inside x.y, so only
        // the module path matters for policy.
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                push_module(module, source, out);
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_imports(child, source, out);
    }
}

fn push_module(node: tree_sitter::Node, source: &str, out: &mut BTreeSet<String>) {
    if let Ok(text) = node.utf8_text(source.as_bytes()) {
        // Relative imports (`from . import x`) resolve inside the submission
        // itself and carry no policy weight once the dots are stripped.
        let module = text.trim_start_matches('.');
        if !module.is_empty() {
            out.insert(module.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_plain_and_aliased_imports() {
        let imports =
            declared_imports("import json\nimport collections as c\n").unwrap();
        assert!(imports.contains("json"));
        assert!(imports.contains("collections"));
    }

    #[test]
    fn collects_from_imports_by_module() {
        let imports = declared_imports("from math import sqrt\n").unwrap();
        assert!(imports.contains("math"));
        assert!(!imports.contains("sqrt"));
    }

    #[test]
    fn collects_imports_inside_functions() {
        let source = "def f():\n    import socket\n    return socket\n";
        let imports = declared_imports(source).unwrap();
        assert!(imports.contains("socket"));
    }

    #[test]
    fn syntax_error_is_a_compilation_error() {
        let err = declared_imports("def broken(:\n").unwrap_err();
        assert!(matches!(err, ExecError::Compilation(_)));
    }

    #[test]
    fn denylist_rejects_with_the_offending_package() {
        let gate = ImportGate::denylist();
        let err = gate.check("import subprocess\n").unwrap_err();
        match err {
            ExecError::SecurityViolation { package } => assert_eq!(package, "subprocess"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn denylist_catches_submodules_of_forbidden_packages() {
        let gate = ImportGate::denylist();
        let err = gate.check("from urllib.request import urlopen\n").unwrap_err();
        assert!(matches!(err, ExecError::SecurityViolation { .. }));
    }

    #[test]
    fn denylist_passes_harmless_imports() {
        let gate = ImportGate::denylist();
        let imports = gate.check("import math\nfrom json import loads\n").unwrap();
        assert_eq!(imports.len(), 2);
    }

    #[test]
    fn allowlist_rejects_anything_not_listed() {
        let gate = ImportGate::allowlist();
        assert!(gate.check("import math\n").is_ok());
        assert!(matches!(
            gate.check("import socket\n"),
            Err(ExecError::SecurityViolation { .. })
        ));
    }
}
