//! In-process sandbox: a fresh RustPython interpreter per submission with a
//! reduced standard-library surface.
//!
//! Used where no OS process boundary exists (the browser build). The
//! allowlist is the entire security boundary here: only the native modules
//! named in [`crate::gate::SAFE_MODULES`] are registered, so any other
//! import fails to resolve. There is no timeout in this mode; the hosting
//! environment owns the wall-clock budget.

use async_trait::async_trait;
use rustpython_vm::{self as vm, compiler::Mode, scope::Scope, VirtualMachine};

use crate::error::ExecError;
use crate::gate::SAFE_MODULES;
use crate::sandbox::Sandbox;

/// Swaps the interpreter's output streams for in-memory buffers before any
/// submission code runs.
const CAPTURE_PRELUDE: &str = "\
import sys, io
sys.stdout = io.StringIO()
sys.stderr = io.StringIO()
";

/// Runs submissions inside an embedded interpreter. Stateless: every call
/// constructs a fresh interpreter, so nothing crosses submissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterSandbox;

impl InterpreterSandbox {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Sandbox for InterpreterSandbox {
    async fn run(&self, source: &str) -> Result<String, ExecError> {
        evaluate(source)
    }
}

fn safe_module(name: &str) -> bool {
    // Native modules backing a stdlib module are registered under a leading
    // underscore; admit them when their public counterpart is allowlisted.
    SAFE_MODULES.contains(&name.trim_start_matches('_'))
}

fn evaluate(source: &str) -> Result<String, ExecError> {
    let interpreter = vm::Interpreter::with_init(vm::Settings::default(), |vm| {
        vm.add_native_modules(
            rustpython_stdlib::get_module_inits()
                .filter(|(name, _)| safe_module(name.as_ref())),
        );
    });

    interpreter.enter(|vm| {
        let scope = vm.new_scope_with_builtins();

        let prelude = vm
            .compile(CAPTURE_PRELUDE, Mode::Exec, "<capture>".to_owned())
            .map_err(|err| ExecError::Compilation(err.to_string()))?;
        if vm.run_code_obj(prelude, scope.clone()).is_err() {
            return Err(ExecError::ExecutionFailure {
                reason: "failed to redirect interpreter output".to_owned(),
                output: String::new(),
            });
        }

        let code = vm
            .compile(source, Mode::Exec, "<submission>".to_owned())
            .map_err(|err| ExecError::Compilation(err.to_string()))?;

        let result = vm.run_code_obj(code, scope.clone());

        // Buffered output is read back even after a failure; partial output
        // before an error is diagnostically useful.
        let output = captured_output(vm, &scope);

        match result {
            Ok(_) => Ok(output),
            Err(exc) => {
                let mut reason = String::new();
                if vm.write_exception(&mut reason, &exc).is_err() {
                    reason = "interpreter raised an unprintable exception".to_owned();
                }
                Err(ExecError::ExecutionFailure {
                    reason: reason.trim().to_owned(),
                    output,
                })
            }
        }
    })
}

fn captured_output(vm: &VirtualMachine, scope: &Scope) -> String {
    let stdout = read_buffer(vm, scope, "sys.stdout.getvalue()");
    let stderr = read_buffer(vm, scope, "sys.stderr.getvalue()");
    let mut text = stdout;
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}

fn read_buffer(vm: &VirtualMachine, scope: &Scope, expr: &str) -> String {
    let Ok(code) = vm.compile(expr, Mode::Eval, "<capture>".to_owned()) else {
        return String::new();
    };
    match vm.run_code_obj(code, scope.clone()) {
        Ok(value) => value
            .str(vm)
            .map(|s| s.as_str().to_owned())
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_printed_output() {
        let output = evaluate("print(1 + 2)").unwrap();
        assert_eq!(output.trim(), "3");
    }

    #[test]
    fn syntax_error_is_a_compilation_error() {
        let err = evaluate("def broken(:").unwrap_err();
        assert!(matches!(err, ExecError::Compilation(_)));
    }

    #[test]
    fn runtime_error_keeps_partial_output() {
        let err = evaluate("print('before')\nraise ValueError('boom')").unwrap_err();
        match err {
            ExecError::ExecutionFailure { reason, output } => {
                assert!(output.contains("before"));
                assert!(reason.contains("ValueError"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unlisted_modules_fail_closed() {
        let err = evaluate("import socket").unwrap_err();
        assert!(matches!(err, ExecError::ExecutionFailure { .. }));
    }

    #[test]
    fn interpreter_state_does_not_cross_submissions() {
        evaluate("leaked = 42").unwrap();
        let err = evaluate("print(leaked)").unwrap_err();
        assert!(matches!(err, ExecError::ExecutionFailure { .. }));
    }
}
