//! §4.7: nested `bash`/`sh` invocation and runtime word expansion.
//!
//! Nested shells run *in-process*, through a fresh [`super::Interpreter`]
//! sharing the parent's handlers and roots at `nested_depth + 1` — not by
//! shelling out to a real `bash` binary — so every hook still fires for
//! whatever the nested script does. `$(...)`/backtick command substitutions
//! found while expanding a word go through the same path: re-parsed,
//! re-validated against the current policy and declared-function set, and
//! run, never trusted as already-checked text just because the outer
//! command passed validation.

use super::hooks::{CallHandler, ExecHandler, ExecOutcome, OpenHandler};
use super::Interpreter;
use crate::config::PolicyConfig;
use crate::deadline::Deadline;
use crate::errors::SandboxError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parse a sourced file's contents for execution within the current
/// interpreter (as opposed to [`run_nested_program`], which both parses and
/// runs a fresh child).
pub fn parse_for_source(text: &str) -> Result<brush_parser::ast::Program, SandboxError> {
    parse(text)
}

fn parse(text: &str) -> Result<brush_parser::ast::Program, SandboxError> {
    let cursor = std::io::Cursor::new(text);
    let reader = std::io::BufReader::new(cursor);
    let options = brush_parser::ParserOptions::default();
    let source_info = brush_parser::SourceInfo::default();
    let mut parser = brush_parser::Parser::new(reader, &options, &source_info);
    parser
        .parse_program()
        .map_err(|e| SandboxError::Parse(e.to_string()))
}

/// Revalidate and run `text` in a fresh child interpreter at `depth`, given
/// an explicit set of handlers/roots/config rather than an existing
/// [`Interpreter`] — the shared core both [`run_nested_program`] (the
/// bash/sh path, which already has a parent `Interpreter` to read these
/// from) and [`run_script_path_form`] (the script-path-form `ExecHandler`
/// branch, which never had one to begin with) delegate to.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_program_with(
    config: &Arc<PolicyConfig>,
    work_dir: &Path,
    read_roots: &[PathBuf],
    write_roots: &[PathBuf],
    call_handler: Arc<dyn CallHandler>,
    open_handler: Arc<dyn OpenHandler>,
    exec_handler: Arc<dyn ExecHandler>,
    text: &str,
    env: HashMap<String, String>,
    depth: u32,
    deadline: Deadline,
) -> Result<ExecOutcome, SandboxError> {
    if deadline.expired() {
        return Err(SandboxError::DeadlineExceeded { partial_output: Vec::new() });
    }

    let program = parse(text)?;

    // Declared functions from the nested program alone — the outer
    // interpreter's already-declared functions are not inherited the way
    // POSIX function scoping isn't either; a nested bash/sh invocation
    // starts a fresh shell.
    let declared = crate::script::collect_functions_transitive(&program, work_dir);
    crate::script::validate_script_contents(
        &program,
        work_dir,
        read_roots,
        write_roots,
        config,
        &declared,
        depth,
        deadline,
    )?;

    let mut child = Interpreter::new(
        work_dir.to_path_buf(),
        env,
        read_roots.to_vec(),
        write_roots.to_vec(),
        depth,
        config.clone(),
        deadline,
        call_handler,
        open_handler,
        exec_handler,
    );
    child.run(&program).await?;
    Ok(ExecOutcome {
        output: child.take_output(),
        exit_code: child.exit_code(),
    })
}

/// Revalidate and run `text` in a child interpreter at `depth`, sharing the
/// parent's handlers, roots, and environment. Returns the captured output
/// and final exit status without mutating the parent interpreter's state
/// beyond what the caller explicitly folds back in.
async fn run_nested_program(
    interp: &Interpreter,
    text: &str,
    env: HashMap<String, String>,
    depth: u32,
) -> Result<ExecOutcome, SandboxError> {
    let (call_handler, open_handler, exec_handler) = interp.handlers();
    run_program_with(
        &interp.config,
        &interp.work_dir,
        &interp.read_roots,
        &interp.write_roots,
        call_handler,
        open_handler,
        exec_handler,
        text,
        env,
        depth,
        interp.deadline,
    )
    .await
}

/// Script-path-form `ExecHandler` branch (`spec.md` §4.6 ExecHandler bullet
/// 3, the non-binary case): read the script file (already path-checked by
/// the caller), prepend a `set --` prologue for any positional arguments,
/// and run it the same way a bare `bash script.sh arg1 arg2` would.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_script_path_form(
    config: &Arc<PolicyConfig>,
    work_dir: &Path,
    read_roots: &[PathBuf],
    write_roots: &[PathBuf],
    call_handler: Arc<dyn CallHandler>,
    open_handler: Arc<dyn OpenHandler>,
    exec_handler: Arc<dyn ExecHandler>,
    env: HashMap<String, String>,
    resolved_script: &Path,
    args: &[String],
    depth: u32,
    deadline: Deadline,
) -> Result<ExecOutcome, SandboxError> {
    if deadline.expired() {
        return Err(SandboxError::DeadlineExceeded { partial_output: Vec::new() });
    }

    let script_text = std::fs::read_to_string(resolved_script)
        .map_err(|e| SandboxError::SetupIo(e.to_string()))?;
    let prologue = if args.is_empty() {
        String::new()
    } else {
        let quoted: Vec<String> = args
            .iter()
            .map(|a| shlex::try_quote(a).map(|c| c.into_owned()).unwrap_or_else(|_| a.clone()))
            .collect();
        format!("set -- {}\n", quoted.join(" "))
    };
    run_program_with(
        config,
        work_dir,
        read_roots,
        write_roots,
        call_handler,
        open_handler,
        exec_handler,
        &format!("{prologue}{script_text}"),
        env,
        depth,
        deadline,
    )
    .await
}

/// `bash -c '...'`/`sh -c '...'` and bare `bash script.sh arg1 arg2` both
/// route here. Positional arguments for the script-file form are made
/// visible to the nested program via a synthesized `set --` prologue,
/// shell-quoted with `shlex` so an argument containing spaces or quotes
/// can't reinterpret the script.
pub async fn run_shell_invocation(
    interp: &Interpreter,
    args: &[String],
) -> Result<ExecOutcome, SandboxError> {
    if interp.nested_depth + 1 >= crate::script::MAX_DEPTH {
        return Err(SandboxError::validation(
            "script-nesting",
            args.join(" "),
            "script nesting depth exceeded",
        ));
    }

    let mut i = 0;
    let mut script_text: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();
    while i < args.len() {
        match args[i].as_str() {
            "-c" => {
                script_text = args.get(i + 1).cloned();
                positional = args.get(i + 2..).map(<[String]>::to_vec).unwrap_or_default();
                i = args.len();
            }
            "-o" => i += 2,
            flag if flag.starts_with('-') => i += 1,
            _ => {
                let resolved = crate::path::resolve(&args[i], &interp.work_dir);
                script_text = Some(
                    std::fs::read_to_string(&resolved)
                        .map_err(|e| SandboxError::SetupIo(e.to_string()))?,
                );
                positional = args.get(i + 1..).map(<[String]>::to_vec).unwrap_or_default();
                i = args.len();
            }
        }
    }

    let Some(script_text) = script_text else {
        return Err(SandboxError::validation(
            "bash-sh",
            args.join(" "),
            "nested shell invocation with no script or -c body",
        ));
    };

    let prologue = if positional.is_empty() {
        String::new()
    } else {
        let quoted: Vec<String> = positional.iter().map(|a| shlex::try_quote(a).map(|c| c.into_owned()).unwrap_or_else(|_| a.clone())).collect();
        format!("set -- {}\n", quoted.join(" "))
    };

    run_nested_program(interp, &format!("{prologue}{script_text}"), interp.env.clone(), interp.nested_depth + 1).await
}

/// Expand `raw`'s `$NAME`/`${NAME}` variable references and
/// `$(...)`/backtick command substitutions against `interp`'s current
/// environment. No IFS word-splitting or globbing — each substitution
/// expands to exactly one resulting string span.
pub async fn expand(interp: &mut Interpreter, raw: &str) -> Result<String, SandboxError> {
    let mut out = String::new();
    let mut chars = raw.char_indices().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some((idx, c)) = chars.next() {
        if c == '\'' && !in_double {
            in_single = !in_single;
            continue;
        }
        if in_single {
            out.push(c);
            continue;
        }
        if c == '"' {
            in_double = !in_double;
            continue;
        }
        if c == '\\' {
            if let Some(&(_, next)) = chars.peek() {
                out.push(next);
                chars.next();
            }
            continue;
        }
        if c == '`' {
            let rest = &raw[idx + 1..];
            if let Some(end) = rest.find('`') {
                let inner = &rest[..end];
                out.push_str(&run_substitution(interp, inner).await?);
                for _ in 0..=end {
                    chars.next();
                }
                continue;
            }
        }
        if c == '$' {
            if let Some(&(_, '(')) = chars.peek() {
                chars.next();
                let start = idx + 2;
                let mut depth = 1;
                let mut end = start;
                let bytes = raw.as_bytes();
                while end < bytes.len() && depth > 0 {
                    match bytes[end] {
                        b'(' => depth += 1,
                        b')' => depth -= 1,
                        _ => {}
                    }
                    if depth > 0 {
                        end += 1;
                    }
                }
                let inner = &raw[start..end.min(raw.len())];
                out.push_str(&run_substitution(interp, inner).await?);
                while chars.peek().map(|(i, _)| *i <= end).unwrap_or(false) {
                    chars.next();
                }
                continue;
            }
            if let Some(&(_, '{')) = chars.peek() {
                chars.next();
                let mut name = String::new();
                for (_, nc) in chars.by_ref() {
                    if nc == '}' {
                        break;
                    }
                    name.push(nc);
                }
                out.push_str(interp.env.get(&name).map(String::as_str).unwrap_or(""));
                continue;
            }
            let mut name = String::new();
            while let Some(&(_, nc)) = chars.peek() {
                if nc.is_alphanumeric() || nc == '_' {
                    name.push(nc);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                out.push('$');
            } else {
                out.push_str(interp.env.get(&name).map(String::as_str).unwrap_or(""));
            }
            continue;
        }
        out.push(c);
    }
    Ok(out)
}

async fn run_substitution(interp: &mut Interpreter, inner: &str) -> Result<String, SandboxError> {
    let outcome = run_nested_program(interp, inner, interp.env.clone(), interp.nested_depth + 1).await?;
    let text = String::from_utf8_lossy(&outcome.output);
    Ok(text.trim_end_matches('\n').to_string())
}
