//! Script-transitive validator (`spec.md` §4.4): when a command invokes a
//! script by path, or sources one, read that file and recursively apply
//! §4.1/§4.2 to its contents, up to a bounded nesting depth.
//!
//! Two passes over the same "what scripts does this program reference"
//! traversal: [`collect_functions_transitive`] runs first and gathers every
//! function name declared inline or in a (transitively) sourced file, so
//! that the command-name rule in §4.1 can already see them; then
//! [`validate_script_contents`] re-walks the tree applying the full
//! validator and path checker to each referenced file's own contents.

use crate::binary_magic;
use crate::config::PolicyConfig;
use crate::deadline::Deadline;
use crate::errors::SandboxError;
use crate::path;
use crate::shell::{self, ast};
use std::collections::HashSet;
use std::path::{Path as StdPath, PathBuf};

pub const MAX_DEPTH: u32 = 10;

/// Strip a leading `#!...` shebang line before parsing — the shell frontend
/// has no special handling for it, so leaving it in would otherwise parse
/// as a comment-like token that differs across dialects.
fn strip_shebang(content: &str) -> &str {
    if let Some(rest) = content.strip_prefix("#!") {
        if let Some(newline) = rest.find('\n') {
            return &rest[newline + 1..];
        }
        return "";
    }
    content
}

fn parse_script(content: &str) -> Result<ast::Program, SandboxError> {
    let stripped = strip_shebang(content);
    let cursor = std::io::Cursor::new(stripped);
    let reader = std::io::BufReader::new(cursor);
    let options = brush_parser::ParserOptions::default();
    let source_info = brush_parser::SourceInfo::default();
    let mut parser = brush_parser::Parser::new(reader, &options, &source_info);
    parser
        .parse_program()
        .map_err(|e| SandboxError::Parse(e.to_string()))
}

/// Flag-skipping identical to the `bash`/`sh` argument validator: find the
/// first positional (non-flag, non-`-o`-value) word.
fn first_positional(words: &[String]) -> Option<&str> {
    let mut i = 1;
    while i < words.len() {
        let word = &words[i];
        if word == "-o" {
            i += 2;
            continue;
        }
        if word.starts_with('-') {
            i += 1;
            continue;
        }
        return Some(word);
    }
    None
}

/// The literal paths this program's simple commands reference as scripts:
/// script-path-form command names, `bash`/`sh` invocations with a script
/// file (no `-c`), and `source`/`.` arguments.
fn referenced_scripts(program: &ast::Program) -> Vec<String> {
    let mut referenced = Vec::new();
    shell::walk_simple_commands(program, &mut |cmd| {
        let words = shell::literal_words(cmd);
        let Some(name) = words.first() else {
            return;
        };
        if shell::is_script_path_form(name) {
            referenced.push(name.clone());
        } else if (name == "bash" || name == "sh") && !words.iter().any(|w| w == "-c") {
            if let Some(script) = first_positional(&words) {
                referenced.push(script.to_string());
            }
        } else if name == "source" || name == "." {
            if let Some(script) = words.get(1) {
                referenced.push(script.clone());
            }
        }
    });
    referenced
}

/// Read, parse, and recursively collect function names from whatever
/// `literal_path` resolves to. Fails open on any I/O or parse problem and
/// on a compiled binary, and simply stops descending past [`MAX_DEPTH`] —
/// depth errors are only ever raised by [`validate_script_contents`].
fn collect_from_referenced(
    literal_path: &str,
    work_dir: &StdPath,
    depth: u32,
    names: &mut HashSet<String>,
) {
    if depth >= MAX_DEPTH {
        return;
    }
    let resolved = path::resolve(literal_path, work_dir);
    if binary_magic::is_compiled_binary(&resolved) {
        return;
    }
    let Ok(content) = std::fs::read_to_string(&resolved) else {
        return;
    };
    let Ok(program) = parse_script(&content) else {
        return;
    };
    names.extend(shell::collect_declared_functions(&program));
    let next_dir = resolved.parent().unwrap_or(work_dir);
    for child in referenced_scripts(&program) {
        collect_from_referenced(&child, next_dir, depth + 1, names);
    }
}

/// Collect every function name declared inline in `program`, plus (bounded
/// by [`MAX_DEPTH`]) those declared in files it transitively references by
/// path, `bash`/`sh script`, or `source`/`.`.
pub fn collect_functions_transitive(program: &ast::Program, work_dir: &StdPath) -> HashSet<String> {
    let mut names = shell::collect_declared_functions(program);
    for child in referenced_scripts(program) {
        collect_from_referenced(&child, work_dir, 0, &mut names);
    }
    names
}

/// Recursively validate the file `literal_path` resolves to, at `depth`.
/// Fails open (accepts) only when the file cannot be read — at preflight
/// time it may not exist yet; runtime re-validates once it does.
fn validate_referenced_script(
    literal_path: &str,
    work_dir: &StdPath,
    read_roots: &[PathBuf],
    write_roots: &[PathBuf],
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
    depth: u32,
    deadline: Deadline,
) -> Result<(), SandboxError> {
    if depth >= MAX_DEPTH {
        return Err(SandboxError::validation(
            "script-nesting",
            literal_path.to_string(),
            "script nesting depth exceeded",
        ));
    }

    if deadline.expired() {
        return Err(SandboxError::DeadlineExceeded { partial_output: Vec::new() });
    }

    let resolved = path::resolve(literal_path, work_dir);

    if binary_magic::is_compiled_binary(&resolved) {
        // Compiled binaries are opaque to static analysis; the runtime
        // exec-handler decides whether local_binary_execution permits
        // running them.
        return Ok(());
    }

    let content = match std::fs::read_to_string(&resolved) {
        Ok(content) => content,
        Err(_) => return Ok(()),
    };

    let program = parse_script(&content).map_err(|e| SandboxError::ScriptTransitive {
        script_path: resolved.clone(),
        source: Box::new(e),
    })?;

    validate_script_contents(
        &program,
        resolved.parent().unwrap_or(work_dir),
        read_roots,
        write_roots,
        config,
        declared_functions,
        depth + 1,
        deadline,
    )
    .map_err(|e| SandboxError::ScriptTransitive {
        script_path: resolved,
        source: Box::new(e),
    })
}

/// Apply §4.1 and §4.2 to `program` itself, then recursively do the same to
/// every script it references, up to [`MAX_DEPTH`]. `deadline` is checked
/// before each referenced-script read, since a command can transitively
/// reference many nested scripts and this is the suspension point (file
/// reads) the preflight validator itself performs.
#[allow(clippy::too_many_arguments)]
pub fn validate_script_contents(
    program: &ast::Program,
    work_dir: &StdPath,
    read_roots: &[PathBuf],
    write_roots: &[PathBuf],
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
    depth: u32,
    deadline: Deadline,
) -> Result<(), SandboxError> {
    crate::validate::validate(program, config, declared_functions)?;
    path::validate_paths(program, work_dir, read_roots, write_roots)?;
    path::validate_redirect_paths(program, work_dir, read_roots)?;

    for literal_path in referenced_scripts(program) {
        validate_referenced_script(
            &literal_path,
            work_dir,
            read_roots,
            write_roots,
            config,
            declared_functions,
            depth,
            deadline,
        )?;
    }
    Ok(())
}
