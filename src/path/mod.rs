//! Path-boundary checker (`spec.md` §4.2): pure functions that classify an
//! argument as path-like, resolve it to an absolute, symlink-canonical form,
//! and prove containment under a caller-supplied root.

use crate::errors::SandboxError;
use crate::shell;
use brush_parser::ast;
use std::path::{Component, Path, PathBuf};

/// Commands whose path-like arguments are checked against `writeRoots`
/// instead of `readRoots` (`spec.md` §4.1 "Write-commands set").
pub const WRITE_COMMANDS: &[&str] = &["cp", "mv", "rm", "touch", "chmod", "ln", "sed", "mkdir"];

pub fn is_write_command(name: &str) -> bool {
    WRITE_COMMANDS.contains(&name)
}

/// Extract an embedded path value from a flag-shaped token.
///
/// `--key=val` → `val`; `-X<rest>` with `len(token) >= 3` → `<rest>`;
/// anything else (bare `-X`, bare `--key`, non-flag tokens) → `None`.
pub fn extract_path_from_flag(token: &str) -> Option<&str> {
    if let Some(rest) = token.strip_prefix("--") {
        return rest.split_once('=').map(|(_, v)| v);
    }
    if let Some(rest) = token.strip_prefix('-') {
        if !rest.is_empty() && token.len() >= 3 {
            return Some(&token[2..]);
        }
    }
    None
}

/// Does `candidate` look like a path per `spec.md` §4.2 step 3?
pub fn looks_like_path(candidate: &str) -> bool {
    candidate.starts_with('/')
        || candidate.starts_with("./")
        || candidate.starts_with("../")
        || candidate == "."
        || candidate == ".."
        || candidate.contains('/')
}

/// Lexically normalize a path (resolve `.`/`..` components without touching
/// the filesystem). Used both as a fallback when a path doesn't exist and as
/// a pre-step before symlink resolution.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if matches!(out.last(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Resolve symlinks over the *longest existing ancestor prefix* of `path`,
/// re-joining whatever suffix doesn't yet exist. This is what lets
/// `touch dir/new-file` reason about `dir`'s symlink target rather than the
/// nonexistent `new-file` leaf (`spec.md` §4.2 rationale).
pub fn resolve_longest_existing_prefix(path: &Path) -> PathBuf {
    if let Ok(canon) = path.canonicalize() {
        return canon;
    }
    let mut remainder = Vec::new();
    let mut probe = path.to_path_buf();
    loop {
        if probe.as_os_str().is_empty() {
            break;
        }
        if let Ok(canon) = probe.canonicalize() {
            let mut result = canon;
            for part in remainder.into_iter().rev() {
                result.push(part);
            }
            return result;
        }
        match probe.file_name() {
            Some(name) => {
                remainder.push(name.to_os_string());
                probe = probe
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("/"));
            }
            None => break,
        }
    }
    lexical_normalize(path)
}

/// Resolve a (possibly relative) candidate path against `work_dir`, following
/// symlinks over the longest existing prefix.
pub fn resolve(candidate: &str, work_dir: &Path) -> PathBuf {
    let joined = if Path::new(candidate).is_absolute() {
        PathBuf::from(candidate)
    } else {
        work_dir.join(candidate)
    };
    let normalized = lexical_normalize(&joined);
    resolve_longest_existing_prefix(&normalized)
}

/// Containment test: `resolved` equals `root` or is a proper descendant of it.
pub fn is_contained(resolved: &Path, root: &Path) -> bool {
    if resolved == root {
        return true;
    }
    resolved
        .strip_prefix(root)
        .map(|rest| !rest.as_os_str().is_empty())
        .unwrap_or(false)
}

pub fn is_contained_in_any(resolved: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| is_contained(resolved, root))
}

/// A resolved path containing a `.git` component is always denied, even when
/// the working directory itself is an allowed root — prevents hook scripts
/// and config tampering.
pub fn touches_git_dir(resolved: &Path) -> bool {
    resolved
        .components()
        .any(|c| c.as_os_str() == ".git")
}

/// Check containment for a single resolved candidate against the
/// appropriate root set, producing the structured error §4.2 calls for.
fn check_containment(literal: &str, resolved: &Path, roots: &[PathBuf]) -> Result<(), SandboxError> {
    if touches_git_dir(resolved) {
        return Err(SandboxError::PathBoundary {
            literal: literal.to_string(),
            resolved: resolved.to_path_buf(),
        });
    }
    if is_contained_in_any(resolved, roots) {
        Ok(())
    } else {
        Err(SandboxError::PathBoundary {
            literal: literal.to_string(),
            resolved: resolved.to_path_buf(),
        })
    }
}

/// Runtime counterpart of [`validate_paths`]: apply the same per-argument
/// rule to an already fully-expanded argument vector, the way
/// [`crate::interp::hooks::CallHandler::on_call`] re-checks a call right
/// before it runs (`spec.md` §4.6 — "re-apply §4.2 on the already-expanded
/// argument vector").
pub fn check_call_args(
    name: &str,
    args: &[String],
    work_dir: &Path,
    read_roots: &[PathBuf],
    write_roots: &[PathBuf],
) -> Result<(), SandboxError> {
    let roots = if is_write_command(name) { write_roots } else { read_roots };
    for arg in args {
        if arg.is_empty() {
            continue;
        }
        let candidate = extract_path_from_flag(arg).unwrap_or(arg);
        if !looks_like_path(candidate) {
            continue;
        }
        let resolved = resolve(candidate, work_dir);
        check_containment(arg, &resolved, roots)?;
    }
    Ok(())
}

/// Runtime counterpart used by [`crate::interp::hooks::OpenHandler::on_open`]:
/// a single resolved path, already known to be a read or a write by the
/// caller from the open flags rather than the write-commands heuristic.
pub fn check_open_path(
    resolved: &Path,
    for_write: bool,
    read_roots: &[PathBuf],
    write_roots: &[PathBuf],
) -> Result<(), SandboxError> {
    let roots = if for_write { write_roots } else { read_roots };
    check_containment(&resolved.display().to_string(), resolved, roots)
}

/// §4.2 "algorithm for each argument of each call-expression": walk every
/// simple command in `program`, resolve each path-like plain or
/// flag-embedded argument, and prove containment in the root set selected
/// by whether the command is in the write-commands set.
pub fn validate_paths(
    program: &ast::Program,
    work_dir: &Path,
    read_roots: &[PathBuf],
    write_roots: &[PathBuf],
) -> Result<(), SandboxError> {
    let mut result = Ok(());
    shell::walk_simple_commands(program, &mut |cmd| {
        if result.is_err() {
            return;
        }
        let Some(name) = shell::command_name(cmd) else {
            return;
        };
        let roots = if is_write_command(&name) { write_roots } else { read_roots };
        for word in shell::literal_words(cmd).into_iter().skip(1) {
            if word.is_empty() {
                continue;
            }
            let candidate = extract_path_from_flag(&word).unwrap_or(&word);
            if !looks_like_path(candidate) {
                continue;
            }
            let resolved = resolve(candidate, work_dir);
            if let Err(e) = check_containment(&word, &resolved, roots) {
                result = Err(e);
                return;
            }
        }
    });
    result
}

/// The redirect-target half of §4.2: only input redirects (`<`) carry a
/// path worth checking — output redirects are restricted to `/dev/null` by
/// the validator, and read-write redirects are denied outright.
pub fn validate_redirect_paths(
    program: &ast::Program,
    work_dir: &Path,
    read_roots: &[PathBuf],
) -> Result<(), SandboxError> {
    let mut result = Ok(());
    shell::walk_simple_commands(program, &mut |cmd| {
        if result.is_err() {
            return;
        }
        for redirect in shell::redirects(cmd) {
            if let ast::IoRedirect::File(_, ast::IoFileRedirectKind::Read, ast::IoFileRedirectTarget::Filename(word)) =
                redirect
            {
                let literal = shell::literal_view(word);
                if literal.is_empty() {
                    continue;
                }
                let resolved = resolve(&literal, work_dir);
                if let Err(e) = check_containment(&literal, &resolved, read_roots) {
                    result = Err(e);
                    return;
                }
            }
        }
    });
    result
}

#[cfg(test)]
mod tests;
