use crate::config::PolicyConfig;
use crate::errors::SandboxError;
use std::collections::HashSet;

const VALUE_CONSUMING_GLOBAL_FLAGS: &[&str] = &[
    "-C", "-c", "--git-dir", "--work-tree", "--namespace", "--super-prefix", "--config-env",
];

const ALWAYS_BLOCKED: &[&str] = &["hook", "filter-branch"];

const LOCAL_READ_GATED: &[&str] = &[
    "status", "log", "diff", "show", "blame", "branch", "tag", "shortlog", "describe",
    "rev-parse", "rev-list", "ls-files", "ls-tree", "cat-file", "name-rev", "config", "reflog",
];

const LOCAL_WRITE_GATED: &[&str] = &[
    "add", "commit", "checkout", "switch", "restore", "reset", "stash", "merge", "rebase",
    "cherry-pick", "rm", "mv", "init", "bisect", "clean", "revert", "worktree", "notes", "apply",
    "am",
];

const REMOTE_READ_GATED: &[&str] = &["fetch", "pull", "clone", "ls-remote"];
const REMOTE_WRITE_GATED: &[&str] = &["push"];

fn deny(subcommand: &str, detail: &str) -> SandboxError {
    SandboxError::validation("git", subcommand.to_string(), detail.to_string())
}

fn extract_subcommand(words: &[String]) -> Option<(&str, usize)> {
    let mut i = 1;
    while i < words.len() {
        let word = words[i].as_str();
        if VALUE_CONSUMING_GLOBAL_FLAGS.contains(&word) {
            i += 2;
            continue;
        }
        if word.starts_with('-') {
            i += 1;
            continue;
        }
        return Some((word, i));
    }
    None
}

fn has_any_flag(words: &[String], flags: &[&str]) -> bool {
    words.iter().any(|w| flags.contains(&w.as_str()))
}

pub fn validate(
    words: &[String],
    config: &PolicyConfig,
    _declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    let Some((subcommand, index)) = extract_subcommand(words) else {
        // Bare `git`, `git --version`, `git --help`: informational, always fine.
        return Ok(());
    };
    let rest = &words[index..];

    if ALWAYS_BLOCKED.contains(&subcommand) {
        return Err(deny(subcommand, "this git subcommand is always blocked"));
    }

    if subcommand == "remote" {
        return validate_remote(rest, config);
    }
    if subcommand == "submodule" {
        return validate_submodule(rest, config);
    }

    if LOCAL_READ_GATED.contains(&subcommand) {
        if !config.git.local_read {
            return Err(deny(subcommand, "git.local_read is disabled"));
        }
        if !config.git.local_write {
            match subcommand {
                "branch" => {
                    if has_any_flag(
                        rest,
                        &["-d", "-D", "-m", "-M", "-c", "-C", "--edit-description"],
                    ) {
                        return Err(deny(subcommand, "read-only mode denies mutating branch flags"));
                    }
                }
                "tag" => {
                    if has_any_flag(
                        rest,
                        &[
                            "-a", "-d", "-s", "-f", "--annotate", "--delete", "--sign", "--force",
                        ],
                    ) {
                        return Err(deny(subcommand, "read-only mode denies mutating tag flags"));
                    }
                }
                "config" => {
                    if !has_any_flag(
                        rest,
                        &[
                            "--list",
                            "-l",
                            "--get",
                            "--get-all",
                            "--get-regexp",
                            "--get-urlmatch",
                        ],
                    ) {
                        return Err(deny(subcommand, "read-only mode requires a read-only config flag"));
                    }
                }
                _ => {}
            }
        }
        return Ok(());
    }

    if LOCAL_WRITE_GATED.contains(&subcommand) {
        if !config.git.local_write {
            return Err(deny(subcommand, "git.local_write is disabled"));
        }
        return Ok(());
    }

    if REMOTE_READ_GATED.contains(&subcommand) {
        if !config.git.remote_read {
            return Err(deny(subcommand, "git.remote_read is disabled"));
        }
        return Ok(());
    }

    if REMOTE_WRITE_GATED.contains(&subcommand) {
        if !config.git.remote_write {
            return Err(deny(subcommand, "remote_write is disabled"));
        }
        return Ok(());
    }

    // Subcommands outside every named group (e.g. `gc`, `fsck`, `help`) are
    // accepted: they neither read remote state nor mutate the working tree.
    Ok(())
}

fn validate_remote(rest: &[String], config: &PolicyConfig) -> Result<(), SandboxError> {
    let sub_sub = rest.get(1).map(String::as_str).unwrap_or("");
    let mutating = sub_sub == "add"
        || sub_sub == "remove"
        || sub_sub == "rm"
        || sub_sub == "rename"
        || sub_sub.starts_with("set-")
        || sub_sub == "prune";
    if mutating {
        if !config.git.local_write {
            return Err(deny("remote", "this remote subcommand mutates local config"));
        }
    } else if !config.git.remote_read {
        return Err(deny("remote", "git.remote_read is disabled"));
    }
    Ok(())
}

fn validate_submodule(rest: &[String], config: &PolicyConfig) -> Result<(), SandboxError> {
    let sub_sub = rest.get(1).map(String::as_str).unwrap_or("");
    let read_only = matches!(sub_sub, "status" | "summary" | "foreach" | "");
    if read_only {
        if !config.git.remote_read {
            return Err(deny("submodule", "git.remote_read is disabled"));
        }
    } else if !config.git.local_write {
        return Err(deny("submodule", "git.local_write is disabled"));
    }
    Ok(())
}
