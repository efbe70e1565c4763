use crate::config::PolicyConfig;
use crate::errors::SandboxError;
use std::collections::HashSet;

fn deny(command: &str, detail: &str) -> SandboxError {
    SandboxError::validation(command.to_string(), command.to_string(), detail.to_string())
}

fn extract_subcommand<'a>(words: &'a [String], value_consuming: &[&str]) -> Option<(&'a str, usize)> {
    let mut i = 1;
    while i < words.len() {
        let word = words[i].as_str();
        if value_consuming.contains(&word) {
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

pub fn validate_go(
    words: &[String],
    config: &PolicyConfig,
    _declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    if !config.runtimes.go.enabled {
        return Err(deny("go", "runtimes.go.enabled is disabled"));
    }
    let Some((subcommand, index)) = extract_subcommand(words, &["-C"]) else {
        return Ok(());
    };
    let rest = &words[index + 1..];
    match subcommand {
        "generate" => {
            if !config.runtimes.go.generate {
                return Err(deny("go", "runtimes.go.generate is disabled"));
            }
        }
        "run" => {
            if rest.iter().any(|w| w == "-exec") {
                return Err(deny("go", "go run -exec is denied"));
            }
            if rest.iter().any(|w| !w.starts_with('-') && w.contains('@')) {
                return Err(deny("go", "go run of a remote module (@version) is denied"));
            }
        }
        "install" => {
            if rest.iter().any(|w| !w.starts_with('-') && w.contains('@')) {
                return Err(deny("go", "go install of a remote module (@version) is denied"));
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn validate_pnpm(
    words: &[String],
    config: &PolicyConfig,
    _declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    if !config.runtimes.pnpm.enabled {
        return Err(deny("pnpm", "runtimes.pnpm.enabled is disabled"));
    }
    let Some((subcommand, _index)) =
        extract_subcommand(words, &["-C", "--dir", "-w", "--workspace-root"])
    else {
        return Ok(());
    };
    match subcommand {
        "dlx" => Err(deny("pnpm", "pnpm dlx runs arbitrary remote packages")),
        "publish" if !config.runtimes.pnpm.publish => {
            Err(deny("pnpm", "runtimes.pnpm.publish is disabled"))
        }
        _ => Ok(()),
    }
}

pub fn validate_cargo(
    words: &[String],
    config: &PolicyConfig,
    _declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    if !config.runtimes.rust.enabled {
        return Err(deny("cargo", "runtimes.rust.enabled is disabled"));
    }
    let Some((subcommand, index)) =
        extract_subcommand(words, &["-C", "--manifest-path", "--config", "-Z"])
    else {
        return Ok(());
    };
    let rest = &words[index + 1..];
    match subcommand {
        "login" | "logout" | "owner" | "yank" => {
            Err(deny("cargo", "this cargo subcommand is always denied"))
        }
        "publish" if !config.runtimes.rust.publish => {
            Err(deny("cargo", "runtimes.rust.publish is disabled"))
        }
        "install" => {
            let has_path_flag = rest
                .iter()
                .any(|w| w == "--path" || w.starts_with("--path="));
            if !has_path_flag {
                return Err(deny("cargo", "cargo install requires --path (no remote crates)"));
            }
            let mut i = 0;
            while i < rest.len() {
                let word = &rest[i];
                if word == "--path" {
                    i += 2;
                    continue;
                }
                if word.starts_with('-') {
                    i += 1;
                    continue;
                }
                return Err(deny("cargo", "cargo install accepts no positional package name"));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

pub fn validate_rustc(
    _words: &[String],
    config: &PolicyConfig,
    _declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    if !config.runtimes.rust.enabled {
        return Err(deny("rustc", "runtimes.rust.enabled is disabled"));
    }
    Ok(())
}
