//! Per-command argument validators (`spec.md` §4.3), dispatched by command
//! name. Each validator receives the full literal-view word sequence
//! (`words[0]` is the command name) and the live policy snapshot; some
//! recurse into [`super::validate_word_sequence`] for embedded sub-commands
//! (`find -exec`, `xargs`, `rg --pre`).

mod aws;
mod awk;
mod bash_sh;
mod find;
mod git;
mod rg;
mod rm_sed;
mod runtimes;
mod source;
mod tar_unzip_ar;
mod xargs;

use crate::config::PolicyConfig;
use crate::errors::SandboxError;
use std::collections::HashSet;

type Validator = fn(&[String], &PolicyConfig, &HashSet<String>) -> Result<(), SandboxError>;

/// Look up and run the validator registered for `name`, if any. Commands
/// with no registered validator are accepted once the allowlist/declared-
/// function check in the caller has already passed.
pub fn dispatch(
    name: &str,
    words: &[String],
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
) -> Option<Result<(), SandboxError>> {
    let validator: Validator = match name {
        "find" => find::validate,
        "xargs" => xargs::validate,
        "tar" => tar_unzip_ar::validate_tar,
        "unzip" => tar_unzip_ar::validate_unzip,
        "ar" => tar_unzip_ar::validate_ar,
        "rm" => rm_sed::validate_rm,
        "sed" => rm_sed::validate_sed,
        "git" => git::validate,
        "go" => runtimes::validate_go,
        "pnpm" => runtimes::validate_pnpm,
        "cargo" => runtimes::validate_cargo,
        "rustc" => runtimes::validate_rustc,
        "aws" => aws::validate,
        "awk" => awk::validate,
        "bash" | "sh" => bash_sh::validate,
        "source" | "." => source::validate,
        "rg" => rg::validate,
        _ => return None,
    };
    Some(validator(words, config, declared_functions))
}
