//! Shell-AST validator (`spec.md` §4.1): a static policy engine that walks a
//! parsed command once, short-circuiting at the first violation.

pub mod allowlist;
pub mod commands;

use crate::config::PolicyConfig;
use crate::errors::SandboxError;
use crate::shell::ast::{self as shell_ast};
use brush_parser::ast;
use std::collections::HashSet;

/// Entry point: validate a whole parsed program against `config`, given the
/// set of function names declared inline or discovered by the
/// script-transitive validator.
pub fn validate(
    program: &ast::Program,
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    for list in &program.complete_commands {
        validate_compound_list(list, config, declared_functions)?;
    }
    Ok(())
}

fn validate_compound_list(
    list: &ast::CompoundList,
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    for (and_or, _) in &list.0 {
        validate_pipeline(&and_or.first, config, declared_functions)?;
        for item in &and_or.additional {
            let pipeline = match item {
                ast::AndOr::And(p) | ast::AndOr::Or(p) => p,
            };
            validate_pipeline(pipeline, config, declared_functions)?;
        }
    }
    Ok(())
}

fn validate_pipeline(
    pipeline: &ast::Pipeline,
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    for command in &pipeline.seq {
        validate_command(command, config, declared_functions)?;
    }
    Ok(())
}

fn validate_command(
    command: &ast::Command,
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    match command {
        ast::Command::Simple(simple) => validate_simple_command(simple, config, declared_functions),
        ast::Command::Compound(compound, redirects) => {
            if let Some(redirect_list) = redirects {
                for redirect in &redirect_list.0 {
                    check_redirect(redirect)?;
                }
            }
            validate_compound_command(compound, config, declared_functions)
        }
        // A function *declaration* is always accepted structurally — the name
        // becomes callable via `declared_functions`; its body is validated
        // wherever it is actually invoked is unnecessary since the body is
        // walked here too, at declaration time, exactly once.
        ast::Command::Function(func) => validate_compound_command(&func.body, config, declared_functions),
        ast::Command::ExtendedTest(_) => Ok(()),
    }
}

fn validate_compound_command(
    compound: &ast::CompoundCommand,
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    match compound {
        ast::CompoundCommand::Subshell(s) => validate_compound_list(&s.list, config, declared_functions),
        ast::CompoundCommand::BraceGroup(b) => validate_compound_list(&b.list, config, declared_functions),
        ast::CompoundCommand::IfClause(i) => {
            validate_compound_list(&i.condition, config, declared_functions)?;
            validate_compound_list(&i.then, config, declared_functions)?;
            if let Some(elses) = &i.elses {
                for clause in elses {
                    if let Some(condition) = &clause.condition {
                        validate_compound_list(condition, config, declared_functions)?;
                    }
                    validate_compound_list(&clause.body, config, declared_functions)?;
                }
            }
            Ok(())
        }
        ast::CompoundCommand::WhileClause(wc) => {
            validate_compound_list(&wc.0, config, declared_functions)?;
            validate_compound_list(&wc.1.list, config, declared_functions)
        }
        ast::CompoundCommand::UntilClause(wc) => {
            validate_compound_list(&wc.0, config, declared_functions)?;
            validate_compound_list(&wc.1.list, config, declared_functions)
        }
        ast::CompoundCommand::ForClause(f) => validate_compound_list(&f.body.list, config, declared_functions),
        ast::CompoundCommand::ArithmeticForClause(f) => {
            validate_compound_list(&f.body.list, config, declared_functions)
        }
        ast::CompoundCommand::CaseClause(c) => {
            for case in &c.cases {
                if let Some(cmd) = &case.cmd {
                    validate_compound_list(cmd, config, declared_functions)?;
                }
            }
            Ok(())
        }
        // Arithmetic evaluation has no command words or redirections to police.
        ast::CompoundCommand::Arithmetic(_) => Ok(()),
    }
}

const DECLARATION_COMMANDS: &[&str] = &["export", "declare", "typeset", "readonly", "local"];

fn validate_simple_command(
    cmd: &ast::SimpleCommand,
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    for item in prefix_and_suffix(cmd) {
        match item {
            ast::CommandPrefixOrSuffixItem::IoRedirect(redirect) => check_redirect(redirect)?,
            ast::CommandPrefixOrSuffixItem::ProcessSubstitution(_, _) => {
                return Err(SandboxError::validation(
                    "process-substitution",
                    "<(...)/>(...)",
                    "process substitution is always denied",
                ));
            }
            ast::CommandPrefixOrSuffixItem::AssignmentWord(name, _) => {
                let literal_name = shell_ast::literal_view(name);
                if allowlist::is_blocked_assignment(&literal_name) {
                    return Err(SandboxError::validation(
                        "assignment",
                        literal_name,
                        "assigning this variable is denied",
                    ));
                }
            }
            ast::CommandPrefixOrSuffixItem::Word(_) => {}
        }
    }

    let words = shell_ast::literal_words(cmd);
    let Some(name) = words.first().cloned() else {
        // Bare assignment-only statement; already checked above.
        return Ok(());
    };

    if name.is_empty() {
        return Err(SandboxError::validation(
            "command-name",
            String::new(),
            "command name is dynamic or empty",
        ));
    }

    if DECLARATION_COMMANDS.contains(&name.as_str()) {
        for arg in &words[1..] {
            if let Some((var_name, _)) = arg.split_once('=') {
                if allowlist::is_blocked_assignment(var_name) {
                    return Err(SandboxError::validation(
                        "assignment",
                        var_name.to_string(),
                        "assigning this variable is denied",
                    ));
                }
            }
        }
    }

    validate_word_sequence(&words, config, declared_functions)
}

fn prefix_and_suffix(cmd: &ast::SimpleCommand) -> Vec<&ast::CommandPrefixOrSuffixItem> {
    let mut items = Vec::new();
    if let Some(prefix) = &cmd.prefix {
        items.extend(prefix.0.iter());
    }
    if let Some(suffix) = &cmd.suffix {
        items.extend(suffix.0.iter());
    }
    items
}

/// Command-name rule plus per-command validator dispatch, over an already
/// literal-ized word sequence (`words[0]` is the command name). Used both
/// for top-level simple commands and for sub-commands recursively validated
/// by `find -exec`, `xargs`, and `rg --pre`.
pub(crate) fn validate_word_sequence(
    words: &[String],
    config: &PolicyConfig,
    declared_functions: &HashSet<String>,
) -> Result<(), SandboxError> {
    let Some(name) = words.first() else {
        return Ok(());
    };
    if name.is_empty() {
        return Err(SandboxError::validation(
            "command-name",
            String::new(),
            "command name is dynamic or empty",
        ));
    }

    if declared_functions.contains(name) {
        return Ok(());
    }

    let is_allowlisted =
        allowlist::BUILTIN_ALLOWLIST.contains(&name.as_str()) || config.extra_commands.contains(name);

    if !is_allowlisted {
        if shell_ast::is_script_path_form(name) && config.local_binary_execution.enabled {
            return Ok(());
        }
        return Err(SandboxError::validation(
            "command-name",
            name.clone(),
            "command is not in the allowlist",
        ));
    }

    match commands::dispatch(name, words, config, declared_functions) {
        Some(result) => result,
        None => Ok(()),
    }
}

fn check_redirect(redirect: &ast::IoRedirect) -> Result<(), SandboxError> {
    match redirect {
        ast::IoRedirect::HereDocument(..) | ast::IoRedirect::HereString(..) => Ok(()),
        ast::IoRedirect::File(_, kind, target) => {
            if matches!(target, ast::IoFileRedirectTarget::ProcessSubstitution(_, _)) {
                return Err(SandboxError::validation(
                    "process-substitution",
                    "<(...)/>(...)",
                    "process substitution in a redirect target is denied",
                ));
            }
            let literal = match target {
                ast::IoFileRedirectTarget::Filename(word) => shell_ast::literal_view(word),
                ast::IoFileRedirectTarget::ProcessSubstitution(_, _) => unreachable!(),
            };
            use ast::IoFileRedirectKind as Kind;
            match kind {
                Kind::DuplicateInput => Ok(()),
                Kind::DuplicateOutput => {
                    if literal == "-" || (!literal.is_empty() && literal.chars().all(|c| c.is_ascii_digit())) {
                        Ok(())
                    } else {
                        Err(SandboxError::validation(
                            "redirection",
                            literal,
                            "output fd duplication target must be digits or '-'",
                        ))
                    }
                }
                Kind::Read => Ok(()),
                Kind::Write | Kind::Append | Kind::Clobber => {
                    if literal == "/dev/null" {
                        Ok(())
                    } else {
                        Err(SandboxError::validation(
                            "redirection",
                            literal,
                            "output redirect target must be exactly /dev/null",
                        ))
                    }
                }
                Kind::ReadAndWrite => Err(SandboxError::validation(
                    "redirection",
                    literal,
                    "read-write redirect (<>) is always denied",
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests;
