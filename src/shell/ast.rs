//! Literal-view and traversal helpers over `brush_parser::ast`.

use brush_parser::ast;
use std::collections::HashSet;

/// Compute the literal view of a word: the concatenation of every literal
/// and single/double-quoted character in the word's raw source text.
///
/// Any unescaped `$` or backtick outside single quotes marks the word as
/// containing a dynamic (runtime-expanded) part, per the data model's
/// "dynamic parts collapse the literal view to empty" rule — the caller
/// cannot know what the word will resolve to without running the shell, so
/// validators must treat it as opaque rather than guess.
pub fn literal_view(word: &ast::Word) -> String {
    literal_view_str(&word.value)
}

fn literal_view_str(raw: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum Quote {
        None,
        Single,
        Double,
    }

    let mut state = Quote::None;
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match (state, c) {
            (Quote::Single, '\'') => state = Quote::None,
            (Quote::Single, other) => out.push(other),
            (Quote::None, '\'') => state = Quote::Single,
            (Quote::Double, '"') => state = Quote::None,
            (Quote::None, '"') => state = Quote::Double,
            (Quote::None | Quote::Double, '\\') => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                } else {
                    out.push('\\');
                }
            }
            (Quote::None | Quote::Double, '$') | (Quote::None | Quote::Double, '`') => {
                return String::new();
            }
            (_, other) => out.push(other),
        }
    }

    out
}

/// A word is "dynamic" when its literal view is empty but its raw text
/// isn't — i.e. it contains an expansion rather than simply being empty.
pub fn is_dynamic(word: &ast::Word) -> bool {
    literal_view(word).is_empty() && !word.value.is_empty()
}

/// Does this literal string look like the `./path` / `../path` / `/path`
/// "script path form" the script-transitive validator needs to recognize,
/// as distinct from the bare `.` (`source`) builtin name?
pub fn is_script_path_form(literal: &str) -> bool {
    literal.starts_with("./") || literal.starts_with("../") || literal.starts_with('/')
}

fn prefix_suffix_items(cmd: &ast::SimpleCommand) -> Vec<&ast::CommandPrefixOrSuffixItem> {
    let mut items = Vec::new();
    if let Some(prefix) = &cmd.prefix {
        items.extend(prefix.0.iter());
    }
    if let Some(suffix) = &cmd.suffix {
        items.extend(suffix.0.iter());
    }
    items
}

/// Literal views of the command name followed by every plain-word argument,
/// in source order. Assignment words and redirections are excluded — callers
/// that need those use [`assignments`] and [`redirects`] directly.
pub fn literal_words(cmd: &ast::SimpleCommand) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(name) = &cmd.word_or_name {
        out.push(literal_view(name));
    }
    for item in prefix_suffix_items(cmd) {
        if let ast::CommandPrefixOrSuffixItem::Word(word) = item {
            out.push(literal_view(word));
        }
    }
    out
}

/// The command name's literal view, or `None` if the command has no name
/// (a bare assignment) or the name is dynamic.
pub fn command_name(cmd: &ast::SimpleCommand) -> Option<String> {
    let name = cmd.word_or_name.as_ref()?;
    let literal = literal_view(name);
    if literal.is_empty() {
        None
    } else {
        Some(literal)
    }
}

/// `NAME=value` assignment-word pairs attached to this command (prefix
/// position only — that's the only place Bash allows them).
pub fn assignments(cmd: &ast::SimpleCommand) -> Vec<(&ast::Word, &ast::Word)> {
    prefix_suffix_items(cmd)
        .into_iter()
        .filter_map(|item| match item {
            ast::CommandPrefixOrSuffixItem::AssignmentWord(name, value) => Some((name, value)),
            _ => None,
        })
        .collect()
}

/// Every `IoRedirect` attached to this simple command.
pub fn redirects(cmd: &ast::SimpleCommand) -> Vec<&ast::IoRedirect> {
    prefix_suffix_items(cmd)
        .into_iter()
        .filter_map(|item| match item {
            ast::CommandPrefixOrSuffixItem::IoRedirect(redirect) => Some(redirect),
            _ => None,
        })
        .collect()
}

/// Every process substitution (`<(...)`/`>(...)`) attached to this command.
pub fn process_substitutions(cmd: &ast::SimpleCommand) -> Vec<char> {
    prefix_suffix_items(cmd)
        .into_iter()
        .filter_map(|item| match item {
            ast::CommandPrefixOrSuffixItem::ProcessSubstitution(kind, _) => Some(*kind),
            _ => None,
        })
        .collect()
}

/// Visit every [`ast::SimpleCommand`] reachable from `program`, in source
/// order, including those nested inside `if`/`while`/`for`/`case`/subshell/
/// brace-group bodies and function definitions.
pub fn walk_simple_commands<'a>(program: &'a ast::Program, visit: &mut dyn FnMut(&'a ast::SimpleCommand)) {
    for list in &program.complete_commands {
        walk_compound_list(list, visit);
    }
}

fn walk_compound_list<'a>(list: &'a ast::CompoundList, visit: &mut dyn FnMut(&'a ast::SimpleCommand)) {
    for (and_or, _) in &list.0 {
        walk_pipeline(&and_or.first, visit);
        for item in &and_or.additional {
            let pipeline = match item {
                ast::AndOr::And(p) | ast::AndOr::Or(p) => p,
            };
            walk_pipeline(pipeline, visit);
        }
    }
}

fn walk_pipeline<'a>(pipeline: &'a ast::Pipeline, visit: &mut dyn FnMut(&'a ast::SimpleCommand)) {
    for command in &pipeline.seq {
        walk_command(command, visit);
    }
}

fn walk_command<'a>(command: &'a ast::Command, visit: &mut dyn FnMut(&'a ast::SimpleCommand)) {
    match command {
        ast::Command::Simple(simple) => visit(simple),
        ast::Command::Compound(compound, _redirects) => walk_compound_command(compound, visit),
        ast::Command::Function(func) => walk_compound_command(&func.body, visit),
        ast::Command::ExtendedTest(_) => {}
    }
}

fn walk_compound_command<'a>(
    compound: &'a ast::CompoundCommand,
    visit: &mut dyn FnMut(&'a ast::SimpleCommand),
) {
    match compound {
        ast::CompoundCommand::Subshell(s) => walk_compound_list(&s.list, visit),
        ast::CompoundCommand::BraceGroup(b) => walk_compound_list(&b.list, visit),
        ast::CompoundCommand::IfClause(i) => {
            walk_compound_list(&i.condition, visit);
            walk_compound_list(&i.then, visit);
            if let Some(elses) = &i.elses {
                for clause in elses {
                    if let Some(condition) = &clause.condition {
                        walk_compound_list(condition, visit);
                    }
                    walk_compound_list(&clause.body, visit);
                }
            }
        }
        ast::CompoundCommand::WhileClause(wc) => {
            walk_compound_list(&wc.0, visit);
            walk_compound_list(&wc.1.list, visit);
        }
        ast::CompoundCommand::UntilClause(wc) => {
            walk_compound_list(&wc.0, visit);
            walk_compound_list(&wc.1.list, visit);
        }
        ast::CompoundCommand::ForClause(f) => walk_compound_list(&f.body.list, visit),
        ast::CompoundCommand::ArithmeticForClause(f) => walk_compound_list(&f.body.list, visit),
        ast::CompoundCommand::CaseClause(c) => {
            for case in &c.cases {
                if let Some(cmd) = &case.cmd {
                    walk_compound_list(cmd, visit);
                }
            }
        }
        ast::CompoundCommand::Arithmetic(_) => {}
    }
}

/// Collect the names of every function this program declares, at any
/// nesting depth (a function body may itself declare further functions).
pub fn collect_declared_functions(program: &ast::Program) -> HashSet<String> {
    let mut names = HashSet::new();
    for list in &program.complete_commands {
        collect_functions_in_list(list, &mut names);
    }
    names
}

fn collect_functions_in_list(list: &ast::CompoundList, names: &mut HashSet<String>) {
    for (and_or, _) in &list.0 {
        collect_functions_in_pipeline(&and_or.first, names);
        for item in &and_or.additional {
            let pipeline = match item {
                ast::AndOr::And(p) | ast::AndOr::Or(p) => p,
            };
            collect_functions_in_pipeline(pipeline, names);
        }
    }
}

fn collect_functions_in_pipeline(pipeline: &ast::Pipeline, names: &mut HashSet<String>) {
    for command in &pipeline.seq {
        collect_functions_in_command(command, names);
    }
}

fn collect_functions_in_command(command: &ast::Command, names: &mut HashSet<String>) {
    match command {
        ast::Command::Function(func) => {
            names.insert(literal_view(&func.fname));
            collect_functions_in_compound(&func.body, names);
        }
        ast::Command::Compound(compound, _) => collect_functions_in_compound(compound, names),
        ast::Command::Simple(_) | ast::Command::ExtendedTest(_) => {}
    }
}

fn collect_functions_in_compound(compound: &ast::CompoundCommand, names: &mut HashSet<String>) {
    match compound {
        ast::CompoundCommand::Subshell(s) => collect_functions_in_list(&s.list, names),
        ast::CompoundCommand::BraceGroup(b) => collect_functions_in_list(&b.list, names),
        ast::CompoundCommand::IfClause(i) => {
            collect_functions_in_list(&i.condition, names);
            collect_functions_in_list(&i.then, names);
            if let Some(elses) = &i.elses {
                for clause in elses {
                    if let Some(condition) = &clause.condition {
                        collect_functions_in_list(condition, names);
                    }
                    collect_functions_in_list(&clause.body, names);
                }
            }
        }
        ast::CompoundCommand::WhileClause(wc) => {
            collect_functions_in_list(&wc.0, names);
            collect_functions_in_list(&wc.1.list, names);
        }
        ast::CompoundCommand::UntilClause(wc) => {
            collect_functions_in_list(&wc.0, names);
            collect_functions_in_list(&wc.1.list, names);
        }
        ast::CompoundCommand::ForClause(f) => collect_functions_in_list(&f.body.list, names),
        ast::CompoundCommand::ArithmeticForClause(f) => collect_functions_in_list(&f.body.list, names),
        ast::CompoundCommand::CaseClause(c) => {
            for case in &c.cases {
                if let Some(cmd) = &case.cmd {
                    collect_functions_in_list(cmd, names);
                }
            }
        }
        ast::CompoundCommand::Arithmetic(_) => {}
    }
}
