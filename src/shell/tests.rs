use super::ast::*;

fn parse(command: &str) -> brush_parser::ast::Program {
    let cursor = std::io::Cursor::new(command);
    let reader = std::io::BufReader::new(cursor);
    let options = brush_parser::ParserOptions::default();
    let source_info = brush_parser::SourceInfo::default();
    let mut parser = brush_parser::Parser::new(reader, &options, &source_info);
    parser.parse_program().expect("test command should parse")
}

fn first_command(program: &brush_parser::ast::Program) -> &brush_parser::ast::SimpleCommand {
    let mut found = None;
    walk_simple_commands(program, &mut |cmd| {
        if found.is_none() {
            found = Some(cmd as *const _);
        }
    });
    unsafe { &*found.expect("expected at least one simple command") }
}

#[test]
fn literal_view_unwraps_plain_word() {
    let program = parse("echo hello");
    let cmd = first_command(&program);
    assert_eq!(command_name(cmd).as_deref(), Some("echo"));
    assert_eq!(literal_words(cmd), vec!["echo".to_string(), "hello".to_string()]);
}

#[test]
fn literal_view_unwraps_quoted_word() {
    let program = parse("echo \"hello world\"");
    let cmd = first_command(&program);
    assert_eq!(literal_words(cmd), vec!["echo".to_string(), "hello world".to_string()]);
}

#[test]
fn literal_view_collapses_on_variable_expansion() {
    let program = parse("echo $HOME");
    let cmd = first_command(&program);
    assert_eq!(literal_words(cmd), vec!["echo".to_string(), String::new()]);
}

#[test]
fn literal_view_collapses_on_command_substitution() {
    let program = parse("echo $(whoami)");
    let cmd = first_command(&program);
    assert_eq!(literal_words(cmd), vec!["echo".to_string(), String::new()]);
}

#[test]
fn command_name_is_none_for_dynamic_name() {
    let program = parse("$CMD arg");
    let cmd = first_command(&program);
    assert_eq!(command_name(cmd), None);
}

#[test]
fn assignments_are_extracted_from_prefix() {
    let program = parse("FOO=bar echo hi");
    let cmd = first_command(&program);
    let assigns = assignments(cmd);
    assert_eq!(assigns.len(), 1);
    assert_eq!(literal_view(assigns[0].0), "FOO");
    assert_eq!(literal_view(assigns[0].1), "bar");
}

#[test]
fn walk_simple_commands_visits_both_sides_of_pipeline() {
    let program = parse("cat file | grep foo");
    let mut names = Vec::new();
    walk_simple_commands(&program, &mut |cmd| {
        if let Some(name) = command_name(cmd) {
            names.push(name);
        }
    });
    assert_eq!(names, vec!["cat".to_string(), "grep".to_string()]);
}

#[test]
fn walk_simple_commands_descends_into_if_clause() {
    let program = parse("if true; then echo yes; else echo no; fi");
    let mut names = Vec::new();
    walk_simple_commands(&program, &mut |cmd| {
        if let Some(name) = command_name(cmd) {
            names.push(name);
        }
    });
    assert_eq!(names, vec!["true".to_string(), "echo".to_string(), "echo".to_string()]);
}

#[test]
fn collect_declared_functions_finds_top_level_function() {
    let program = parse("myfunc() { echo hi; }");
    let functions = collect_declared_functions(&program);
    assert!(functions.contains("myfunc"));
}

#[test]
fn is_script_path_form_distinguishes_dot_from_script_path() {
    assert!(is_script_path_form("./setup.sh"));
    assert!(is_script_path_form("../setup.sh"));
    assert!(is_script_path_form("/abs/setup.sh"));
    assert!(!is_script_path_form("."));
    assert!(!is_script_path_form("setup.sh"));
}
