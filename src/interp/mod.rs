//! In-process shell interpreter (`spec.md` §4.6): `brush_parser` only parses,
//! so this walks the same AST it produces and actually runs it, calling the
//! three hooks from [`hooks`] at the points the spec names them.
//!
//! This is not a general-purpose POSIX interpreter (explicitly out of scope
//! — see the Non-goals in `spec.md` §1): word expansion is limited to
//! `$NAME`/`${NAME}` variable substitution and `$(...)`/backtick command
//! substitution (itself re-validated and re-executed through the same
//! pipeline, never trusted verbatim), with no IFS word-splitting, globbing,
//! or arithmetic expansion. Control flow (`if`/`while`/`until`/`for`/`case`)
//! and pipelines are fully supported since the end-to-end scenarios in
//! `spec.md` §8 exercise them directly.

pub mod hooks;
pub mod nested;

use crate::config::PolicyConfig;
use crate::deadline::Deadline;
use crate::errors::SandboxError;
use crate::shell::{self, ast};
use hooks::{CallHandler, ExecContext, ExecHandler, OpenHandler};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// `break`/`continue`/`return` unwind loop and function bodies without
/// treating every exit as a hard interpreter error.
#[derive(Clone, Copy)]
enum Signal {
    Normal,
    Break(u32),
    Continue(u32),
    Return,
}

fn parse_control_signal(name: &str, args: &[String]) -> Option<Signal> {
    let level = || args.first().and_then(|a| a.parse::<u32>().ok()).unwrap_or(1).max(1);
    match name {
        "break" => Some(Signal::Break(level())),
        "continue" => Some(Signal::Continue(level())),
        "return" => Some(Signal::Return),
        _ => None,
    }
}

pub struct Interpreter {
    pub work_dir: PathBuf,
    pub env: HashMap<String, String>,
    pub read_roots: Vec<PathBuf>,
    pub write_roots: Vec<PathBuf>,
    pub nested_depth: u32,
    pub config: Arc<PolicyConfig>,
    pub deadline: Deadline,
    pub functions: HashMap<String, ast::CompoundCommand>,
    call_handler: Arc<dyn CallHandler>,
    open_handler: Arc<dyn OpenHandler>,
    exec_handler: Arc<dyn ExecHandler>,
    output: Vec<u8>,
    last_exit: i32,
    /// Set by the `break`/`continue`/`return` builtins (intercepted in
    /// [`Self::run_simple_command_piped`] rather than dispatched to the
    /// exec handler) and drained by [`Self::run_and_or_list`] to unwind the
    /// enclosing loop or function body.
    pending_signal: Option<Signal>,
}

impl Interpreter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        work_dir: PathBuf,
        env: HashMap<String, String>,
        read_roots: Vec<PathBuf>,
        write_roots: Vec<PathBuf>,
        nested_depth: u32,
        config: Arc<PolicyConfig>,
        deadline: Deadline,
        call_handler: Arc<dyn CallHandler>,
        open_handler: Arc<dyn OpenHandler>,
        exec_handler: Arc<dyn ExecHandler>,
    ) -> Self {
        Self {
            work_dir,
            env,
            read_roots,
            write_roots,
            nested_depth,
            config,
            deadline,
            functions: HashMap::new(),
            call_handler,
            open_handler,
            exec_handler,
            output: Vec::new(),
            last_exit: 0,
            pending_signal: None,
        }
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    pub fn exit_code(&self) -> i32 {
        self.last_exit
    }

    /// Run a whole program to completion, accumulating combined
    /// stdout+stderr in `self.output` and the final exit status in
    /// `self.last_exit`.
    pub async fn run(&mut self, program: &ast::Program) -> Result<(), SandboxError> {
        for (list, _) in &program.complete_commands {
            match Box::pin(self.run_compound_list(list)).await? {
                Signal::Return => break,
                _ => continue,
            }
        }
        Ok(())
    }

    fn run_compound_list<'a>(
        &'a mut self,
        list: &'a ast::CompoundList,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Signal, SandboxError>> + 'a>>
    {
        Box::pin(async move {
            for (and_or, _) in &list.0 {
                let signal = self.run_and_or_list(and_or).await?;
                if !matches!(signal, Signal::Normal) {
                    return Ok(signal);
                }
            }
            Ok(Signal::Normal)
        })
    }

    async fn run_and_or_list(&mut self, and_or: &ast::AndOrList) -> Result<Signal, SandboxError> {
        self.run_pipeline(&and_or.first).await?;
        if let Some(signal) = self.pending_signal.take() {
            return Ok(signal);
        }
        for item in &and_or.additional {
            match item {
                ast::AndOr::And(pipeline) => {
                    if self.last_exit != 0 {
                        continue;
                    }
                    self.run_pipeline(pipeline).await?;
                }
                ast::AndOr::Or(pipeline) => {
                    if self.last_exit == 0 {
                        continue;
                    }
                    self.run_pipeline(pipeline).await?;
                }
            }
            if let Some(signal) = self.pending_signal.take() {
                return Ok(signal);
            }
        }
        Ok(Signal::Normal)
    }

    async fn run_pipeline(&mut self, pipeline: &ast::Pipeline) -> Result<(), SandboxError> {
        // Each simple-command stage's output feeds the next stage's stdin;
        // only the last stage's output is folded into the combined buffer.
        // A compound-command stage (subshell, if, …) breaks the chain —
        // acceptable here since the end-to-end scenarios this interpreter
        // targets pipe between plain external commands, not control blocks.
        let last = pipeline.seq.len().saturating_sub(1);
        let mut stdin: Option<Vec<u8>> = None;
        for (i, command) in pipeline.seq.iter().enumerate() {
            match command {
                ast::Command::Simple(cmd) => {
                    let out = Box::pin(self.run_simple_command_piped(cmd, stdin.take())).await?;
                    if i == last {
                        self.output.extend_from_slice(&out);
                    } else {
                        stdin = Some(out);
                    }
                }
                other => {
                    Box::pin(self.run_command(other)).await?;
                    stdin = None;
                }
            }
        }
        Ok(())
    }

    fn run_command<'a>(
        &'a mut self,
        command: &'a ast::Command,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), SandboxError>> + 'a>> {
        Box::pin(async move {
            match command {
                ast::Command::Simple(cmd) => self.run_simple_command(cmd).await,
                ast::Command::Compound(compound, _redirects) => {
                    self.run_compound_command(compound).await.map(|_| ())
                }
                ast::Command::Function(func) => {
                    let name = shell::literal_view(&func.fname);
                    self.functions.insert(name, func.body.clone());
                    self.last_exit = 0;
                    Ok(())
                }
                ast::Command::ExtendedTest(_) => {
                    self.last_exit = 0;
                    Ok(())
                }
            }
        })
    }

    async fn run_compound_command(
        &mut self,
        compound: &ast::CompoundCommand,
    ) -> Result<Signal, SandboxError> {
        match compound {
            ast::CompoundCommand::Subshell(s) => self.run_compound_list(&s.list).await,
            ast::CompoundCommand::BraceGroup(b) => self.run_compound_list(&b.list).await,
            ast::CompoundCommand::IfClause(clause) => self.run_if(clause).await,
            ast::CompoundCommand::WhileClause(wc) => self.run_while(&wc.0, &wc.1, false).await,
            ast::CompoundCommand::UntilClause(wc) => self.run_while(&wc.0, &wc.1, true).await,
            ast::CompoundCommand::ForClause(clause) => self.run_for(clause).await,
            ast::CompoundCommand::CaseClause(clause) => self.run_case(clause).await,
            ast::CompoundCommand::ArithmeticForClause(clause) => {
                self.run_compound_list(&clause.body).await
            }
            ast::CompoundCommand::Arithmetic(_) => {
                self.last_exit = 0;
                Ok(Signal::Normal)
            }
        }
    }

    async fn run_if(&mut self, clause: &ast::IfClauseCommand) -> Result<Signal, SandboxError> {
        Box::pin(self.run_compound_list(&clause.condition)).await?;
        if self.last_exit == 0 {
            return Box::pin(self.run_compound_list(&clause.then)).await;
        }
        if let Some(elses) = &clause.elses {
            for else_clause in elses {
                if let Some(condition) = &else_clause.condition {
                    Box::pin(self.run_compound_list(condition)).await?;
                    if self.last_exit != 0 {
                        continue;
                    }
                }
                return Box::pin(self.run_compound_list(&else_clause.body)).await;
            }
        }
        self.last_exit = 0;
        Ok(Signal::Normal)
    }

    async fn run_while(
        &mut self,
        condition: &ast::CompoundList,
        body: &ast::DoGroupCommand,
        until: bool,
    ) -> Result<Signal, SandboxError> {
        loop {
            Box::pin(self.run_compound_list(condition)).await?;
            let keep_going = if until { self.last_exit != 0 } else { self.last_exit == 0 };
            if !keep_going {
                break;
            }
            match Box::pin(self.run_compound_list(&body.list)).await? {
                Signal::Break(n) if n > 1 => return Ok(Signal::Break(n - 1)),
                Signal::Break(_) => break,
                Signal::Continue(n) if n > 1 => return Ok(Signal::Continue(n - 1)),
                Signal::Return => return Ok(Signal::Return),
                _ => continue,
            }
        }
        self.last_exit = 0;
        Ok(Signal::Normal)
    }

    async fn run_for(&mut self, clause: &ast::ForClauseCommand) -> Result<Signal, SandboxError> {
        let values = match &clause.values {
            Some(words) => {
                let mut expanded = Vec::new();
                for word in words {
                    expanded.push(self.expand_word(word).await?);
                }
                expanded
            }
            None => Vec::new(),
        };
        for value in values {
            self.env.insert(clause.variable_name.clone(), value);
            match Box::pin(self.run_compound_list(&clause.body.list)).await? {
                Signal::Break(n) if n > 1 => return Ok(Signal::Break(n - 1)),
                Signal::Break(_) => break,
                Signal::Continue(n) if n > 1 => return Ok(Signal::Continue(n - 1)),
                Signal::Return => return Ok(Signal::Return),
                _ => continue,
            }
        }
        self.last_exit = 0;
        Ok(Signal::Normal)
    }

    async fn run_case(&mut self, clause: &ast::CaseClauseCommand) -> Result<Signal, SandboxError> {
        let subject = self.expand_word(&clause.value).await?;
        for item in &clause.cases {
            let matches = item
                .patterns
                .iter()
                .any(|pattern| shell::literal_view(pattern) == subject || shell::literal_view(pattern) == "*");
            if !matches {
                continue;
            }
            if let Some(cmd) = &item.cmd {
                return Box::pin(self.run_compound_list(cmd)).await;
            }
            self.last_exit = 0;
            return Ok(Signal::Normal);
        }
        self.last_exit = 0;
        Ok(Signal::Normal)
    }

    async fn run_simple_command(&mut self, cmd: &ast::SimpleCommand) -> Result<(), SandboxError> {
        let out = self.run_simple_command_piped(cmd, None).await?;
        self.output.extend_from_slice(&out);
        Ok(())
    }

    /// Run one simple command, optionally fed `stdin` from a prior pipeline
    /// stage, returning its produced output instead of appending it to the
    /// interpreter's combined buffer — the caller (a bare command or
    /// [`Self::run_pipeline`]) decides whether that output is terminal or
    /// feeds the next stage.
    async fn run_simple_command_piped(
        &mut self,
        cmd: &ast::SimpleCommand,
        stdin: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, SandboxError> {
        if self.deadline.expired() {
            return Err(self.deadline_exceeded());
        }

        for (name, value) in shell::assignments(cmd) {
            let name = shell::literal_view(name);
            let value = self.expand_word(value).await?;
            self.env.insert(name, value);
        }

        let Some(name_word) = &cmd.word_or_name else {
            self.last_exit = 0;
            return Ok(Vec::new());
        };
        let name = self.expand_word(name_word).await?;
        if name.is_empty() {
            self.last_exit = 0;
            return Ok(Vec::new());
        }

        let mut args = Vec::new();
        if let Some(suffix) = &cmd.suffix {
            for item in &suffix.0 {
                if let ast::CommandPrefixOrSuffixItem::Word(word) = item {
                    args.push(self.expand_word(word).await?);
                }
            }
        }

        self.call_handler.on_call(&name, &args, &self.work_dir)?;

        for redirect in shell::redirects(cmd) {
            self.check_redirect_open(redirect).await?;
        }

        if let Some(signal) = parse_control_signal(&name, &args) {
            self.pending_signal = Some(signal);
            self.last_exit = 0;
            return Ok(Vec::new());
        }

        if name == "bash" || name == "sh" {
            let outcome = Box::pin(nested::run_shell_invocation(self, &args)).await?;
            self.last_exit = outcome.exit_code;
            return Ok(outcome.output);
        }

        if (name == "source" || name == ".") && !args.is_empty() {
            // Unlike `bash script`, `source`/`.` runs in the *current*
            // environment and function table rather than a fresh child —
            // definitions it makes are visible to the rest of this script.
            let resolved = crate::path::resolve(&args[0], &self.work_dir);
            let content = std::fs::read_to_string(&resolved)
                .map_err(|e| SandboxError::SetupIo(e.to_string()))?;
            let program = nested::parse_for_source(&content)?;
            let before = self.output.len();
            Box::pin(self.run(&program)).await?;
            return Ok(self.output.split_off(before));
        }

        if let Some(body) = self.functions.get(&name).cloned() {
            self.run_compound_command(&body).await?;
            return Ok(Vec::new());
        }

        let ctx = ExecContext {
            work_dir: &self.work_dir,
            env: &self.env,
            read_roots: &self.read_roots,
            write_roots: &self.write_roots,
            nested_depth: self.nested_depth,
            stdin_data: stdin.as_deref(),
            deadline: self.deadline,
        };
        let deadline = self.deadline;
        let raced = deadline.race(self.exec_handler.exec(&ctx, &name, &args)).await;
        let Some(outcome) = raced else {
            return Err(self.deadline_exceeded());
        };
        let outcome = outcome?;
        self.last_exit = outcome.exit_code;
        Ok(outcome.output)
    }

    /// Build a [`SandboxError::DeadlineExceeded`] carrying whatever output
    /// has already accumulated — `spec.md` §5's "partial output produced
    /// before cancellation is still returned".
    fn deadline_exceeded(&mut self) -> SandboxError {
        SandboxError::DeadlineExceeded {
            partial_output: self.take_output(),
        }
    }

    async fn check_redirect_open(&self, redirect: &ast::IoRedirect) -> Result<(), SandboxError> {
        if let ast::IoRedirect::File(_, kind, ast::IoFileRedirectTarget::Filename(word)) = redirect {
            let literal = shell::literal_view(word);
            if literal.is_empty() || literal == "/dev/null" {
                return Ok(());
            }
            let for_write = !matches!(kind, ast::IoFileRedirectKind::Read);
            let resolved = crate::path::resolve(&literal, &self.work_dir);
            self.open_handler.on_open(&resolved, for_write, &self.work_dir)?;
        }
        Ok(())
    }

    /// Expand a word's variable references and, recursively, any
    /// `$(...)`/backtick command substitutions it contains. Substitutions are
    /// re-parsed and re-run through [`nested::run_substitution`], never
    /// trusted as pre-validated text, since their content is only known at
    /// runtime.
    async fn expand_word(&mut self, word: &ast::Word) -> Result<String, SandboxError> {
        nested::expand(self, &word.value).await
    }

    pub(crate) fn handlers(
        &self,
    ) -> (Arc<dyn CallHandler>, Arc<dyn OpenHandler>, Arc<dyn ExecHandler>) {
        (
            self.call_handler.clone(),
            self.open_handler.clone(),
            self.exec_handler.clone(),
        )
    }
}
