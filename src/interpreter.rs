use crate::command::ExternalBridge;
use crate::config::Config;
use crate::env::Environment;
use crate::error::ExecError;
use crate::external::{PackageManager, ProcessBridge, Runtime};
use crate::lexer::{self, Line};
use crate::parser::{self, Statement};
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// A line-oriented interpreter for Am scripts.
///
/// The interpreter owns the [`Environment`] (variable and function stores), the
/// [`ExternalBridge`] used for lines written in other languages, and the two
/// streams it reports to. Every line is handled on its own: statements never
/// span lines and nothing but the stores survives from one line to the next.
///
/// Example
/// ```
/// use am_lang::{Config, Interpreter, MemWriter, ProcessBridge};
/// let (out, handle) = MemWriter::with_handle();
/// let mut am = Interpreter::with_output(
///     Box::new(ProcessBridge::default()),
///     Config::default(),
///     Box::new(out),
///     Box::new(std::io::sink()),
/// );
/// am.run_reader("x = 2\nwhile x < 4".as_bytes()).unwrap();
/// assert_eq!(am.env().get_var("x"), 4);
/// assert_eq!(
///     MemWriter::contents(&handle),
///     "Variable x set to 2\nLoop iteration, x: 2\nLoop iteration, x: 3\n"
/// );
/// ```
pub struct Interpreter {
    env: Environment,
    bridge: Box<dyn ExternalBridge>,
    stdout: Box<dyn Write>,
    stderr: Box<dyn Write>,
    config: Config,
    line_no: usize,
}

impl Interpreter {
    /// Create an interpreter that writes to the process' standard streams.
    pub fn new(bridge: Box<dyn ExternalBridge>, config: Config) -> Self {
        Self::with_output(
            bridge,
            config,
            Box::new(std::io::stdout()),
            Box::new(std::io::stderr()),
        )
    }

    /// Create an interpreter with explicit output and error streams.
    pub fn with_output(
        bridge: Box<dyn ExternalBridge>,
        config: Config,
        stdout: Box<dyn Write>,
        stderr: Box<dyn Write>,
    ) -> Self {
        Self {
            env: Environment::new(),
            bridge,
            stdout,
            stderr,
            config,
            line_no: 0,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Classify one line and act on it.
    ///
    /// Errors are returned, not reported; see [`Interpreter::run_line`].
    pub fn process_line(&mut self, line: &str) -> Result<(), ExecError> {
        self.line_no += 1;
        let classified = lexer::classify(line);
        if self.config.trace {
            writeln!(self.stderr, "[trace] line {}: {:?}", self.line_no, classified)?;
        }

        match classified {
            Line::Blank => Ok(()),
            Line::Print(message) => {
                let message = if message.is_empty() {
                    Vec::new()
                } else {
                    vec![message]
                };
                self.execute(Statement::Print { message })
            }
            Line::Import { tag, module } => self.install_library(&tag, &module),
            Line::Native(tokens) => {
                let statement = parser::parse_statement(tokens)?;
                self.execute(statement)
            }
            Line::External { tag, line } => self.run_external_code(&tag, &line),
        }
    }

    /// Execute a single native statement against the stores.
    pub fn execute(&mut self, statement: Statement) -> Result<(), ExecError> {
        match statement {
            Statement::Assign { name, value } => {
                writeln!(self.stdout, "Variable {} set to {}", name, value)?;
                self.env.set_var(name, value);
            }
            Statement::Print { message } => {
                if message.is_empty() {
                    return Ok(());
                }
                let text = message.join(" ");
                writeln!(self.stdout, "{}", strip_quotes(&text))?;
            }
            Statement::If { var, value } => {
                if *self.env.var_mut(&var) == value {
                    writeln!(self.stdout, "Condition met for if statement.")?;
                }
            }
            Statement::While { var, limit } => {
                // Only the counter advances; the loop ends once it reaches `limit`.
                let counter = self.env.var_mut(&var);
                while *counter < limit {
                    writeln!(self.stdout, "Loop iteration, {}: {}", var, counter)?;
                    *counter += 1;
                }
            }
            Statement::For { var, start, end } => {
                let counter = self.env.var_mut(&var);
                *counter = start;
                while *counter < end {
                    writeln!(self.stdout, "Loop iteration, {}: {}", var, counter)?;
                    *counter += 1;
                }
            }
            Statement::Class { name } => {
                writeln!(self.stdout, "Class {} defined.", name)?;
            }
            Statement::Func { name, body } => {
                writeln!(self.stdout, "Function {} defined.", name)?;
                self.env.define_function(name, body);
            }
        }
        Ok(())
    }

    /// Replay the stored body of a function, one word per line.
    ///
    /// The body is printed, not executed. Returns `false` when no function of
    /// that name exists, in which case nothing is written.
    pub fn call_function(&mut self, name: &str) -> std::io::Result<bool> {
        let Some(body) = self.env.function(name) else {
            return Ok(false);
        };
        writeln!(self.stdout, "Calling function {}", name)?;
        for line in body {
            writeln!(self.stdout, "{}", line)?;
        }
        Ok(true)
    }

    fn install_library(&mut self, tag: &str, module: &str) -> Result<(), ExecError> {
        let manager = PackageManager::from_tag(tag)
            .ok_or_else(|| ExecError::UnsupportedImport(tag.to_string()))?;
        if self.config.trace {
            writeln!(self.stderr, "[trace] install: {}", manager.invocation(module))?;
        }

        match self.bridge.install(manager, module, &mut *self.stdout) {
            Ok(0) => {
                writeln!(
                    self.stdout,
                    "Library {} for {} installed and loaded.",
                    module, tag
                )?;
                Ok(())
            }
            Ok(code) => Err(ExecError::InstallFailed {
                module: module.to_string(),
                language: tag.to_string(),
                code,
            }),
            Err(source) => Err(ExecError::InstallError {
                module: module.to_string(),
                language: tag.to_string(),
                source,
            }),
        }
    }

    fn run_external_code(&mut self, tag: &str, code: &str) -> Result<(), ExecError> {
        let runtime =
            Runtime::from_tag(tag).ok_or_else(|| ExecError::UnsupportedRuntime(tag.to_string()))?;
        if self.config.trace {
            writeln!(self.stderr, "[trace] run: {}", runtime.invocation(code))?;
        }

        match self.bridge.run(runtime, code, &mut *self.stdout) {
            Ok(0) => Ok(()),
            Ok(code) => Err(ExecError::RunFailed {
                language: tag.to_string(),
                code,
            }),
            Err(source) => Err(ExecError::RunError {
                language: tag.to_string(),
                source,
            }),
        }
    }

    /// Process one line, reporting recoverable errors to the error stream.
    ///
    /// Only a failure to write to the streams themselves is returned.
    pub fn run_line(&mut self, line: &str) -> anyhow::Result<()> {
        match self.process_line(line) {
            Ok(()) => Ok(()),
            Err(ExecError::Io(e)) => Err(e.into()),
            Err(e) => {
                writeln!(self.stderr, "{}", e)?;
                Ok(())
            }
        }
    }

    /// Run every line of `reader`, in order.
    ///
    /// Lines are split on `\n` only; a `\r` before it stays part of the line.
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD, so a bad line
    /// is still processed instead of ending the run.
    pub fn run_reader(&mut self, mut reader: impl BufRead) -> anyhow::Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let bytes_read = reader
                .read_until(b'\n', &mut buf)
                .context("failed to read script")?;
            if bytes_read == 0 {
                break;
            }
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }
            let line = String::from_utf8_lossy(&buf);
            self.run_line(&line)?;
        }
        self.flush()
    }

    /// Open the script at `path` and run it.
    pub fn run_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let file = File::open(path)
            .with_context(|| format!("cannot open script {}", path.display()))?;
        self.run_reader(BufReader::new(file))
    }

    /// Interactive prompt.
    ///
    /// Besides script lines it understands `:call NAME` (replay a function)
    /// and `:quit`.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline("am> ") {
                Ok(line) => {
                    rl.add_history_entry(line.as_str())?;
                    match line.trim() {
                        ":quit" => break,
                        cmd if cmd.starts_with(":call") => {
                            let name = cmd.trim_start_matches(":call").trim();
                            if !self.call_function(name)? {
                                writeln!(self.stderr, "No function named '{}'", name)?;
                            }
                        }
                        _ => self.run_line(&line)?,
                    }
                    self.flush()?;
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        self.flush()
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.stdout.flush()?;
        self.stderr.flush()?;
        Ok(())
    }
}

impl Default for Interpreter {
    /// Interpreter on the standard streams, spawning real processes.
    fn default() -> Self {
        Self::new(Box::new(ProcessBridge::default()), Config::default())
    }
}

/// Remove one pair of surrounding double quotes, if present.
fn strip_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ExitCode;
    use crate::external::ExternalError;
    use crate::io_adapters::MemWriter;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Install(PackageManager, String),
        Run(Runtime, String),
    }

    /// Bridge that records what it was asked to do and never spawns anything.
    struct RecordingBridge {
        calls: Rc<RefCell<Vec<Call>>>,
        result: fn() -> Result<ExitCode, ExternalError>,
    }

    impl ExternalBridge for RecordingBridge {
        fn install(
            &mut self,
            manager: PackageManager,
            module: &str,
            _stdout: &mut dyn Write,
        ) -> Result<ExitCode, ExternalError> {
            self.calls
                .borrow_mut()
                .push(Call::Install(manager, module.to_string()));
            (self.result)()
        }

        fn run(
            &mut self,
            runtime: Runtime,
            code: &str,
            _stdout: &mut dyn Write,
        ) -> Result<ExitCode, ExternalError> {
            self.calls
                .borrow_mut()
                .push(Call::Run(runtime, code.to_string()));
            (self.result)()
        }
    }

    struct Harness {
        am: Interpreter,
        out: Rc<RefCell<Vec<u8>>>,
        err: Rc<RefCell<Vec<u8>>>,
        calls: Rc<RefCell<Vec<Call>>>,
    }

    impl Harness {
        fn with_result(result: fn() -> Result<ExitCode, ExternalError>, config: Config) -> Self {
            let calls = Rc::new(RefCell::new(Vec::new()));
            let (out_writer, out) = MemWriter::with_handle();
            let (err_writer, err) = MemWriter::with_handle();
            let am = Interpreter::with_output(
                Box::new(RecordingBridge {
                    calls: calls.clone(),
                    result,
                }),
                config,
                Box::new(out_writer),
                Box::new(err_writer),
            );
            Harness { am, out, err, calls }
        }

        fn new() -> Self {
            Self::with_result(|| Ok(0), Config::default())
        }

        fn run(&mut self, script: &str) -> &mut Self {
            self.am.run_reader(script.as_bytes()).unwrap();
            self
        }

        fn stdout(&self) -> String {
            MemWriter::contents(&self.out)
        }

        fn stderr(&self) -> String {
            MemWriter::contents(&self.err)
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    #[test]
    fn test_assignment_sets_and_overwrites() {
        let mut h = Harness::new();
        h.run("x = 5\nx = -12\n");
        assert_eq!(h.am.env().get_var("x"), -12);
        assert_eq!(h.stdout(), "Variable x set to 5\nVariable x set to -12\n");
        assert_eq!(h.stderr(), "");
    }

    #[test]
    fn test_bad_assignment_keeps_old_value() {
        let mut h = Harness::new();
        h.run("x = 5\nx = five\ny = 1.5\n");
        assert_eq!(h.am.env().get_var("x"), 5);
        assert!(!h.am.env().vars.contains_key("y"));
        assert_eq!(h.stdout(), "Variable x set to 5\n");
        assert_eq!(
            h.stderr(),
            "Invalid number format: five\nInvalid number format: 1.5\n"
        );
    }

    #[test]
    fn test_print_statement_strips_quotes() {
        let mut h = Harness::new();
        h.am.execute(Statement::Print {
            message: vec!["\"hello\"".to_string()],
        })
        .unwrap();
        h.am.execute(Statement::Print {
            message: vec!["hello".to_string(), "world".to_string()],
        })
        .unwrap();
        h.am.execute(Statement::Print {
            message: vec!["\"".to_string()],
        })
        .unwrap();
        h.am.execute(Statement::Print { message: vec![] }).unwrap();
        assert_eq!(h.stdout(), "hello\nhello world\n\"\n");
    }

    #[test]
    fn test_print_lines() {
        let mut h = Harness::new();
        h.run("print: \"hello\";\nprint: x\nAm:print: \"a  b\"\nprint: \"spaced  out\";\n");
        assert_eq!(h.stdout(), "hello\na b\nspaced  out\n");
        assert_eq!(h.stderr(), "");
    }

    #[test]
    fn test_crlf_is_eaten_by_print_span() {
        let mut h = Harness::new();
        h.run("print: \"hi\"\r\n");
        assert_eq!(h.stdout(), "hi\n");
    }

    #[test]
    fn test_for_loop() {
        let mut h = Harness::new();
        h.run("for i = 0 to 5");
        assert_eq!(
            h.stdout(),
            "Loop iteration, i: 0\nLoop iteration, i: 1\nLoop iteration, i: 2\n\
             Loop iteration, i: 3\nLoop iteration, i: 4\n"
        );
        assert_eq!(h.am.env().get_var("i"), 5);
    }

    #[test]
    fn test_for_loop_empty_range_still_sets_counter() {
        let mut h = Harness::new();
        h.run("for i = 7 to 3");
        assert_eq!(h.stdout(), "");
        assert_eq!(h.am.env().get_var("i"), 7);
    }

    #[test]
    fn test_while_loop() {
        let mut h = Harness::new();
        h.run("x = 0\nwhile x < 3\n");
        assert_eq!(
            h.stdout(),
            "Variable x set to 0\nLoop iteration, x: 0\nLoop iteration, x: 1\nLoop iteration, x: 2\n"
        );
        assert_eq!(h.am.env().get_var("x"), 3);
    }

    #[test]
    fn test_while_already_past_limit() {
        let mut h = Harness::new();
        h.run("x = 10\nwhile x < 3\n");
        assert_eq!(h.stdout(), "Variable x set to 10\n");
        assert_eq!(h.am.env().get_var("x"), 10);
    }

    #[test]
    fn test_while_unset_var_starts_at_zero() {
        let mut h = Harness::new();
        h.run("while n < 2");
        assert_eq!(h.stdout(), "Loop iteration, n: 0\nLoop iteration, n: 1\n");
        assert_eq!(h.am.env().get_var("n"), 2);
    }

    #[test]
    fn test_if_condition() {
        let mut h = Harness::new();
        h.run("if x == 5\nx = 5\nif x == 5\nif x == 6\n");
        assert_eq!(
            h.stdout(),
            "Variable x set to 5\nCondition met for if statement.\n"
        );
    }

    #[test]
    fn test_if_unset_var_is_zero() {
        let mut h = Harness::new();
        h.run("if y == 0\n");
        assert_eq!(h.stdout(), "Condition met for if statement.\n");
    }

    #[test]
    fn test_control_flow_bad_numbers_are_reported() {
        let mut h = Harness::new();
        h.run("if x == five\nwhile x < ten\nfor i = a to 3\n");
        assert_eq!(h.stdout(), "");
        assert_eq!(
            h.stderr(),
            "Invalid number format: five\nInvalid number format: ten\nInvalid number format: a\n"
        );
        assert!(!h.am.env().vars.contains_key("i"));
    }

    #[test]
    fn test_class_and_func() {
        let mut h = Harness::new();
        h.run("class Animal\nfunc greet Hello there\n");
        assert_eq!(h.stdout(), "Class Animal defined.\nFunction greet defined.\n");
        assert_eq!(
            h.am.env().function("greet"),
            Some(&["Hello".to_string(), "there".to_string()][..])
        );
    }

    #[test]
    fn test_call_function_replays_body() {
        let mut h = Harness::new();
        h.run("func greet Hello there\n");
        assert!(h.am.call_function("greet").unwrap());
        assert!(!h.am.call_function("missing").unwrap());
        assert_eq!(
            h.stdout(),
            "Function greet defined.\nCalling function greet\nHello\nthere\n"
        );
    }

    #[test]
    fn test_malformed_statements_continue() {
        let mut h = Harness::new();
        h.run("hello\nclass\nx =\nx = 1\n");
        assert_eq!(h.stdout(), "Variable x set to 1\n");
        assert_eq!(
            h.stderr(),
            "Parse error: unrecognized statement 'hello'\n\
             Parse error: 'class' expects at least 2 tokens, got 1\n\
             Parse error: '=' expects at least 3 tokens, got 2\n"
        );
    }

    #[test]
    fn test_blank_lines_are_noops() {
        let mut h = Harness::new();
        h.run("\n   \n\t\n");
        assert_eq!(h.stdout(), "");
        assert_eq!(h.stderr(), "");
    }

    #[test]
    fn test_unsupported_language_is_reported_once() {
        let mut h = Harness::new();
        h.run("zzz: print(1)\n");
        assert_eq!(
            h.stderr(),
            "Unsupported language for external code execution: zzz\n"
        );
        assert!(h.calls().is_empty());
    }

    #[test]
    fn test_external_line_forwarded_whole() {
        let mut h = Harness::new();
        h.run("python: print(1)\nx = 1\n");
        assert_eq!(
            h.calls(),
            vec![Call::Run(Runtime::Python, "python: print(1)".to_string())]
        );
        assert_eq!(h.stdout(), "Variable x set to 1\n");
    }

    #[test]
    fn test_external_failure_does_not_stop_script() {
        let mut h = Harness::with_result(|| Ok(1), Config::default());
        h.run("node: console.log(1)\nx = 2\n");
        assert_eq!(h.stderr(), "Error executing code in node (exit status 1)\n");
        assert_eq!(h.am.env().get_var("x"), 2);

        let mut h = Harness::with_result(
            || Err(ExternalError::NotFound("ruby".to_string())),
            Config::default(),
        );
        h.run("ruby: puts 1\n");
        assert_eq!(
            h.stderr(),
            "Error executing code in ruby: command not found: ruby\n"
        );
    }

    #[test]
    fn test_import_directive() {
        let mut h = Harness::new();
        h.run("py.import numpy;\nzzz.import thing;\n");
        assert_eq!(
            h.calls(),
            vec![Call::Install(PackageManager::Pip, "numpy".to_string())]
        );
        assert_eq!(h.stdout(), "Library numpy for py installed and loaded.\n");
        assert_eq!(h.stderr(), "Unsupported language for import: zzz\n");
    }

    #[test]
    fn test_import_failure() {
        let mut h = Harness::with_result(|| Ok(2), Config::default());
        h.run("npm.import left-pad;\nnpm.import leftpad;\n");
        // `left-pad` has a dash, so the first line is not an import at all
        assert_eq!(
            h.calls(),
            vec![Call::Install(PackageManager::Npm, "leftpad".to_string())]
        );
        assert_eq!(
            h.stderr(),
            "Parse error: unrecognized statement 'npm.import'\n\
             Error installing library leftpad for npm (exit status 2)\n"
        );
    }

    #[test]
    fn test_trace_goes_to_stderr() {
        let mut h = Harness::with_result(
            || Ok(0),
            Config {
                trace: true,
                ..Config::default()
            },
        );
        h.run("x = 1\nphp: echo 1;\n");
        assert_eq!(h.stdout(), "Variable x set to 1\n");
        let err = h.stderr();
        assert!(err.contains("[trace] line 1: Native"));
        assert!(err.contains("[trace] line 2: External"));
        assert!(err.contains("[trace] run: php -r \"php: echo 1;\""));
    }

    #[test]
    fn test_invalid_utf8_line_does_not_stop_script() {
        let mut h = Harness::new();
        h.am.run_reader(&b"x = 1\nprint: \xff\xfe;\ny = 2\n"[..]).unwrap();
        assert_eq!(h.am.env().get_var("y"), 2);
        assert_eq!(
            h.stdout(),
            "Variable x set to 1\n\u{FFFD}\u{FFFD}\nVariable y set to 2\n"
        );
        assert_eq!(h.stderr(), "");
    }

    #[test]
    fn test_run_file_missing_is_fatal() {
        let mut h = Harness::new();
        let res = h.am.run_file(Path::new("/definitely/not/here.am"));
        let err = res.unwrap_err();
        assert!(err.to_string().contains("cannot open script"));
    }

    #[test]
    fn test_run_file_reads_lines() {
        let mut path = std::env::temp_dir();
        path.push(format!("am_run_file_test_{}.am", std::process::id()));
        std::fs::write(&path, "x = 3\nfor i = 0 to 2\n").unwrap();

        let mut h = Harness::new();
        h.am.run_file(&path).unwrap();
        assert_eq!(
            h.stdout(),
            "Variable x set to 3\nLoop iteration, i: 0\nLoop iteration, i: 1\n"
        );

        let _ = std::fs::remove_file(path);
    }
}
