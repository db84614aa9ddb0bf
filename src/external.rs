use crate::command::{ExitCode, ExternalBridge};
use crate::config::Config;
use std::ffi::OsStr;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;

/// Language runtimes that can execute an inline snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    Python,
    Node,
    Ruby,
    Go,
    Rust,
    Solidity,
    Php,
    CSharp,
    R,
}

impl Runtime {
    pub const ALL: [Runtime; 9] = [
        Runtime::Python,
        Runtime::Node,
        Runtime::Ruby,
        Runtime::Go,
        Runtime::Rust,
        Runtime::Solidity,
        Runtime::Php,
        Runtime::CSharp,
        Runtime::R,
    ];

    /// Resolve the tag written in front of an external line, e.g. `python:`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rt| rt.tag() == tag)
    }

    pub fn tag(self) -> &'static str {
        match self {
            Runtime::Python => "python",
            Runtime::Node => "node",
            Runtime::Ruby => "ruby",
            Runtime::Go => "go",
            Runtime::Rust => "rust",
            Runtime::Solidity => "sol",
            Runtime::Php => "php",
            Runtime::CSharp => "cs",
            Runtime::R => "r",
        }
    }

    /// Command line that runs `code` with this runtime.
    pub fn invocation(self, code: &str) -> Invocation {
        let (program, flags): (&str, &[&str]) = match self {
            Runtime::Python => ("python", &["-c"]),
            Runtime::Node => ("node", &["-e"]),
            Runtime::Ruby => ("ruby", &["-e"]),
            Runtime::Go => ("go", &["run", "-e"]),
            Runtime::Rust => ("rustc", &["-e"]),
            Runtime::Solidity => ("solc", &["--bin", "--abi"]),
            Runtime::Php => ("php", &["-r"]),
            Runtime::CSharp => ("dotnet", &["script", "-e"]),
            Runtime::R => ("R", &["-e"]),
        };
        Invocation::new(program, flags.iter().copied().chain([code]))
    }
}

/// Package managers reachable through `tag.import module;` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    Pip,
    Npm,
    Gem,
    Go,
    Cargo,
    Solidity,
    Maven,
    Composer,
    Dotnet,
    R,
}

impl PackageManager {
    pub const ALL: [PackageManager; 10] = [
        PackageManager::Pip,
        PackageManager::Npm,
        PackageManager::Gem,
        PackageManager::Go,
        PackageManager::Cargo,
        PackageManager::Solidity,
        PackageManager::Maven,
        PackageManager::Composer,
        PackageManager::Dotnet,
        PackageManager::R,
    ];

    /// Resolve the tag written in front of `.import`, e.g. `py`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pm| pm.tag() == tag)
    }

    pub fn tag(self) -> &'static str {
        match self {
            PackageManager::Pip => "py",
            PackageManager::Npm => "npm",
            PackageManager::Gem => "ruby",
            PackageManager::Go => "go",
            PackageManager::Cargo => "rust",
            PackageManager::Solidity => "sol",
            PackageManager::Maven => "mvn",
            PackageManager::Composer => "php",
            PackageManager::Dotnet => "cs",
            PackageManager::R => "r",
        }
    }

    /// Command line that installs `module`.
    pub fn invocation(self, module: &str) -> Invocation {
        match self {
            PackageManager::Pip => Invocation::new("pip", ["install", module]),
            PackageManager::Npm => Invocation::new("npm", ["install", module]),
            PackageManager::Gem => Invocation::new("gem", ["install", module]),
            PackageManager::Go => Invocation::new("go", ["get", module]),
            PackageManager::Cargo => Invocation::new("cargo", ["install", module]),
            PackageManager::Solidity => Invocation::new("npm", ["install", "-g", module]),
            PackageManager::Maven => Invocation::new(
                "mvn",
                ["dependency:get".to_string(), format!("-Dartifact={module}")],
            ),
            PackageManager::Composer => Invocation::new("composer", ["require", module]),
            PackageManager::Dotnet => Invocation::new("dotnet", ["add", "package", module]),
            PackageManager::R => Invocation::new(
                "R",
                ["-e".to_string(), format!("install.packages('{module}')")],
            ),
        }
    }
}

/// A program together with its argument vector. Arguments are passed to the
/// child directly, no shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Failures of the bridge itself, as opposed to a child exiting non-zero.
#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("command not found: {0}")]
    NotFound(String),

    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Bridge that launches real child processes.
///
/// The child inherits the interpreter's standard streams. With `dry_run` set,
/// the command line is written to the output stream instead and reported as
/// successful.
#[derive(Debug, Clone, Default)]
pub struct ProcessBridge {
    dry_run: bool,
}

impl ProcessBridge {
    pub fn new(config: &Config) -> Self {
        Self {
            dry_run: config.dry_run,
        }
    }

    fn spawn(&self, invocation: &Invocation, stdout: &mut dyn Write) -> Result<ExitCode, ExternalError> {
        let io_error = |source: std::io::Error| ExternalError::Io {
            program: invocation.program.clone(),
            source,
        };

        if self.dry_run {
            writeln!(stdout, "{}", invocation).map_err(io_error)?;
            return Ok(0);
        }

        // Keep our own output ordered before whatever the child prints.
        stdout.flush().map_err(io_error)?;

        let search_paths = std::env::var_os("PATH").unwrap_or_default();
        let toolchain = locate_toolchain(&search_paths, &invocation.program)
            .ok_or_else(|| ExternalError::NotFound(invocation.program.clone()))?;

        let status = Command::new(toolchain)
            .args(&invocation.args)
            .status()
            .map_err(io_error)?;
        Ok(exit_code(status))
    }
}

impl ExternalBridge for ProcessBridge {
    fn install(
        &mut self,
        manager: PackageManager,
        module: &str,
        stdout: &mut dyn Write,
    ) -> Result<ExitCode, ExternalError> {
        self.spawn(&manager.invocation(module), stdout)
    }

    fn run(
        &mut self,
        runtime: Runtime,
        code: &str,
        stdout: &mut dyn Write,
    ) -> Result<ExitCode, ExternalError> {
        self.spawn(&runtime.invocation(code), stdout)
    }
}

/// Exit code of a finished toolchain process.
///
/// A runtime killed by a signal has no code of its own; it is reported as
/// `128 + signal`, so a crashed interpreter still counts as a failed run.
fn exit_code(status: ExitStatus) -> ExitCode {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// Locate the executable of a language toolchain (`python`, `npm`, `solc`, ...).
///
/// Runtimes and package managers are named by program name and looked up in
/// each directory of `search_paths`, first hit wins. A name that already
/// carries a directory (`/usr/bin/python3`, `venv/bin/pip`) is used as is.
/// Only regular files count; an empty name never resolves.
pub fn locate_toolchain(search_paths: &OsStr, program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    let path = Path::new(program);
    if path.components().count() > 1 || path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    std::env::split_paths(search_paths)
        .flat_map(|dir| toolchain_candidates(&dir, program))
        .find(|candidate| candidate.is_file())
}

/// File names a toolchain may be installed under inside one directory.
fn toolchain_candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    let mut candidates = vec![dir.join(program)];
    if cfg!(windows) {
        candidates.push(dir.join(format!("{program}.exe")));
    }
    candidates
}
