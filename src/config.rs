use argh::FromArgs;
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
/// Run an Am script line by line.
/// Lines tagged with another language (e.g. `python: ...`) are handed to that runtime.
pub struct Cli {
    #[argh(positional)]
    /// path of the script to run; required unless --interactive is given.
    pub script: Option<PathBuf>,

    #[argh(switch, short = 'i')]
    /// start an interactive prompt after the script, or without one.
    pub interactive: bool,

    #[argh(option)]
    /// name of a function to invoke once the script has finished. May be repeated.
    pub call: Vec<String>,

    #[argh(switch)]
    /// print external commands instead of running them.
    pub dry_run: bool,

    #[argh(switch)]
    /// trace every processed line to standard error.
    pub trace: bool,
}

/// Runtime options of an [`crate::Interpreter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// External commands are printed, never spawned.
    pub dry_run: bool,
    /// Each classified line and each external invocation is written to the error stream.
    pub trace: bool,
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Self {
            dry_run: cli.dry_run,
            trace: cli.trace,
        }
    }
}
