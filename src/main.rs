use am_lang::{Cli, Config, Interpreter, ProcessBridge};
use anyhow::Result;
use std::process::ExitCode;

fn run(cli: Cli) -> Result<()> {
    let config = Config::from(&cli);
    let mut am = Interpreter::new(Box::new(ProcessBridge::new(&config)), config);

    if let Some(script) = &cli.script {
        am.run_file(script)?;
    }

    for name in &cli.call {
        if !am.call_function(name)? {
            eprintln!("No function named '{}'", name);
        }
    }

    if cli.interactive {
        am.repl()?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli: Cli = argh::from_env();

    if cli.script.is_none() && !cli.interactive {
        let program = std::env::args().next().unwrap_or_else(|| "am".to_string());
        eprintln!("Usage: {} <filename>", program);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("am: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
