use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};

use crashnote::console::{Console, TerminalConsole};
use crashnote::{InstallPaths, Reporter, config, logging, setup};

// --- CLI -----------------------------------------------------------------

#[derive(Parser)]
#[command(name = "crashnote", version, about = "File crash reports as GitHub issues")]
struct Cli {
    /// Directory holding key.key and errorconfig.json (default: next to the executable)
    #[arg(long, global = true, env = "CRASHNOTE_DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Describe a problem and file it as an issue (default)
    Report,
    /// Generate the encryption key and write errorconfig.json
    Setup,
    /// Report a deliberate panic to check the installation end to end
    SelfTest,
}

// --- Startup -------------------------------------------------------------

/// Fail-closed: nothing past this point runs unless the install loads.
fn open_reporter(paths: &InstallPaths) -> Option<Reporter> {
    match config::load(paths) {
        Ok(config) => Some(Reporter::new(config, paths.clone())),
        Err(e) => {
            tracing::error!(error = %e, "startup configuration check failed");
            TerminalConsole::new().say("red", &format!("Error: {e}"));
            None
        }
    }
}

fn clear_screen() {
    if io::stdout().is_terminal() {
        let _ = execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
    }
}

// --- Entry point ---------------------------------------------------------

fn run(cli: Cli) -> Result<ExitCode> {
    let paths = match cli.dir {
        Some(dir) => InstallPaths::new(dir),
        None => InstallPaths::beside_executable()?,
    };

    match cli.command.unwrap_or(Command::Report) {
        Command::Setup => {
            setup::run_setup(&paths, &mut TerminalConsole::new())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Report => {
            let Some(mut reporter) = open_reporter(&paths) else {
                return Ok(ExitCode::FAILURE);
            };
            clear_screen();
            match reporter.standalone()? {
                Some(_) => Ok(ExitCode::SUCCESS),
                None => Ok(ExitCode::FAILURE),
            }
        }
        Command::SelfTest => {
            let Some(mut reporter) = open_reporter(&paths) else {
                return Ok(ExitCode::FAILURE);
            };
            Ok(reporter.run(|| -> Result<()> { panic!("crashnote self-test: deliberate panic") }))
        }
    }
}

fn main() -> ExitCode {
    logging::init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            TerminalConsole::new().say("red", &format!("Error: {e:#}"));
            ExitCode::FAILURE
        }
    }
}
