use std::process::ExitCode;

use clap::Parser;
use script_desk_cli::app::{self, RunOutcome};
use script_desk_cli::cli_args::Args;
use script_desk_cli::prompting::Terminal;

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    let mut terminal = Terminal::stdio();

    match app::run(&args, &mut terminal) {
        Ok(RunOutcome::Succeeded) => ExitCode::SUCCESS,
        Ok(RunOutcome::Failed) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
