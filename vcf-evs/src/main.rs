// External crates
use clap::Parser;
use tracing::{error, info_span};

// Internal imports
use evs_core::{evs_error, evs_warning};
use evs_logging::Logger;
use evs_messages::{msg, MESSAGES};
use vcf_evs::bootstrap;

// Local modules
mod cli;
mod commands;

use cli::Args;
use commands::{execute_command, Outcome};

fn main() {
    let args = Args::parse();

    // Flushes file logs on drop, so it must outlive the command
    let log_guard = match bootstrap::init_logging(args.debug, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            evs_warning!("Failed to initialize logging: {}", e);
            None
        }
    };

    let request = info_span!(
        "request",
        request_id = bootstrap::request_id(),
        command = args.command.name()
    )
    .entered();
    let log = Logger::root("vcf-evs");

    let code = match execute_command(args, &log) {
        Ok(Outcome::Success) => 0,
        Ok(Outcome::Failed) => 1,
        Err(e) => {
            error!("Command failed: {:#}", e);
            evs_error!("{}", msg!(MESSAGES.common_error, error = format!("{:#}", e)));
            1
        }
    };

    drop(request);
    drop(log_guard);
    std::process::exit(code);
}
