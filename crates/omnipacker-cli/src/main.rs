use omnipacker_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // The file log can be unavailable (read-only state dir); stderr still works.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("omnipacker error: {:#}", err);
        std::process::exit(1);
    }
}
