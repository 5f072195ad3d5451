// This is the entry point for the CLI application.
// It parses command-line arguments, sets up logging and hands the run over to the library.

use std::io;
use std::process;

use oas_validator::cli::report::print_usage;
use oas_validator::utils::init_logging;
use oas_validator::{parse_args, run, AppError, UsageError, EXIT_USAGE};

fn main() {
    let options = match parse_args(std::env::args_os()) {
        Ok(options) => options,
        Err(err) => {
            // clap renders its own usage section
            eprintln!("{}", err);
            if !matches!(err, UsageError::Clap(_)) {
                let _ = print_usage(&mut io::stderr());
            }
            process::exit(AppError::from(err).exit_code());
        }
    };

    if let Err(err) = init_logging(options.log_dir.as_deref()) {
        eprintln!("Error creating log file: {}", err);
        process::exit(EXIT_USAGE);
    }

    let stdout = io::stdout();
    let stderr = io::stderr();
    let code = run(&options, &mut stdout.lock(), &mut stderr.lock());

    process::exit(code);
}
