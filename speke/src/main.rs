use speke::cli::initialize_from_arguments;
use std::{env, process::ExitCode};

/// Without arguments, main runs one honest jablon handshake.
#[tokio::main]
async fn main() -> ExitCode {
    println!("speke v{}", env!("CARGO_PKG_VERSION"));
    match initialize_from_arguments().await {
        Ok(()) => {
            println!("Done");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}
