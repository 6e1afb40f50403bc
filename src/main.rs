use clap::Parser;
use jsonl_compactor::cli::Cli;
use jsonl_compactor::compactor::{run_isolated, Compactor};
use jsonl_compactor::network::SystemAddresses;
use jsonl_compactor::storage::JsonlEngine;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let failed = match cli.target_directory() {
        Ok(dir) => {
            let compactor = Compactor::new(JsonlEngine, SystemAddresses);
            match run_isolated(async move { compactor.run(&dir).await }).await {
                Some(report) => {
                    println!("{}", report);
                    report.has_failures()
                }
                None => true,
            }
        }
        Err(e) => {
            log::error!("Cannot determine working directory: {}", e);
            true
        }
    };

    // Outside strict mode failures are reported in the log only.
    if cli.strict && failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
