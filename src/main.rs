// src/main.rs

use taskstack::logging::LogMode;
use taskstack::{cli, demo, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("taskstack error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    let mode = if args.is_child() {
        LogMode::Task
    } else {
        LogMode::Orchestrator
    };
    logging::init_logging(args.log_level, mode)?;
    run(args, demo::registry()?).await
}
