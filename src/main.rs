mod cli;
mod config;
mod error;
mod harness;
mod logging;
mod pizza;
mod status;

use cli::CommandDispatcher;
use status::ExitStatus;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitStatus {
    let argv: Vec<String> = std::env::args().collect();

    // Falls back to the embedded defaults when no config file loads
    let config = config::Config::load().unwrap_or_default();

    CommandDispatcher::new(config).run(&argv).await
}
