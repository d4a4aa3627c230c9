//! Pool Runner - Entry Point
//!
//! Runs a worker pool over an in-process queue until SIGINT/SIGTERM.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    pool_runner::run().await
}
