use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use backend_server::config::EnvSource;
use backend_server::observability::{init_logging, LogFormat};
use backend_server::Bootstrap;

#[derive(Parser, Debug)]
#[command(name = "backend-server")]
#[command(about = "HTTP service bootstrap with latency logging and liveness heartbeat", long_about = None)]
struct Cli {
    /// Optional dotenv file; variables already in the environment win.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Log output format (json or pretty).
    #[arg(long, env = "LOG_FORMAT", default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_format) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "backend-server starting");

    let process = match Bootstrap::new(EnvSource::with_dotenv(cli.env_file)).start().await {
        Ok(process) => process,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::from(e.exit_code());
        }
    };

    process.wait().await;
    ExitCode::SUCCESS
}
