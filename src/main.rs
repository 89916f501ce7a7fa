use clap::{Parser, Subcommand};
use nanny_booking::config::Config;
use nanny_booking::display::format_location;
use nanny_booking::referral::{DatabaseCodeRegistry, ReferralCodeGenerator};
use nanny_booking::state::AppState;
use nanny_booking::{logging, metrics, server};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "nanny_booking")]
#[command(about = "Nanny booking platform functions and tools")]
#[command(version)]
struct Cli {
    /// Expose Prometheus metrics (port from NANNY_METRICS_PORT)
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the function endpoints and the dashboard API
    Serve {
        /// Overrides the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate unused referral codes
    Codes {
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Store the generated codes in the referral_codes table
        #[arg(long)]
        save: bool,
    },
    /// Show how a stored location value is displayed
    Location {
        raw: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load()?;
    let _log_guard = logging::init_logging(&config.server.log_dir);

    if cli.metrics {
        metrics::init_metrics();
    }

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            let state = Arc::new(AppState::from_config(&config));
            server::start_server(state, port).await?;
        }
        Commands::Codes { count, save } => {
            let state = AppState::from_config(&config);
            if save && config.supabase.is_none() {
                warn!("No Supabase backend configured; saved codes will not outlive this process");
            }
            let generator = ReferralCodeGenerator::new(Arc::new(DatabaseCodeRegistry::new(state.db.clone())));
            let codes = if save {
                generator.issue_codes(count).await?
            } else {
                generator.generate_bulk_codes(count).await?
            };
            info!("Generated {} of {} requested referral codes", codes.len(), count);
            for code in codes {
                println!("{}", code);
            }
        }
        Commands::Location { raw } => {
            println!("{}", format_location(Some(&raw)));
        }
    }

    Ok(())
}
