//! # Waybill CLI Entry Point
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Parse arguments
//! 3. Load configuration (defaults → waybill.toml → WAYBILL_* env)
//! 4. Open the Local Store, run migrations, connect the mirror
//! 5. Run the command
//!
//! The actual work lives in the library (`waybill_app::cli`) for testability.

use clap::Parser;
use waybill_app::cli::{self, Cli};

#[tokio::main]
async fn main() {
    waybill_app::init_tracing();

    let cli = Cli::parse();
    if let Err(e) = cli::run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
