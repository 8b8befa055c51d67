//! # Command-Line Interface
//!
//! ```text
//! waybill [--config <path>] [--offline] [--json] <command>
//!
//!   status              local vs remote counts, pending uploads
//!   sync                upload missing records to the mirror
//!   drafts              list stored drafts
//!   shipments           list published shipments
//!   totals <invoice>    subtotal / tax / discount / total of one shipment
//!   discard <draft-id>  delete a stored draft
//!   config              print the effective configuration
//! ```
//!
//! Errors are printed as `Error: [CODE] message` and exit with status 1.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;
use waybill_sync::{SyncReport, WaybillConfig};

use crate::context::AppContext;
use crate::error::{ApiError, ApiResult, ErrorCode};

#[derive(Debug, Parser)]
#[command(name = "waybill")]
#[command(version)]
#[command(about = "Shipment invoices, local-first", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short, global = true, env = "WAYBILL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Refuse to contact the remote mirror
    #[arg(long, global = true)]
    pub offline: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show migration status against the remote mirror
    Status,

    /// Upload local records the mirror does not have yet
    Sync,

    /// List stored drafts
    Drafts {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// List published shipments
    Shipments {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Show totals of one shipment
    Totals {
        /// Invoice number (case-insensitive)
        invoice: String,
    },

    /// Delete a stored draft
    Discard {
        draft_id: String,
    },

    /// Print the effective configuration
    Config,
}

/// Loads configuration, opens the context and runs one command.
pub async fn run(cli: Cli) -> ApiResult<()> {
    let mut config = WaybillConfig::load(cli.config.clone())?;
    if cli.offline {
        config.sync.force_offline = true;
    }

    if let Command::Config = cli.command {
        return print_config(&config, cli.json);
    }

    let ctx = AppContext::open(config).await?;
    let result = execute(&ctx, &cli.command, cli.json).await;
    ctx.close().await;
    result
}

async fn execute(ctx: &AppContext, command: &Command, json: bool) -> ApiResult<()> {
    debug!(?command, "Executing command");
    match command {
        Command::Status => {
            let status = ctx.compute_migration_status().await?;
            emit(json, &status, || {
                println!("Migrated: {}", if status.has_migrated { "yes" } else { "no" });
                println!("Local:    {}", status.local);
                println!("Remote:   {}", status.remote);
                println!("Pending:  {}", status.pending);
            })
        }
        Command::Sync => {
            let report = ctx.sync().await?;
            emit(json, &report, || print_report(&report))?;
            match report.partial_failure() {
                Some(partial) => Err(ApiError::new(ErrorCode::SyncError, partial.to_string())),
                None => Ok(()),
            }
        }
        Command::Drafts { limit } => {
            let drafts = ctx.list_drafts(*limit).await?;
            emit(json, &drafts, || {
                if drafts.is_empty() {
                    println!("No drafts");
                }
                for d in &drafts {
                    println!(
                        "{}  {:<12}  {:<24}  {} box(es)  step {}  {}",
                        d.id,
                        d.invoice_number.as_deref().unwrap_or("(untitled)"),
                        d.shipper,
                        d.box_count,
                        d.current_step,
                        d.updated_at.format("%Y-%m-%d %H:%M"),
                    );
                }
            })
        }
        Command::Shipments { limit, offset } => {
            let shipments = ctx.list_shipments(*limit, *offset).await?;
            emit(json, &shipments, || {
                if shipments.is_empty() {
                    println!("No shipments");
                }
                for s in &shipments {
                    println!(
                        "{:<12}  {:<24}  {:<24}  {:<10}  {:>3} box(es)  {:>12}",
                        s.invoice_number,
                        s.shipper,
                        s.consignee,
                        s.status.as_str(),
                        s.box_count,
                        waybill_core::Money::from_cents(s.total_cents).to_string(),
                    );
                }
            })
        }
        Command::Totals { invoice } => {
            let totals = ctx.shipment_totals(invoice).await?;
            emit(json, &totals, || {
                println!("Items:    {}", totals.total_items);
                println!("Weight:   {}", totals.total_weight);
                println!("Subtotal: {}", totals.subtotal);
                println!("Tax:      {}", totals.tax);
                println!("Discount: {}", totals.discount);
                println!("Total:    {}", totals.total);
            })
        }
        Command::Discard { draft_id } => {
            ctx.discard_draft(draft_id).await?;
            if !json {
                println!("Discarded draft {draft_id}");
            }
            Ok(())
        }
        Command::Config => print_config(ctx.config(), json),
    }
}

fn print_report(report: &SyncReport) {
    if report.skipped {
        println!("Nothing to sync: no local shipments");
        return;
    }
    println!("Uploaded: {}", report.uploaded);
    for failure in &report.failures {
        println!(
            "Failed:   {} ({} record(s)): {}",
            failure.class, failure.records, failure.message
        );
    }
}

fn print_config(config: &WaybillConfig, json: bool) -> ApiResult<()> {
    let mut shown = config.clone();
    if shown.mirror.api_key.is_some() {
        shown.mirror.api_key = Some("********".into());
    }
    if json {
        return emit(true, &shown, || {});
    }
    let text = toml::to_string_pretty(&shown)
        .map_err(|e| ApiError::internal(format!("Could not render config: {e}")))?;
    print!("{text}");
    Ok(())
}

/// Prints `value` as JSON, or runs `human` for text output.
fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce()) -> ApiResult<()> {
    if json {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| ApiError::internal(format!("Could not render output: {e}")))?;
        println!("{text}");
    } else {
        human();
    }
    Ok(())
}
