use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sheets::{export_url, HttpSheetSource, SheetSource, TableQuery};
use shared::domain::ChatPayload;
use webhooks::{HttpWebhookClient, WebhookClient, WebhookConfig};

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the CSV export URL for a spreadsheet share link.
    ExportUrl { share_url: String },
    /// Fetch a sheet and print one page of the dashboard table.
    Preview {
        sheet_url: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        page_size: usize,
        #[arg(long, default_value_t = 15)]
        timeout_secs: u64,
    },
    /// Send one message to the chat webhook and print the reply.
    Chat {
        message: String,
        #[arg(long)]
        webhook_url: String,
        #[arg(long, default_value = webhooks::DEFAULT_WEBHOOK_USER)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::ExportUrl { share_url } => {
            println!("{}", export_url(&share_url)?);
        }
        Command::Preview {
            sheet_url,
            status,
            search,
            page,
            page_size,
            timeout_secs,
        } => {
            let source = HttpSheetSource::new(Duration::from_secs(timeout_secs));
            let table = source
                .fetch(&sheet_url)
                .await
                .with_context(|| format!("failed to load {sheet_url}"))?;
            if let Some(error) = table.render_input_error() {
                eprintln!("warning: {error}");
            }
            let view = table.query(&TableQuery {
                status,
                search,
                page,
                page_size,
            });
            let metrics = view.metrics;
            println!(
                "total={} completed={} in_progress={} pending={} with_video={}",
                metrics.total,
                metrics.completed,
                metrics.in_progress,
                metrics.pending,
                metrics.with_video
            );
            for row in &view.rows {
                let record = &row.record;
                println!(
                    "{:>4}  #{:<6} {:<12} {}",
                    row.item_number,
                    record.id.as_deref().unwrap_or("-"),
                    record.status().label(),
                    record.idea.as_deref().unwrap_or_default()
                );
            }
            println!(
                "page {}/{} ({} of {} rows match)",
                view.page, view.total_pages, view.matching_rows, view.total_rows
            );
        }
        Command::Chat {
            message,
            webhook_url,
            user,
        } => {
            let client = HttpWebhookClient::new(WebhookConfig {
                chat_url: webhook_url,
                user,
                ..WebhookConfig::default()
            });
            let reply = client
                .send_chat(&ChatPayload { text: message })
                .await
                .context("chat webhook call failed")?;
            println!("{reply}");
        }
    }

    Ok(())
}
