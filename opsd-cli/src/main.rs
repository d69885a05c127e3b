//! opsd - Command-line review channel
//!
//! Thin adapter over the opsd-recon API: lists pending resolution items,
//! submits decisions tagged with `channel = "cli"`, and reviews staged
//! proposals.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use opsd_common::model::ResolutionItem;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "opsd", about = "Operations dashboard review CLI")]
struct Cli {
    /// Base URL of the opsd-recon service
    #[arg(long, env = "OPSD_URL", default_value = "http://127.0.0.1:5810")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List pending resolution items
    Pending {
        /// Filter by kind (customer_match, engineer_split)
        #[arg(long)]
        kind: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Resolve one item
    Resolve {
        id: Uuid,
        /// approve, reject, skip, or manual
        #[arg(long)]
        action: String,
        /// Target customer for manual customer_match decisions
        #[arg(long)]
        customer: Option<Uuid>,
    },
    /// Show queue statistics
    Stats,
    /// List proposals
    Proposals {
        #[arg(long, default_value = "pending")]
        status: String,
    },
    /// Approve or reject a proposal
    ResolveProposal {
        id: Uuid,
        #[arg(long)]
        action: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Command::Pending { kind, limit } => {
            let mut url = format!("{}/api/resolutions?limit={}", cli.url, limit);
            if let Some(kind) = kind {
                url.push_str(&format!("&kind={}", kind));
            }
            let items: Vec<ResolutionItem> = get_json(&client, &url).await?;

            if items.is_empty() {
                println!("No pending items.");
                return Ok(());
            }
            for item in items {
                let suggestion = item
                    .suggested_match
                    .map(|s| format!("{} ({}, {})", s.label, s.confidence, s.matched_on))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  [{}] {:>3}  {}  -> {}",
                    item.id,
                    item.kind.as_str(),
                    item.confidence,
                    item.source_entity,
                    suggestion
                );
            }
        }
        Command::Resolve {
            id,
            action,
            customer,
        } => {
            if !matches!(action.as_str(), "approve" | "reject" | "skip" | "manual") {
                bail!("Unknown action: {}", action);
            }
            let mut body = json!({ "action": action, "channel": "cli" });
            if let Some(customer) = customer {
                body["customer_id"] = json!(customer);
            }

            let url = format!("{}/api/resolutions/{}/resolve", cli.url, id);
            let response: Value = post_json(&client, &url, &body).await?;
            if response["skipped"].as_bool().unwrap_or(false) {
                println!("Skipped; item stays pending.");
            } else {
                println!(
                    "Resolved as {}.",
                    response["status"].as_str().unwrap_or("unknown")
                );
            }
        }
        Command::Stats => {
            let url = format!("{}/api/resolutions/stats", cli.url);
            let stats: Value = get_json(&client, &url).await?;
            println!(
                "pending: {}  auto_resolved: {}  confirmed: {}  rejected: {}",
                stats["pending"], stats["auto_resolved"], stats["confirmed"], stats["rejected"]
            );
            if let Some(by_kind) = stats["by_kind"].as_object() {
                for (kind, counts) in by_kind {
                    println!("  {}: {} pending", kind, counts["pending"]);
                }
            }
        }
        Command::Proposals { status } => {
            let url = format!("{}/api/proposals?status={}", cli.url, status);
            let proposals: Vec<Value> = get_json(&client, &url).await?;
            if proposals.is_empty() {
                println!("No {} proposals.", status);
                return Ok(());
            }
            for p in proposals {
                println!(
                    "{}  [{}] {}",
                    p["id"].as_str().unwrap_or("?"),
                    p["kind"].as_str().unwrap_or("?"),
                    p["description"].as_str().unwrap_or("")
                );
            }
        }
        Command::ResolveProposal { id, action } => {
            if !matches!(action.as_str(), "approve" | "reject") {
                bail!("Unknown action: {}", action);
            }
            let url = format!("{}/api/proposals/{}/resolve", cli.url, id);
            let response: Value = post_json(&client, &url, &json!({ "action": action })).await?;
            println!(
                "Proposal {}.",
                response["status"].as_str().unwrap_or("updated")
            );
        }
    }

    Ok(())
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T> {
    let response = client.get(url).send().await.context("Request failed")?;
    check_status(&response)?;
    response.json().await.context("Invalid response body")
}

async fn post_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
) -> Result<T> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .context("Request failed")?;
    check_status(&response)?;
    response.json().await.context("Invalid response body")
}

fn check_status(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status == reqwest::StatusCode::CONFLICT {
        bail!("Already handled through another channel.");
    }
    if !status.is_success() {
        bail!("Service returned {}", status);
    }
    Ok(())
}
