// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Thread commissioning tool
//!
//! Discovers Thread Border Agents on the local network, derives PSKc values
//! and manages the local credential cache.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thread_common::{ExtendedPanId, IdentifierError};
use thread_commissioning::{logging, CommissioningConfig};
use thread_credentials::{BorderAgentRecord, CredentialStore, SqliteCredentialStore};
use thread_discovery::{BorderAgentDiscoverer, BorderAgentInfo, NetworkGroup, RegistryListener};
use thread_discovery_mdns::MdnsBackend;
use tracing::{debug, error, warn};

#[derive(Parser, Debug)]
#[command(name = "thread-commission")]
#[command(version, about = "Discover Thread Border Agents and manage network credentials", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/thread-commission/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Credential database, overriding the config file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Browse for Border Agents and list them by Thread network
    Discover {
        /// Seconds to browse
        #[arg(short, long, default_value_t = 5)]
        timeout: u64,
    },

    /// Derive the PSKc of a Thread network
    Pskc {
        /// Commissioning password. If not provided, you will be prompted.
        #[arg(short, long)]
        password: Option<String>,

        /// Thread network name
        #[arg(short, long)]
        network_name: String,

        /// Extended PAN ID as 16 hex characters
        #[arg(short = 'x', long, value_parser = parse_xpanid)]
        xpanid: ExtendedPanId,
    },

    /// Inspect or edit cached credentials
    Credentials {
        #[command(subcommand)]
        command: CredentialsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CredentialsCommand {
    /// List cached Border Agents
    List,

    /// Show one cached credential
    Show {
        discriminator: String,

        /// Also print the PSKc and network key
        #[arg(long)]
        reveal: bool,
    },

    /// Forget a cached credential
    Delete { discriminator: String },
}

fn parse_xpanid(s: &str) -> Result<ExtendedPanId, IdentifierError> {
    let s = s.trim();
    s.strip_prefix("0x").unwrap_or(s).parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose.log_level_filter());

    let mut config = CommissioningConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    debug!(?config, "Loaded configuration");

    let result = match cli.command {
        Command::Discover { timeout } => discover(&config, Duration::from_secs(timeout)).await,
        Command::Pskc {
            password,
            network_name,
            xpanid,
        } => pskc(password, &network_name, &xpanid),
        Command::Credentials { command } => credentials(&config, command).await,
    };

    if let Err(e) = result {
        error!("Command failed: {e:?}");
        println!("{} {e:#}", "FAIL:".bright_red().bold());
        std::process::exit(1);
    }
    Ok(())
}

async fn discover(config: &CommissioningConfig, timeout: Duration) -> Result<()> {
    let backend = MdnsBackend::new()
        .context("Failed to start mDNS daemon")?
        .with_resolve_timeout(config.resolve_timeout());
    let mut discoverer =
        BorderAgentDiscoverer::with_config(Arc::new(backend), config.discovery_config());
    let registry = Arc::new(RegistryListener::new().0);
    discoverer.add_listener(registry.clone());

    println!(
        "{} {}",
        "WAIT: Browsing for".bright_yellow(),
        config.mdns_service_type.bright_white()
    );
    discoverer
        .start()
        .await
        .context("Failed to start discovery")?;
    tokio::time::sleep(timeout).await;
    discoverer.stop().await.context("Failed to stop discovery")?;

    let groups = registry.snapshot();
    if groups.is_empty() {
        println!("{}", "No Border Agents found".bright_yellow());
        return Ok(());
    }

    let store = match SqliteCredentialStore::open(&config.database_path) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "Credential cache unavailable");
            None
        }
    };

    println!();
    for group in &groups {
        print_group(group, store.as_ref()).await;
    }
    Ok(())
}

async fn print_group(group: &NetworkGroup, store: Option<&SqliteCredentialStore>) {
    println!(
        "{} {}",
        group.network.network_name.bright_cyan().bold(),
        format!("(xpanid {})", group.network.extended_pan_id).dimmed()
    );
    for agent in &group.agents {
        let status = match store {
            Some(store) => cache_status(store, agent).await,
            None => "cache unavailable".dimmed().to_string(),
        };
        println!(
            "  {} {} {}  {}",
            "-".bright_white(),
            agent.instance_name.bright_white(),
            agent.socket_addr(),
            status
        );
        println!("      discriminator {}", agent.discriminator);
    }
}

async fn cache_status(store: &SqliteCredentialStore, agent: &BorderAgentInfo) -> String {
    match store.get(&agent.discriminator).await {
        Ok(Some(record)) if record.is_network(&agent.network_name, &agent.extended_pan_id) => {
            return "known".bright_green().to_string();
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, "Credential cache lookup failed");
            return "cache error".bright_red().to_string();
        }
    }
    match store
        .get_by_identity(&agent.network_name, &agent.extended_pan_id)
        .await
    {
        Ok(records) if !records.is_empty() => "known network".green().to_string(),
        Ok(_) => "new".bright_yellow().to_string(),
        Err(e) => {
            warn!(error = %e, "Credential cache lookup failed");
            "cache error".bright_red().to_string()
        }
    }
}

fn pskc(password: Option<String>, network_name: &str, xpanid: &ExtendedPanId) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            print!("{}", "Enter commissioning password: ".bright_yellow());
            std::io::Write::flush(&mut std::io::stdout())?;
            rpassword::read_password()?
        }
    };

    let pskc = thread_crypto::derive_pskc(&password, network_name, xpanid)
        .context("Failed to derive PSKc")?;
    println!("{}", pskc.to_hex().bright_white().bold());
    Ok(())
}

async fn credentials(config: &CommissioningConfig, command: CredentialsCommand) -> Result<()> {
    let store = SqliteCredentialStore::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open credential cache {}",
            config.database_path.display()
        )
    })?;

    match command {
        CredentialsCommand::List => {
            let records = store.list_all().await?;
            if records.is_empty() {
                println!("{}", "No cached credentials".bright_yellow());
            }
            for record in &records {
                let dataset = if record.active_operational_dataset.is_some() {
                    "dataset".bright_green()
                } else {
                    "pskc only".bright_yellow()
                };
                println!(
                    "{}  {} {}  {}",
                    record.discriminator.bright_white().bold(),
                    record.network_name.bright_cyan(),
                    format!("({})", record.extended_pan_id).dimmed(),
                    dataset
                );
            }
        }
        CredentialsCommand::Show {
            discriminator,
            reveal,
        } => {
            let record = store
                .get(&discriminator)
                .await?
                .with_context(|| format!("No cached credential for {discriminator}"))?;
            print_record(&record, reveal);
        }
        CredentialsCommand::Delete { discriminator } => {
            if !store.delete(&discriminator).await? {
                anyhow::bail!("No cached credential for {discriminator}");
            }
            println!("{} {discriminator}", "Deleted".bright_green());
        }
    }
    Ok(())
}

fn print_record(record: &BorderAgentRecord, reveal: bool) {
    let field = |name: &str, value: String| println!("  {:<20} {value}", name.bright_white());

    println!("{}", record.discriminator.bright_cyan().bold());
    field("network name", record.network_name.clone());
    field("extended pan id", record.extended_pan_id.to_hex());
    if reveal {
        field("pskc", record.pskc.to_hex());
    }

    let Some(dataset) = &record.active_operational_dataset else {
        field("dataset", "not fetched".dimmed().to_string());
        return;
    };
    if let Some(channel) = dataset.channel() {
        field("channel", channel.to_string());
    }
    if let Some(pan_id) = dataset.pan_id() {
        field("pan id", format!("{pan_id:#06x}"));
    }
    if let Some(prefix) = dataset.mesh_local_prefix() {
        field("mesh local prefix", hex::encode(prefix));
    }
    if let Some(timestamp) = dataset.active_timestamp_seconds() {
        field("active timestamp", timestamp.to_string());
    }
    if reveal {
        if let Some(key) = dataset.network_key() {
            field("network key", hex::encode(key));
        }
        field("dataset", dataset.to_hex());
    }
}
