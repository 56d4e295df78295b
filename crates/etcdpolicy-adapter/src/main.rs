//! etcdpolicy CLI
//!
//! Inspect and edit the policy rules stored under one etcd namespace.
//! - `dump`: print every stored rule as a policy line
//! - `import`: replace the stored rules with a policy file
//! - `add` / `remove`: single-rule edits
//! - `remove-filtered`: bulk delete by partial rule
//! - `clear`: delete everything under the namespace

use std::fs;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use etcdpolicy_adapter::{config, MemoryModel, PolicyAdapter};
use etcdpolicy_core::error::{PolicyError, Result};
use etcdpolicy_core::rule::section_of;

#[derive(Debug, Parser)]
#[command(name = "etcdpolicy", about = "Manage policy rules stored in etcd")]
struct Cli {
    /// Adapter config file (YAML).
    #[arg(short, long, default_value = "etcdpolicy.yaml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every stored rule.
    Dump,
    /// Replace the stored rules with the rules of a policy file.
    Import { file: String },
    /// Store one rule.
    Add { ptype: String, fields: Vec<String> },
    /// Delete one rule.
    Remove { ptype: String, fields: Vec<String> },
    /// Delete every rule matching the given field values.
    RemoveFiltered {
        /// Rule type; omit to match every type.
        #[arg(long, default_value = "")]
        ptype: String,
        /// Position of the first value.
        #[arg(long, default_value_t = 0)]
        field_index: usize,
        values: Vec<String>,
    },
    /// Delete every rule under the namespace.
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "etcdpolicy failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = config::load_from_file(&cli.config)?;
    let adapter = PolicyAdapter::connect(&cfg).await?;

    let res = execute(&adapter, cli.command).await;
    adapter.close();
    res
}

async fn execute(adapter: &PolicyAdapter, command: Command) -> Result<()> {
    match command {
        Command::Dump => {
            let mut model = MemoryModel::new();
            adapter.load_policy(&mut model).await?;
            for line in model.lines() {
                println!("{line}");
            }
        }
        Command::Import { file } => {
            let text = fs::read_to_string(&file)
                .map_err(|e| PolicyError::Config(format!("read policy file {file} failed: {e}")))?;
            let model = MemoryModel::from_policy_text(&text)?;
            adapter.save_policy(&model).await?;
            println!("imported {} rules into {}", model.len(), adapter.namespace().root());
        }
        Command::Add { ptype, fields } => {
            adapter.add_policy(section_of(&ptype), &ptype, &fields).await?;
        }
        Command::Remove { ptype, fields } => {
            adapter.remove_policy(section_of(&ptype), &ptype, &fields).await?;
        }
        Command::RemoveFiltered {
            ptype,
            field_index,
            values,
        } => {
            let removed = adapter
                .remove_filtered_policy(section_of(&ptype), &ptype, field_index, &values)
                .await?;
            println!("removed {removed} rules");
        }
        Command::Clear => {
            let removed = adapter.clear_policy().await?;
            println!("removed {removed} rules");
        }
    }
    Ok(())
}
