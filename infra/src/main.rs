//! Synthesizes the CloudFormation templates of every stack.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use infra::app::{self, Context};
use infra::stacks::StackSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "infra", about = "Stack definitions for the premium content APIs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write templates and manifest.json
    Synth {
        #[arg(long, default_value = "cdk.out")]
        out_dir: PathBuf,
        /// JSON file with deployment context (owner, github_repo_url, ...)
        #[arg(long)]
        context: Option<PathBuf>,
        /// Prefix of the hosted Cognito auth domain
        #[arg(long, env = "COGNITO_DOMAIN_PREFIX")]
        domain_prefix: Option<String>,
        /// Default bucket holding the Lambda zips
        #[arg(long, env = "ARTIFACT_BUCKET")]
        artifact_bucket: Option<String>,
    },
    /// Print stack names in deploy order
    List,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Synth {
            out_dir,
            context,
            domain_prefix,
            artifact_bucket,
        } => {
            let defaults = StackSettings::default();
            let settings = StackSettings {
                domain_prefix: domain_prefix.unwrap_or(defaults.domain_prefix),
                artifact_bucket: artifact_bucket.unwrap_or(defaults.artifact_bucket),
            };
            let context = match context {
                Some(path) => Context::load(&path)
                    .with_context(|| format!("reading context {}", path.display()))?,
                None => Context::default(),
            };

            let manifest = app::synth(&settings, &context, &out_dir)
                .with_context(|| format!("synthesizing into {}", out_dir.display()))?;
            println!(
                "Synthesized {} stacks into {}",
                manifest.stacks.len(),
                out_dir.display()
            );
        }
        Command::List => {
            for stack in app::build(&StackSettings::default())? {
                println!("{}", stack.name);
            }
        }
    }

    Ok(())
}
