//! nlconf command - query and change the agent configuration tree.

mod request;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use nlconf::{
    Agent, AgentConfig, Backend, BackendKind, GroupId, IoctlBackend, NetlinkBackend, Registry,
    SystemHost,
};
use serde::Serialize;

use request::{Request, parse_batch};

#[derive(Parser)]
#[command(name = "nlconf", version, about = "Agent configuration tree tool")]
struct Cli {
    /// Agent configuration file (JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend serving requests (netlink, ioctl). Overrides the config file.
    #[arg(short, long, global = true)]
    backend: Option<BackendKind>,

    /// Output JSON.
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Group identifier staged changes are recorded under.
    #[arg(short, long, global = true, default_value_t = 1)]
    group: GroupId,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the value of an instance.
    Get { oid: String },

    /// Change the value of an instance.
    Set { oid: String, value: String },

    /// Create an instance.
    Add {
        oid: String,
        #[arg(default_value = "")]
        value: String,
    },

    /// Delete an instance.
    Del { oid: String },

    /// List the instances of an object.
    #[command(visible_alias = "ls")]
    List { oid: String },

    /// Apply staged changes.
    Commit { oid: String },

    /// Run requests from a file ("-" for stdin), one `VERB OID [VALUE]` per
    /// line, against a single agent.
    Batch { file: PathBuf },

    /// Show the object tree and the verbs each node accepts.
    Tree,
}

impl Command {
    fn into_request(self) -> Option<Request> {
        Some(match self {
            Self::Get { oid } => Request::Get { oid },
            Self::Set { oid, value } => Request::Set { oid, value },
            Self::Add { oid, value } => Request::Add { oid, value },
            Self::Del { oid } => Request::Del { oid },
            Self::List { oid } => Request::List { oid },
            Self::Commit { oid } => Request::Commit { oid },
            Self::Batch { .. } | Self::Tree => return None,
        })
    }
}

#[derive(Serialize)]
struct TreeNode {
    path: String,
    caps: String,
}

fn print_tree(json: bool) -> anyhow::Result<()> {
    let registry = Registry::agent()?;
    let nodes: Vec<TreeNode> = registry
        .paths()
        .into_iter()
        .map(|(path, caps)| TreeNode {
            path,
            caps: caps.to_string(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
    } else {
        for node in &nodes {
            println!("{:<32} {}", node.path, node.caps);
        }
    }
    Ok(())
}

fn read_batch(file: &Path) -> anyhow::Result<Vec<Request>> {
    let text = if file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("read batch from stdin")?
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("read batch file {}", file.display()))?
    };
    parse_batch(&text)
}

async fn run<B: Backend>(
    mut agent: Agent<B>,
    requests: Vec<Request>,
    group: GroupId,
    json: bool,
) -> anyhow::Result<()> {
    for request in &requests {
        match request.execute(&mut agent, group).await {
            Ok(reply) => reply.print(json)?,
            Err(e) => {
                let dropped = agent.abandon(group);
                if dropped > 0 {
                    tracing::warn!(group, dropped, "dropped staged changes");
                }
                anyhow::bail!("{} (code {})", e, e.code());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let requests = match cli.command {
        Command::Tree => return print_tree(cli.json),
        Command::Batch { ref file } => read_batch(file)?,
        command => command.into_request().into_iter().collect(),
    };

    let mut config = match &cli.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::default(),
    };
    if let Some(kind) = cli.backend {
        config.backend = kind;
    }

    let result = match config.backend {
        BackendKind::Netlink => {
            let agent = Agent::new(config, NetlinkBackend::new()?, SystemHost)?;
            run(agent, requests, cli.group, cli.json).await
        }
        BackendKind::Ioctl => {
            let backend = IoctlBackend::new(config.paths.clone())?;
            let agent = Agent::new(config, backend, SystemHost)?;
            run(agent, requests, cli.group, cli.json).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
