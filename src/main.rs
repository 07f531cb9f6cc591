//! wasm-executor CLI entry point.
//!
//! `serve` runs the HTTP server; `functions` and `invoke` load a single
//! module in-process and work on it directly.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wasm_executor_common::{ConfigFile, InstanceId, LoaderConfig, RuntimeConfig};
use wasm_executor_host::{HostApi, Permissions};
use wasm_executor_server::{AppState, ExecutorServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "wasm-executor", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// TOML configuration file.
        #[arg(short, long, env = "WASM_EXECUTOR_CONFIG")]
        config: Option<PathBuf>,

        /// Override the bind address from the configuration.
        #[arg(short, long, env = "BIND_ADDR")]
        bind: Option<SocketAddr>,
    },

    /// List the callable functions of a module.
    Functions {
        /// Module file (.wasm or .wat).
        path: String,
    },

    /// Load a module and call one of its functions.
    Invoke {
        /// Module file (.wasm or .wat).
        path: String,

        /// Exported function name.
        function: String,

        /// Integer arguments.
        #[arg(allow_negative_numbers = true)]
        args: Vec<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wasm_executor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Serve { config, bind } => serve(config, bind).await,
        Command::Functions { path } => functions(&path),
        Command::Invoke {
            path,
            function,
            args,
        } => invoke(&path, &function, &args),
    }
}

async fn serve(config: Option<PathBuf>, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let file = match config {
        Some(path) => ConfigFile::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConfigFile::default(),
    };

    let mut server_config =
        ServerConfig::from_file(&file.server).context("Invalid [server] configuration")?;
    if let Some(addr) = bind {
        server_config = server_config.with_bind_addr(addr);
    }

    let state = AppState::new(&file.runtime, &file.loader, &file.admin)
        .context("Failed to initialize registry")?;

    let preloaded = state
        .preload(&file.modules)
        .context("Failed to register startup modules")?;

    info!(
        bind_addr = %server_config.bind_addr,
        preloaded = preloaded.len(),
        admin_protected = state.admin_token().is_some(),
        "Configuration loaded"
    );

    ExecutorServer::new(state, server_config).run().await?;

    Ok(())
}

fn local_api(path: &str) -> anyhow::Result<(HostApi, InstanceId)> {
    let api = HostApi::from_config(&RuntimeConfig::default(), &LoaderConfig::default())
        .context("Failed to initialize registry")?;
    let outcome = api
        .create_instance(&Permissions::all(), path)
        .with_context(|| format!("Failed to load {path}"))?;

    Ok((api, outcome.id))
}

fn functions(path: &str) -> anyhow::Result<()> {
    let (api, id) = local_api(path)?;
    let rows = api.list_exported_functions(id)?;

    for row in rows {
        println!("{}({}) -> {}", row.name, row.parameter_kinds, row.return_kind);
    }

    Ok(())
}

fn invoke(path: &str, function: &str, args: &[i64]) -> anyhow::Result<()> {
    let (api, id) = local_api(path)?;
    let result = api
        .invoke(&id.to_string(), function, args)
        .with_context(|| format!("Failed to invoke {function}"))?;

    println!("{result}");

    Ok(())
}
