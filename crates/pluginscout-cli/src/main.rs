//! pluginscout - find plugin bundles on a CDN
//!
//! - `find` probes base URLs for plugin manifests and prints the bundles
//! - `lookup`, `catalog` and `managed` work against the `plugins.json` catalog
//! - `flag` evaluates a feature flag with the configured provider
//! - `serve` runs the HTTP API

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use pluginscout_core::flags::FlagService;
use pluginscout_core::registry::{ManagedPlugins, RegistryManagedPlugins};
use pluginscout_core::{
    CatalogService, CdnFinder, CdnSource, CdnUrls, Config, FoundBundle, FoundPlugin,
    PluginRegistry,
};

mod serve;

/// pluginscout - plugin discovery on a CDN
#[derive(Parser)]
#[command(name = "pluginscout", version)]
#[command(about = "Discover, bundle, and look up remotely hosted plugins", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.pluginscout/config.toml or $PLUGINSCOUT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe base URLs for plugin manifests and print the resulting bundles
    Find {
        /// Plugin base URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Fetch one manifest at a time
        #[arg(long, conflicts_with = "concurrent")]
        sequential: bool,

        /// Fetch manifests concurrently regardless of `cdn_sync_loader`
        #[arg(long)]
        concurrent: bool,
    },

    /// Look up catalog plugins on the CDN
    Lookup {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// List catalog plugins with their latest version
    Catalog,

    /// List managed plugin ids
    Managed,

    /// Evaluate a boolean feature flag
    Flag { key: String },

    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path).await,
        None => Config::load_default().await,
    }
    .context("Failed to load configuration")?;

    match cli.command {
        Commands::Find {
            urls,
            sequential,
            concurrent,
        } => {
            let finder = find_finder(&config, sequential, concurrent)?;
            find(&finder, urls, cli.json).await
        }
        Commands::Lookup { ids } => lookup(&config, &ids, cli.json).await,
        Commands::Catalog => catalog(&config, cli.json).await,
        Commands::Managed => managed(&config, cli.json).await,
        Commands::Flag { key } => flag(&config, &key, cli.json).await,
        Commands::Serve { port } => serve::run(port, config).await,
    }
}

fn build_finder(config: &Config) -> Result<CdnFinder> {
    let finder = CdnFinder::new(
        config.finder_settings(),
        CdnUrls::new(config.cdn.url_template.clone()),
    )
    .context("Failed to build HTTP client")?;
    Ok(finder)
}

async fn load_catalog(config: &Config) -> Result<CatalogService> {
    let finder = build_finder(config)?;
    CatalogService::load(&config.catalog.path, finder)
        .await
        .with_context(|| format!("Failed to load catalog {}", config.catalog.path.display()))
}

/// Token cancelled on ctrl+c
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding requests");
            token.cancel();
        }
    });
    cancel
}

/// Finder for `find`: the flags override `[features] cdn_sync_loader`
fn find_finder(config: &Config, sequential: bool, concurrent: bool) -> Result<CdnFinder> {
    let finder = build_finder(config)?;
    let mode = if concurrent {
        true
    } else if sequential {
        false
    } else {
        finder.settings().concurrent
    };
    Ok(finder.with_concurrency(mode))
}

async fn find(finder: &CdnFinder, urls: Vec<String>, json: bool) -> Result<()> {
    let source = CdnSource::new(urls);
    let bundles = finder.find(&source, &interrupt_token()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&bundles)?);
    } else {
        print_bundles(&bundles);
    }
    Ok(())
}

async fn lookup(config: &Config, ids: &[String], json: bool) -> Result<()> {
    let catalog = load_catalog(config).await?;
    let cancel = interrupt_token();

    let results = join_all(ids.iter().map(|id| catalog.find_plugin(id, &cancel))).await;

    let mut failed = 0;
    let mut found = Vec::new();
    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(plugin) => found.push(plugin),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", id, e);
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else {
        for plugin in &found {
            print_plugin(plugin, "");
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} lookups failed", failed, ids.len());
    }
    Ok(())
}

async fn catalog(config: &Config, json: bool) -> Result<()> {
    let catalog = load_catalog(config).await?;
    let plugins = catalog.available_plugins().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plugins)?);
    } else {
        for plugin in plugins {
            println!("{:<40} {:<12} {}", plugin.id, plugin.version, plugin.url);
        }
    }
    Ok(())
}

async fn managed(config: &Config, json: bool) -> Result<()> {
    let catalog = load_catalog(config).await?;
    let managed = RegistryManagedPlugins::new(std::sync::Arc::new(catalog));
    let ids = managed.managed_plugins().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&ids)?);
    } else {
        for id in ids {
            println!("{}", id);
        }
    }
    Ok(())
}

async fn flag(config: &Config, key: &str, json: bool) -> Result<()> {
    let client = reqwest_client(config)?;
    let flags = FlagService::from_config(&config.openfeature, &config.feature_toggles, client)?;
    let eval = flags.eval_flag(key).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&eval)?);
    } else {
        println!(
            "{} = {} ({}, {})",
            eval.key,
            eval.value,
            eval.variant.as_deref().unwrap_or("-"),
            eval.reason
        );
    }
    Ok(())
}

fn reqwest_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.finder_settings().request_timeout)
        .build()
        .context("Failed to build HTTP client")
}

fn print_bundles(bundles: &[FoundBundle]) {
    if bundles.is_empty() {
        println!("No plugins found");
        return;
    }
    for bundle in bundles {
        print_plugin(&bundle.primary, "");
        for child in &bundle.children {
            print_plugin(child, "  └ ");
        }
    }
}

fn print_plugin(plugin: &FoundPlugin, prefix: &str) {
    println!(
        "{}{} {} ({}) {}",
        prefix,
        plugin.manifest.id,
        plugin.manifest.version(),
        plugin.manifest.plugin_type,
        plugin.fs.base()
    );
}
