//! `pluginscout serve`: run the HTTP API until interrupted

use anyhow::Result;

use pluginscout_core::Config;

/// Run the serve command.
pub async fn run(port: u16, config: Config) -> Result<()> {
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    print_banner(port, &config);

    let server = pluginscout_server::start_server(pluginscout_server::ServerConfig { port, config });

    tokio::select! {
        result = server => result?,
        _ = shutdown_signal => println!("\n  Shutting down..."),
    }

    Ok(())
}

fn print_banner(port: u16, config: &Config) {
    println!();
    println!("  \x1b[1;36mpluginscout\x1b[0m server starting");
    println!("  ─────────────────────────────────────");
    println!("  Local:    http://localhost:{}", port);
    println!("  Catalog:  {}", config.catalog.path.display());
    println!("  Flags:    {}", config.openfeature.provider.as_str());
    println!();
}
