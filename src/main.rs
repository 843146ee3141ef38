mod cli;

use voxlink::{
    catalog::{self, CatalogStore},
    config,
    server::{self, auth},
    share::ShareLinkBuilder,
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "voxlink=trace,voxlink_common=debug,tower_http=debug".to_string()
        } else {
            "voxlink=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::CheckCatalog { source, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check_catalog(source, json, cli.config.as_deref()))
        }
        Commands::ShareLink { id, legacy_name } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(share_link(&id, legacy_name, cli.config.as_deref()))
        }
        Commands::HashPassword { password } => hash_password(&password),
        Commands::Version => {
            println!("voxlink {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting Voxlink server");
    server::start_server(config).await
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Public base URL: {}", config.server.public_base_url);
            println!("  Shared secret: {}", config.auth.is_configured());
            println!(
                "  Session timeout: {} min",
                config.auth.session_timeout_mins
            );
            println!(
                "  Catalog source: {}",
                config.catalog.source.as_deref().unwrap_or("(none)")
            );
            println!(
                "  Cache TTL: {}s ok / {}s failed",
                config.cache.positive_ttl_secs, config.cache.negative_ttl_secs
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}

async fn load_catalog(location: &str) -> Result<CatalogStore> {
    let source = catalog::source_for(location);
    let store = CatalogStore::new();
    store.reload(source.as_ref()).await?;
    Ok(store)
}

async fn check_catalog(source: Option<String>, json: bool, config_path: Option<&Path>) -> Result<()> {
    let location = match source {
        Some(location) => location,
        None => config::load_config_or_default(config_path)?
            .catalog
            .source
            .ok_or_else(|| anyhow::anyhow!("No catalog source given or configured"))?,
    };

    if !json {
        println!("Loading catalog: {}", location);
    }
    let store = load_catalog(&location).await?;
    let snapshot = store.snapshot();
    let facets = snapshot.facets();

    if json {
        let report = serde_json::json!({
            "source": location,
            "entries": snapshot.len(),
            "dropped_rows": snapshot.dropped_rows,
            "facets": facets,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("✓ {} entries", snapshot.len());
    println!("  Dropped rows: {}", snapshot.dropped_rows);
    println!("  Voices: {}", facets.voices.join(", "));
    println!("  Styles: {}", facets.styles.join(", "));

    Ok(())
}

async fn share_link(id: &str, legacy_name: bool, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let builder = ShareLinkBuilder::new(config.server.public_base_url.clone());

    let Some(location) = config.catalog.source.as_deref() else {
        // Without a catalog the id is all we know.
        if legacy_name {
            anyhow::bail!("--legacy-name needs a catalog source to look up the name");
        }
        println!("{}", builder.by_id(id));
        return Ok(());
    };

    let store = load_catalog(location).await?;
    let snapshot = store.snapshot();
    let entry = snapshot
        .find_by_id(id)
        .ok_or_else(|| anyhow::anyhow!("No catalog entry with id {}", id))?;

    let links = builder.for_entry(entry);
    if legacy_name {
        println!("{}", links.legacy_url);
    } else {
        println!("{}", links.url);
        println!("{}", links.legacy_url);
    }

    Ok(())
}

fn hash_password(password: &str) -> Result<()> {
    let hash = auth::hash_password(password)?;
    println!("{}", hash);
    Ok(())
}
