//! `discovery`: inspect and exercise virtual address resolution.
//!
//! ```text
//! discovery resolve config:///addresses:backend/api/product/1
//!     → prints the rewritten URI and Host header (nothing is sent)
//! discovery fetch config:///addresses:backend/api/product/1
//!     → sends the rewritten request and prints status and body
//! discovery watch config:///addresses:backend
//!     → prints every result the resolver publishes, following config reloads
//! ```

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tower::{Layer, ServiceExt};
use url::Url;

use discovery_proxy::config::{self, ConfigSource, ConfigWatcher, DiscoveryConfig};
use discovery_proxy::interceptor::{DiscoveryLayer, VirtualRequest, VirtualTarget};
use discovery_proxy::observability::logging;
use discovery_proxy::resolver::ResolutionResult;
use discovery_proxy::resolvers;

#[derive(Parser)]
#[command(name = "discovery")]
#[command(about = "Resolve virtual service addresses and rewrite requests", long_about = None)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, default_value = "discovery.toml")]
    config: PathBuf,

    /// Overrides observability.log_level.
    #[arg(long)]
    log_level: Option<String>,

    /// Print machine-readable JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where a virtual URI would be sent, without sending it
    Resolve { target: String },
    /// Send a request to a virtual URI
    Fetch {
        target: String,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// Request body
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Follow a resolver's results until Ctrl+C
    Watch { target: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(&cli.config)?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    logging::init_logging(&level);

    let defaults = config.resolution.to_defaults();
    let source = ConfigSource::new(config);
    let registry = resolvers::default_registry(source.clone());
    tracing::debug!(schemes = ?registry.schemes(), "Resolvers registered");

    match cli.command {
        Commands::Resolve { target } => {
            let transport = tower::service_fn(|req: http::Request<String>| async move {
                Ok::<_, Infallible>(req)
            });
            let service = DiscoveryLayer::with_defaults(registry, defaults).layer(transport);

            let request = VirtualRequest::parse(http::Method::GET, &target, String::new())?;
            let rewritten = service.oneshot(request).await?;
            let host = rewritten
                .headers()
                .get(http::header::HOST)
                .and_then(|v| v.to_str().ok());

            if cli.json {
                let out = json!({ "target": target, "uri": rewritten.uri().to_string(), "host": host });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{} -> {}", target, rewritten.uri());
                if let Some(host) = host {
                    println!("Host: {}", host);
                }
            }
        }
        Commands::Fetch { target, method, data } => {
            let client = reqwest::Client::new();
            let transport = tower::service_fn(move |req: http::Request<String>| {
                let client = client.clone();
                async move {
                    let req = reqwest::Request::try_from(req)?;
                    client.execute(req).await
                }
            });
            let service = DiscoveryLayer::with_defaults(registry, defaults).layer(transport);

            let method = http::Method::from_bytes(method.to_uppercase().as_bytes())?;
            let request = VirtualRequest::parse(method, &target, data.unwrap_or_default())?;
            let res = service.oneshot(request).await?;
            print_response(res, cli.json).await?;
        }
        Commands::Watch { target } => {
            let url = Url::parse(&target)?;
            let parsed = VirtualTarget::parse(&url)?;
            let address = Url::parse(&format!("{}:///{}", parsed.scheme, parsed.config_path))?;
            let options = defaults.options_for(address)?;

            let resolver = registry
                .create_resolver(&parsed.scheme, options)
                .ok_or_else(|| format!("no resolver registered for scheme '{}'", parsed.scheme))?;

            // Keep the watcher alive for the whole loop; dropping it stops notifications.
            let _watcher = if cli.config.exists() {
                let (watcher, updates) = ConfigWatcher::new(&cli.config);
                tokio::spawn(config::watcher::apply_updates(source.clone(), updates));
                Some(watcher.run()?)
            } else {
                None
            };

            let json_output = cli.json;
            resolver.start(Arc::new(move |result: ResolutionResult| {
                print_result(&result, json_output)
            }));

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn load_or_default(path: &Path) -> Result<DiscoveryConfig, config::ConfigError> {
    if path.exists() {
        config::load_config(path)
    } else {
        eprintln!("Config file {} not found, using defaults", path.display());
        Ok(DiscoveryConfig::default())
    }
}

fn print_result(result: &ResolutionResult, json_output: bool) {
    match result {
        ResolutionResult::Success(addresses) => {
            if json_output {
                let list: Vec<_> = addresses
                    .iter()
                    .map(|a| json!({ "endpoint": a.endpoint.to_string(), "host_override": a.host_override() }))
                    .collect();
                println!("{}", json!({ "success": list }));
            } else {
                for a in addresses {
                    match a.host_override() {
                        Some(host) => println!("{} (Host: {})", a.endpoint, host),
                        None => println!("{}", a.endpoint),
                    }
                }
            }
        }
        ResolutionResult::Failure(status) => {
            if json_output {
                println!("{}", json!({ "failure": { "code": status.code.to_string(), "message": status.message } }));
            } else {
                eprintln!("Error ({}): {}", status.code, status.message);
            }
        }
    }
}

async fn print_response(res: reqwest::Response, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let url = res.url().to_string();
    let text = res.text().await?;

    if json_output {
        let out = json!({ "url": url, "status": status.as_u16(), "body": text });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        if !status.is_success() {
            eprintln!("Error: {} returned status {}", url, status);
        } else {
            println!("{} {}", status, url);
        }
        println!("{}", text);
    }
    Ok(())
}
