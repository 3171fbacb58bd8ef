//! `action-dispatch` command line.
//!
//! Offline tooling for route configuration files: check that a file loads
//! and freezes, list its routes, and show how request paths resolve.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use action_dispatch::config::{load_config, DispatchConfig};
use action_dispatch::observability::init_logging;
use action_dispatch::routing::{RouteRegistry, RouteResolver};

#[derive(Parser)]
#[command(name = "action-dispatch")]
#[command(about = "Inspect and test action dispatch route configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, validate and freeze a configuration file
    Check { config: PathBuf },
    /// List configured routes in resolution order
    Routes { config: PathBuf },
    /// Resolve request paths against a configuration file
    Resolve {
        config: PathBuf,
        #[arg(required = true)]
        paths: Vec<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let (config, registry) = load(&config)?;
            let resolver = RouteResolver::new(Arc::new(registry));
            println!(
                "OK: {} routes ({} wildcard), {} global forwards, {} exception handlers",
                resolver.registry().len(),
                resolver.wildcard_routes().len(),
                resolver.registry().global_forwards().len(),
                config.exception_handlers.len()
            );
        }
        Commands::Routes { config } => {
            let (_, registry) = load(&config)?;
            println!("{:<32} {:<24} {:<8} {:<8} ROLES", "PATH", "HANDLER", "SCOPE", "VALIDATE");
            for route in registry.routes() {
                println!(
                    "{:<32} {:<24} {:<8} {:<8} {}",
                    route.path(),
                    route.handler(),
                    route.scope().to_string(),
                    route.validates(),
                    route.roles().join(",")
                );
            }
        }
        Commands::Resolve { config, paths, json } => {
            let (_, registry) = load(&config)?;
            let resolver = RouteResolver::new(Arc::new(registry));
            let results: Vec<Value> = paths.iter().map(|path| resolve(&resolver, path)).collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for result in &results {
                    print_resolution(result);
                }
            }
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<(DispatchConfig, RouteRegistry), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    init_logging(&config.observability)?;
    let registry = RouteRegistry::from_config(&config)?;
    Ok((config, registry))
}

fn resolve(resolver: &RouteResolver, path: &str) -> Value {
    match resolver.resolve(path) {
        Ok(resolution) => {
            let captures: Vec<&str> = resolution
                .captures
                .as_ref()
                .map(|captures| captures.iter().map(|(_, value)| value).collect())
                .unwrap_or_default();
            json!({
                "path": path,
                "route": resolution.route.path(),
                "handler": resolution.route.handler(),
                "wildcard": resolution.is_wildcard(),
                "captures": captures,
            })
        }
        Err(err) => json!({
            "path": path,
            "error": err.to_string(),
        }),
    }
}

fn print_resolution(result: &Value) {
    let path = result["path"].as_str().unwrap_or_default();
    match result["route"].as_str() {
        Some(route) => {
            println!("{} -> {} ({})", path, route, result["handler"].as_str().unwrap_or_default());
            if let Some(captures) = result["captures"].as_array() {
                for (index, value) in captures.iter().enumerate() {
                    println!("    {{{}}} = {}", index, value.as_str().unwrap_or_default());
                }
            }
        }
        None => eprintln!("{} -> {}", path, result["error"].as_str().unwrap_or_default()),
    }
}
