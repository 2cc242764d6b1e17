use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use http::Method;
use tracing::info;

use crate::app::{forum_handlers, forum_routes};
use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::error::ErrorRenderer;
use crate::manifest::load_manifest;
use crate::middleware::MiddlewareRegistry;
use crate::router::{RouteOutcome, RouteTable, Router};
use crate::server::{AppService, HttpServer};
use crate::session::MemorySessionStore;

/// Command-line interface for the forum router
#[derive(Parser)]
#[command(name = "forumrouter")]
#[command(about = "Forum request router", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the route table over HTTP with echo handlers
    Serve {
        /// YAML configuration file
        #[arg(short, long, env = "FORUM_CONFIG")]
        config: Option<PathBuf>,

        /// Route manifest; the built-in forum routes when omitted
        #[arg(short, long)]
        routes: Option<PathBuf>,

        /// Address to bind, overriding the configuration
        #[arg(long)]
        addr: Option<String>,
    },
    /// Print the route table
    Routes {
        #[arg(short, long)]
        routes: Option<PathBuf>,
    },
    /// Show which route a request would reach
    Match {
        #[arg(short, long, default_value = "GET")]
        method: String,

        #[arg(short, long)]
        path: String,

        #[arg(short, long)]
        routes: Option<PathBuf>,
    },
}

/// Route table from a manifest, or the built-in forum routes.
///
/// # Errors
///
/// When the manifest cannot be loaded or a declaration is malformed.
pub fn load_table(routes: Option<&Path>) -> Result<RouteTable> {
    match routes {
        Some(path) => load_manifest(path)
            .with_context(|| format!("loading route manifest {}", path.display())),
        None => forum_routes().context("building the forum route table"),
    }
}

/// One-line description of how `method path` is routed.
///
/// # Errors
///
/// When `method` is not an HTTP method.
pub fn describe_match(router: &Router, method: &str, path: &str) -> Result<String> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{method}'"))?;
    if method == Method::OPTIONS {
        return Ok(format!("{method} {path} -> 200 preflight (routing skipped)"));
    }
    let line = match router.route(&method, path) {
        RouteOutcome::Matched(m) => {
            let params = m
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "{method} {path} -> {} [{}] params={{{params}}} middleware=[{}]",
                m.route.handler,
                m.route.pattern,
                m.route.middleware.join(", ")
            )
        }
        RouteOutcome::MethodNotAllowed { allowed } => {
            let allowed = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{method} {path} -> 405 method not allowed (allow: {allowed})")
        }
        RouteOutcome::NotFound => format!("{method} {path} -> 404 not found"),
    };
    Ok(line)
}

fn serve(config: Option<&Path>, routes: Option<&Path>, addr: Option<&str>) -> Result<()> {
    let mut config = AppConfig::load(config)?;
    if let Some(addr) = addr {
        config.server.addr = addr.to_string();
    }

    let table = load_table(routes)?;
    let handlers = forum_handlers(&table, &config)?;
    let middleware = MiddlewareRegistry::standard(&config)?;
    let dispatcher = Dispatcher::build(table, &handlers, &middleware)
        .context("resolving routes against handlers and middleware")?;

    may::config().set_stack_size(config.server.stack_size);
    let service = AppService::new(
        Arc::new(dispatcher),
        Arc::new(MemorySessionStore::with_idle_timeout(Duration::from_secs(
            config.session.idle_timeout_secs,
        ))),
        config.session.clone(),
        ErrorRenderer::new(config.server.debug),
    );

    info!(addr = %config.server.addr, debug = config.server.debug, "Starting forum router");
    let handle = HttpServer(service)
        .start(config.server.addr.as_str())
        .with_context(|| format!("binding {}", config.server.addr))?;
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))?;
    Ok(())
}

pub fn run_cli(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Serve {
            config,
            routes,
            addr,
        } => serve(config.as_deref(), routes.as_deref(), addr.as_deref()),
        Commands::Routes { routes } => {
            let router = Router::new(load_table(routes.as_deref())?);
            router.dump_routes();
            Ok(())
        }
        Commands::Match {
            method,
            path,
            routes,
        } => {
            let router = Router::new(load_table(routes.as_deref())?);
            println!("{}", describe_match(&router, method, path)?);
            Ok(())
        }
    }
}
