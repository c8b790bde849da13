//! doc-corpus-mcp: MCP server exposing a documentation corpus as tools
//!
//! Serves typo-tolerant search, browsing, glossary linking and a guided
//! advisor over stdio, or over HTTP with per-client rate limiting.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use doc_corpus_mcp::config::{self, Config};
use doc_corpus_mcp::corpus::Corpus;
use doc_corpus_mcp::error::ServerError;
use doc_corpus_mcp::mcp::http::{self, HttpState};
use doc_corpus_mcp::mcp::server::{Dispatcher, McpServer};
use doc_corpus_mcp::tools::{default_registry, ToolContext};

/// MCP server exposing a documentation corpus as tools.
///
/// Provides search, browsing, glossary and advisor tools that let AI
/// assistants answer questions from a set of documentation pages.
#[derive(Parser, Debug)]
#[command(name = "doc-corpus-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Markdown directory or JSON file to serve (overrides `corpus_path`)
    #[arg(long, value_name = "PATH")]
    corpus: Option<PathBuf>,

    /// Serve HTTP on this address instead of stdio (overrides `http.bind`)
    #[arg(long, value_name = "ADDR")]
    http: Option<SocketAddr>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the corpus named on the command line or in the config.
///
/// Serving an empty corpus is allowed so clients can still connect.
fn load_corpus(args: &Args, cfg: &Config) -> Result<Corpus, ServerError> {
    let Some(path) = args.corpus.as_ref().or(cfg.corpus_path.as_ref()) else {
        warn!("No corpus path configured, serving an empty corpus");
        return Ok(Corpus::empty());
    };

    let corpus = Corpus::load(path)?;
    info!(
        path = %path.display(),
        documents = corpus.documents().len(),
        glossary = corpus.glossary().len(),
        "Corpus loaded"
    );
    Ok(corpus)
}

async fn serve(args: Args, cfg: Config) -> Result<(), ServerError> {
    let corpus = load_corpus(&args, &cfg)?;
    let dispatcher = Dispatcher::new(
        default_registry(),
        ToolContext::new(corpus, cfg.context_options()),
    );

    let refresh = cfg.corpus_refresh();
    if let Some(period) = refresh {
        info!(every_secs = period.as_secs(), "Corpus refresh enabled");
    }

    match args.http.or(cfg.http.bind) {
        Some(addr) => {
            let state = HttpState::new(dispatcher, cfg.rate_limiter());
            http::serve(addr, state, refresh).await
        }
        None => {
            info!("MCP server ready, waiting for client connection...");
            let mut server = McpServer::new(dispatcher).with_refresh(refresh);
            server.run().await?;
            Ok(())
        }
    }
}

/// Entry point for the doc-corpus-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig read from: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "doc-corpus-mcp {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting doc-corpus-mcp server"
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(args, cfg)) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(get_log_level(3, true, "trace"), Level::ERROR);
    }

    #[test]
    fn config_level_applies_without_flags() {
        assert_eq!(get_log_level(0, false, "DEBUG"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
    }

    #[test]
    fn cli_corpus_overrides_config() {
        let args = Args::parse_from(["doc-corpus-mcp", "--corpus", "/definitely/missing"]);
        let cfg = Config::default();
        assert!(matches!(
            load_corpus(&args, &cfg),
            Err(ServerError::Corpus(_))
        ));
    }

    #[test]
    fn no_corpus_serves_empty() {
        let args = Args::parse_from(["doc-corpus-mcp"]);
        let corpus = load_corpus(&args, &Config::default()).unwrap();
        assert!(corpus.documents().is_empty());
    }

    #[test]
    fn http_flag_parses_socket_addr() {
        let args = Args::parse_from(["doc-corpus-mcp", "--http", "127.0.0.1:9000"]);
        assert_eq!(args.http, Some("127.0.0.1:9000".parse().unwrap()));
    }
}
