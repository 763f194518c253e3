//! Sift demo binary.
//!
//! Runs the search lifecycle manager against a simulated provider with a
//! line-oriented terminal front end. Lifecycle telemetry is printed as JSON
//! lines on stdout; diagnostics go to stderr.

mod config;
mod json_lines;
mod provider;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use sift_search::{SearchService, Telemetry, TelemetrySink, TracingSink};
use tokio::io::Stdout;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::DemoConfig;
use crate::provider::SimulatedProvider;

/// Demo command line arguments. Flags override config file values.
#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(about = "Search request lifecycle demo against a simulated provider")]
struct Args {
	/// Config file path
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Minimum simulated latency in milliseconds
	#[arg(long, value_name = "MS")]
	min_delay_ms: Option<u64>,

	/// Maximum simulated latency in milliseconds
	#[arg(long, value_name = "MS")]
	max_delay_ms: Option<u64>,

	/// Queries containing this keyword fail
	#[arg(long, value_name = "TEXT")]
	fail_keyword: Option<String>,

	/// Cancel the previous request when a new search starts
	#[arg(long)]
	cancel_superseded: bool,

	/// Disable JSON telemetry lines on stdout
	#[arg(long)]
	no_json: bool,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

impl Args {
	fn apply(&self, config: &mut DemoConfig) {
		if let Some(ms) = self.min_delay_ms {
			config.provider.min_delay_ms = ms;
		}
		if let Some(ms) = self.max_delay_ms {
			config.provider.max_delay_ms = ms;
		}
		if let Some(keyword) = &self.fail_keyword {
			config.provider.fail_keyword.clone_from(keyword);
		}
		if self.cancel_superseded {
			config.service.cancel_superseded = true;
		}
		if self.no_json {
			config.telemetry.json = false;
		}
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let mut config = DemoConfig::load(args.config.as_deref()).context("failed to load configuration")?;
	args.apply(&mut config);
	config.validate()?;
	info!(?config, "starting sift demo");

	let (service, writer) = build_service(&config);
	let stdin = tokio::io::BufReader::new(tokio::io::stdin());
	let result = repl::run(service, stdin, &mut std::io::stdout()).await;

	// The service owned the last sink clone, so the writer drains and exits.
	if let Some(writer) = writer
		&& tokio::time::timeout(Duration::from_secs(1), writer).await.is_err()
	{
		tracing::warn!("telemetry writer did not finish draining");
	}
	result
}

fn build_service(config: &DemoConfig) -> (SearchService, Option<JoinHandle<Stdout>>) {
	let mut sinks: Vec<Arc<dyn TelemetrySink>> = Vec::new();
	let mut writer = None;
	if config.telemetry.json {
		let (sink, task) = json_lines::spawn(tokio::io::stdout());
		sinks.push(Arc::new(sink));
		writer = Some(task);
	}
	if config.telemetry.tracing {
		sinks.push(Arc::new(TracingSink));
	}

	let service = SearchService::with_config(
		Arc::new(SimulatedProvider::new(&config.provider)),
		Telemetry::new(sinks),
		config.service.to_service_config(),
	);
	(service, writer)
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("SIFT_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| EnvFilter::new(if verbose { "sift=debug" } else { "sift=info" }));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();
}
