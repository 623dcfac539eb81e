use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use option_priority_deps::{context::RenderContext, sort, EngineConfig, PageFixture, Result};

/// Evaluate a page snapshot: render order and current visibility of its options.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Page fixture (JSON): options, controls, groups and dependent markup
    fixture: PathBuf,
    /// Engine configuration (JSON, optional)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the rendering context detected from the fixture
    #[arg(long, value_enum)]
    context: Option<RenderContext>,
    /// Only print the render order
    #[arg(long)]
    order_only: bool,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Report {
    context: RenderContext,
    order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    visibility: Option<BTreeMap<String, bool>>,
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(args: &Args) -> Result<Report> {
    let config = match args.config.as_ref() {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let fixture = PageFixture::from_path(&args.fixture)?;
    let context = args.context.unwrap_or_else(|| fixture.context(&config));
    tracing::debug!(?context, options = fixture.options.len(), controls = fixture.controls.len(), "fixture loaded");

    let order = sort(fixture.options.clone()).into_iter().map(|o| o.key).collect();
    if args.order_only {
        return Ok(Report { context, order, visibility: None });
    }

    let engine = fixture.engine();
    let mut page = fixture.registry();
    let visibility = engine
        .evaluate_all(context, &mut page)
        .into_iter()
        .map(|d| (d.element, d.visible))
        .collect();
    Ok(Report { context, order, visibility: Some(visibility) })
}

fn main() -> ExitCode {
    // Parse CLI arguments.
    let args = Args::parse();
    init_logging(args.verbose);

    let report = match run(&args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
