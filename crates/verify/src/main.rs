//! Verification runner entry point
//!
//! Runs the built-in dashboard scenarios (or YAML scenarios from a directory)
//! against an already running application.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dashboard_verify::catalog;
use dashboard_verify::playwright::{Browser, PlaywrightDriver};
use dashboard_verify::runner::write_results;
use dashboard_verify::target::wait_until_ready;
use dashboard_verify::{
    EvidenceStore, HarnessConfig, PageSession, Scenario, ScenarioRunner, VerifyResult,
};

#[derive(Parser, Debug)]
#[command(name = "dashboard-verify")]
#[command(about = "UI verification runner for role-specific dashboards")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "VERIFY_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the running application
    #[arg(long, env = "VERIFY_BASE_URL")]
    base_url: Option<String>,

    /// Directory of YAML scenarios to run instead of the built-in set
    #[arg(short, long)]
    scenarios: Option<PathBuf>,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Extra attempts for a failed scenario
    #[arg(long, env = "VERIFY_RETRIES")]
    retries: Option<u32>,

    /// Root directory for screenshots
    #[arg(long)]
    evidence_dir: Option<PathBuf>,

    /// Output directory for the run report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not wait for the application to answer HTTP first
    #[arg(long)]
    skip_readiness: bool,

    /// List the selected scenarios and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

fn load_config(args: &Args) -> VerifyResult<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(browser) = args.browser {
        config.browser = browser;
    }
    if args.headed {
        config.headless = false;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if let Some(dir) = &args.evidence_dir {
        config.evidence_dir = dir.clone();
    }
    if let Some(dir) = &args.output {
        config.output_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

fn select_scenarios(args: &Args) -> VerifyResult<Vec<Scenario>> {
    let mut scenarios = match &args.scenarios {
        Some(dir) => Scenario::load_all(dir)?,
        None => catalog::all()?,
    };

    if let Some(tag) = &args.tag {
        scenarios = Scenario::filter_by_tag(&scenarios, tag)
            .into_iter()
            .cloned()
            .collect();
    }
    if let Some(name) = &args.name {
        scenarios.retain(|s| &s.name == name);
    }

    Ok(scenarios)
}

async fn async_main(args: Args) -> VerifyResult<bool> {
    let config = load_config(&args)?;
    let scenarios = select_scenarios(&args)?;

    if args.list {
        for scenario in &scenarios {
            println!("{:<32} {}", scenario.name, scenario.description);
        }
        return Ok(true);
    }

    if scenarios.is_empty() {
        error!("No scenarios selected");
        return Ok(false);
    }

    if !args.skip_readiness {
        wait_until_ready(
            &config.base_url,
            Duration::from_millis(config.readiness_timeout_ms),
            Duration::from_millis(250),
        )
        .await?;
    }

    let driver = PlaywrightDriver::launch(&config.playwright()).await?;
    let mut session = PageSession::new(Box::new(driver), config.base_url.clone());

    let report = {
        let mut runner = ScenarioRunner::new(
            &mut session,
            EvidenceStore::new(&config.evidence_dir),
            config.runner(),
        );
        runner.run_all(&scenarios).await
    };

    if let Err(e) = session.close().await {
        error!("Failed to close browser session: {}", e);
    }

    write_results(&report, &config.output_dir)?;

    if report.success() {
        info!("All scenarios passed!");
    } else {
        for scenario in &report.scenarios {
            if let Some(failure) = scenario.failure_summary() {
                error!("{}: {}", scenario.name, failure);
            }
        }
    }

    Ok(report.success())
}
