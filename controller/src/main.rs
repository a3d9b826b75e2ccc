//! FleetGuard Binary
//!
//! Evaluates set-node-state requests of a scenario against its cluster snapshot
//! and prints the verdicts.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleetguard_controller::{Action, ControllerConfig, Scenario};

/// FleetGuard safe node state transition checker
#[derive(Parser, Debug)]
#[command(name = "fleetguard")]
#[command(about = "Check whether node wanted state changes are safe")]
struct Args {
    /// Scenario file, or a built-in scenario (decommission, grouped-maintenance)
    scenario: String,

    /// Print verdicts as JSON lines
    #[arg(long)]
    json: bool,

    /// Exit with a non-zero status if any request was disallowed
    #[arg(long)]
    fail_on_disallowed: bool,

    /// Print decision metrics in Prometheus format after the run
    #[arg(long)]
    metrics: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let env_config = ControllerConfig::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| env_config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let mut scenario = Scenario::load(&args.scenario)?;
    scenario.config.apply_env();
    if let Err(e) = scenario.config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    info!(
        scenario = %scenario.name,
        cluster_state = %scenario.cluster_state,
        requests = scenario.requests.len(),
        "Evaluating scenario"
    );

    let (controller, requests) = scenario.into_controller()?;
    let mut disallowed = 0;
    for request in &requests {
        let result = controller.handle_set_node_state(request)?;
        if result.action() == Action::Disallowed {
            disallowed += 1;
        }

        if args.json {
            let line = serde_json::json!({ "request": request, "result": result });
            println!("{}", line);
        } else {
            println!(
                "{} {} -> {}: {}",
                request.node, request.condition, request.new_wanted_state, result
            );
        }
    }

    if args.metrics {
        print!("{}", controller.metrics().to_prometheus());
    }

    if args.fail_on_disallowed && disallowed > 0 {
        return Err(anyhow::anyhow!("{} of {} requests disallowed", disallowed, requests.len()));
    }

    Ok(())
}
