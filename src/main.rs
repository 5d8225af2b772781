use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ride_dispatch::config::{Config, LogFormat, ReportFormat};
use ride_dispatch::engine::passenger::TripSource;
use ride_dispatch::error::AppError;
use ride_dispatch::models::message::ActorId;
use ride_dispatch::models::position::Position;
use ride_dispatch::simulation::{Simulation, SimulationOutcome, SimulationSettings};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;
    init_tracing(&config);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut simulation = Simulation::new(SimulationSettings::from_config(&config));

    for n in 1..=config.vehicle_count {
        let position = Position::random(&mut rng, config.grid_max);
        simulation.register_vehicle(ActorId::new(format!("taxi{n}")), position)?;
    }
    for n in 1..=config.passenger_count {
        let trip = TripSource::random(Some(rng.r#gen()), config.grid_max);
        simulation.register_passenger(ActorId::new(format!("passenger{n}")), trip)?;
    }

    info!(
        vehicles = config.vehicle_count,
        passengers = config.passenger_count,
        "simulation starting"
    );

    let metrics = simulation.metrics().clone();
    let outcome = tokio::select! {
        outcome = simulation.run() => outcome?,
        _ = shutdown_signal() => {
            info!("interrupted");
            return Ok(());
        }
    };

    print_reports(&outcome, config.report_format)?;

    match metrics.encode() {
        Ok(text) => debug!(metrics = %text, "final metrics"),
        Err(err) => debug!(error = %err, "metrics unavailable"),
    }

    info!("all actors stopped");
    Ok(())
}

fn init_tracing(config: &Config) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);

    match config.log_format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn print_reports(outcome: &SimulationOutcome, format: ReportFormat) -> Result<(), AppError> {
    match format {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&outcome.reports)
                .map_err(|err| AppError::Internal(format!("failed to encode reports: {err}")))?;
            println!("{json}");
        }
        ReportFormat::Text => {
            for report in &outcome.reports {
                let vehicle = report
                    .chosen_vehicle()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "none".to_string());
                let eta = report
                    .chosen_eta()
                    .map(|eta| format!("{eta} min"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}: pickup {} -> destination {} | retries {} | vehicle {} | eta {}",
                    report.passenger,
                    report.pickup,
                    report.destination,
                    report.retry_count,
                    vehicle,
                    eta
                );
            }
            for vehicle in &outcome.vehicles {
                println!(
                    "{}: final position {} | rides {}",
                    vehicle.id, vehicle.position, vehicle.rides_completed
                );
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
