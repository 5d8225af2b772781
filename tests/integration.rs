use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::broadcast;

use ride_dispatch::engine::passenger::TripSource;
use ride_dispatch::error::AppError;
use ride_dispatch::models::message::{ActorId, Envelope, Performative};
use ride_dispatch::models::position::Position;
use ride_dispatch::models::ride::RideOutcome;
use ride_dispatch::simulation::{Simulation, SimulationOutcome, SimulationSettings};

const RUN_LIMIT: Duration = Duration::from_secs(60 * 60);

fn drain(tap: &mut broadcast::Receiver<Envelope>) -> Vec<Envelope> {
    let mut seen = Vec::new();
    while let Ok(envelope) = tap.try_recv() {
        seen.push(envelope);
    }
    seen
}

fn recipients(envelopes: &[Envelope], performative: Performative) -> BTreeSet<ActorId> {
    envelopes
        .iter()
        .filter(|envelope| envelope.performative() == performative)
        .map(|envelope| envelope.recipient.clone())
        .collect()
}

async fn run(simulation: Simulation) -> SimulationOutcome {
    tokio::time::timeout(RUN_LIMIT, simulation.run())
        .await
        .expect("simulation finished in time")
        .expect("simulation succeeded")
}

#[tokio::test(start_paused = true)]
async fn closest_vehicle_wins_and_others_are_rejected() {
    let mut simulation = Simulation::new(SimulationSettings::default());
    simulation
        .register_vehicle(ActorId::from("taxi1"), Position::new(10, 10))
        .unwrap();
    simulation
        .register_vehicle(ActorId::from("taxi2"), Position::new(50, 50))
        .unwrap();
    simulation
        .register_vehicle(ActorId::from("taxi3"), Position::new(0, 0))
        .unwrap();
    simulation
        .register_passenger(
            ActorId::from("passenger1"),
            TripSource::fixed(Position::new(0, 5), Position::new(5, 5)),
        )
        .unwrap();

    let mut tap = simulation.bus().subscribe();
    let outcome = run(simulation).await;
    let envelopes = drain(&mut tap);

    assert_eq!(outcome.reports.len(), 1);
    let report = &outcome.reports[0];
    assert_eq!(report.retry_count, 0);
    // 5 units at 55 units/hour.
    assert_eq!(
        report.outcome,
        RideOutcome::Completed {
            vehicle: ActorId::from("taxi3"),
            eta: 5
        }
    );

    assert_eq!(
        recipients(&envelopes, Performative::Accept),
        BTreeSet::from([ActorId::from("taxi3")])
    );
    assert_eq!(
        recipients(&envelopes, Performative::Reject),
        BTreeSet::from([ActorId::from("taxi1"), ActorId::from("taxi2")])
    );
    assert_eq!(
        recipients(&envelopes, Performative::Inform),
        BTreeSet::from([ActorId::from("passenger1")])
    );

    let taxi3 = outcome
        .vehicles
        .iter()
        .find(|summary| summary.id == ActorId::from("taxi3"))
        .unwrap();
    assert_eq!(taxi3.position, Position::new(5, 5));
    assert_eq!(taxi3.rides_completed, 1);
    assert!(outcome
        .vehicles
        .iter()
        .filter(|summary| summary.id != ActorId::from("taxi3"))
        .all(|summary| summary.rides_completed == 0));
}

#[tokio::test(start_paused = true)]
async fn no_vehicles_means_failure_report() {
    let mut simulation = Simulation::new(SimulationSettings::default());
    simulation
        .register_passenger(ActorId::from("passenger1"), TripSource::random(Some(9), 100))
        .unwrap();

    let mut tap = simulation.bus().subscribe();
    let outcome = run(simulation).await;

    assert_eq!(outcome.reports.len(), 1);
    let report = &outcome.reports[0];
    assert_eq!(report.retry_count, 4);
    assert_eq!(report.outcome, RideOutcome::NoVehicleAvailable);
    assert!(report.chosen_vehicle().is_none());
    assert!((0..=100).contains(&report.pickup.x));
    assert!(drain(&mut tap).is_empty());
    assert!(outcome.vehicles.is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_passengers_each_get_at_most_one_ride() {
    let mut simulation = Simulation::new(SimulationSettings::default());
    for (n, position) in [(1, (20, 80)), (2, (60, 10)), (3, (95, 95))] {
        simulation
            .register_vehicle(ActorId::new(format!("taxi{n}")), position.into())
            .unwrap();
    }
    for n in 1..=3u64 {
        simulation
            .register_passenger(
                ActorId::new(format!("passenger{n}")),
                TripSource::random(Some(n), 100),
            )
            .unwrap();
    }

    let mut tap = simulation.bus().subscribe();
    let metrics = simulation.metrics().clone();
    let outcome = run(simulation).await;
    let envelopes = drain(&mut tap);

    assert_eq!(outcome.reports.len(), 3);
    let completed: Vec<_> = outcome
        .reports
        .iter()
        .filter(|report| report.chosen_vehicle().is_some())
        .collect();

    for report in &outcome.reports {
        if report.chosen_vehicle().is_none() {
            assert_eq!(report.retry_count, 4);
        }
        let accepts_for_passenger = envelopes
            .iter()
            .filter(|envelope| {
                envelope.sender == report.passenger
                    && envelope.performative() == Performative::Accept
            })
            .count();
        assert!(accepts_for_passenger <= 1);
    }

    let rides: u32 = outcome.vehicles.iter().map(|v| v.rides_completed).sum();
    assert_eq!(rides as usize, completed.len());
    assert_eq!(metrics.vehicles_busy.get(), 0);
    assert_eq!(
        metrics.rides_total.with_label_values(&["completed"]).get() as usize,
        completed.len()
    );
}

#[tokio::test(start_paused = true)]
async fn scaled_time_unit_shortens_the_run() {
    let unit = Duration::from_millis(10);
    let mut simulation = Simulation::new(SimulationSettings::default().with_time_unit(unit));
    simulation
        .register_vehicle(ActorId::from("taxi1"), Position::new(0, 0))
        .unwrap();
    simulation
        .register_passenger(
            ActorId::from("passenger1"),
            TripSource::fixed(Position::new(10, 0), Position::new(10, 10)),
        )
        .unwrap();

    let started = tokio::time::Instant::now();
    let outcome = run(simulation).await;

    assert_eq!(outcome.reports[0].chosen_vehicle(), Some(&ActorId::from("taxi1")));
    // Twenty ticks of 2ms each, well under one default time unit.
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn duplicate_actor_names_are_rejected() {
    let mut simulation = Simulation::new(SimulationSettings::default());
    simulation
        .register_vehicle(ActorId::from("taxi1"), Position::new(0, 0))
        .unwrap();

    let again = simulation.register_passenger(
        ActorId::from("taxi1"),
        TripSource::fixed(Position::new(1, 1), Position::new(2, 2)),
    );
    assert!(matches!(again, Err(AppError::DuplicateActor(_))));
}
