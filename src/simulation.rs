use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{oneshot, watch};
use tracing::{error, info};

use crate::bus::{Bus, Mailbox};
use crate::config::Config;
use crate::engine::passenger::{Passenger, TripSource};
use crate::engine::timing::Timings;
use crate::engine::vehicle::Vehicle;
use crate::engine::ActorContext;
use crate::error::AppError;
use crate::geo::AVERAGE_SPEED;
use crate::models::message::ActorId;
use crate::models::position::Position;
use crate::models::ride::{RideReport, VehicleSummary};
use crate::observability::metrics::Metrics;

const TAP_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub timings: Timings,
    pub mailbox_size: usize,
    pub average_speed: f64,
}

impl SimulationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timings: Timings::from_time_unit(config.time_unit()),
            mailbox_size: config.mailbox_size,
            average_speed: config.average_speed,
        }
    }

    pub fn with_time_unit(mut self, unit: Duration) -> Self {
        self.timings = Timings::from_time_unit(unit);
        self
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            timings: Timings::default(),
            mailbox_size: 64,
            average_speed: AVERAGE_SPEED,
        }
    }
}

#[derive(Debug)]
pub struct SimulationOutcome {
    pub reports: Vec<RideReport>,
    pub vehicles: Vec<VehicleSummary>,
}

struct PendingPassenger {
    id: ActorId,
    trip: TripSource,
    mailbox: Mailbox,
}

/// Registers actors, starts them in order and waits for the passengers.
pub struct Simulation {
    ctx: ActorContext,
    vehicles: Vec<Vehicle>,
    passengers: Vec<PendingPassenger>,
}

impl Simulation {
    pub fn new(settings: SimulationSettings) -> Self {
        let bus = Arc::new(Bus::new(
            settings.mailbox_size,
            settings.timings.send_timeout,
            TAP_BUFFER_SIZE,
        ));

        Self {
            ctx: ActorContext {
                bus,
                timings: settings.timings,
                metrics: Metrics::new(),
                average_speed: settings.average_speed,
            },
            vehicles: Vec::new(),
            passengers: Vec::new(),
        }
    }

    pub fn bus(&self) -> Arc<Bus> {
        self.ctx.bus.clone()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.ctx.metrics
    }

    pub fn register_vehicle(&mut self, id: ActorId, position: Position) -> Result<(), AppError> {
        let mailbox = self.ctx.bus.register(id.clone())?;
        self.vehicles
            .push(Vehicle::new(id, position, mailbox, self.ctx.clone()));
        Ok(())
    }

    pub fn register_passenger(&mut self, id: ActorId, trip: TripSource) -> Result<(), AppError> {
        let mailbox = self.ctx.bus.register(id.clone())?;
        self.passengers.push(PendingPassenger { id, trip, mailbox });
        Ok(())
    }

    pub async fn run(self) -> Result<SimulationOutcome, AppError> {
        let Simulation {
            ctx,
            vehicles,
            passengers,
        } = self;

        let vehicle_ids: Vec<ActorId> = vehicles.iter().map(|v| v.id().clone()).collect();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut vehicle_tasks = Vec::with_capacity(vehicles.len());
        let mut ready = Vec::with_capacity(vehicles.len());
        for vehicle in vehicles {
            let (ready_tx, ready_rx) = oneshot::channel();
            vehicle_tasks.push(tokio::spawn(vehicle.run(shutdown_rx.clone(), ready_tx)));
            ready.push(ready_rx);
        }

        for ready_rx in ready {
            ready_rx.await.map_err(|_| {
                AppError::Internal("vehicle stopped before it was ready".to_string())
            })?;
        }
        info!(vehicles = vehicle_ids.len(), "all vehicles live");

        let passenger_ids: Vec<ActorId> = passengers.iter().map(|p| p.id.clone()).collect();
        let passenger_tasks: Vec<_> = passengers
            .into_iter()
            .map(|pending| {
                let passenger = Passenger::new(
                    pending.id,
                    vehicle_ids.clone(),
                    pending.trip,
                    pending.mailbox,
                    ctx.clone(),
                );
                tokio::spawn(passenger.run())
            })
            .collect();
        info!(passengers = passenger_ids.len(), "passengers started");

        let mut reports = Vec::with_capacity(passenger_ids.len());
        for (id, joined) in passenger_ids.iter().zip(join_all(passenger_tasks).await) {
            match joined {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(err)) => error!(passenger = %id, error = %err, "passenger stopped"),
                Err(err) => error!(passenger = %id, error = %err, "passenger task failed"),
            }
        }
        info!(reports = reports.len(), "all passengers finished");

        let _ = shutdown_tx.send(true);
        let mut summaries = Vec::with_capacity(vehicle_ids.len());
        for (id, joined) in vehicle_ids.iter().zip(join_all(vehicle_tasks).await) {
            match joined {
                Ok(Ok(summary)) => summaries.push(summary),
                Ok(Err(err)) => error!(vehicle = %id, error = %err, "vehicle stopped"),
                Err(err) => error!(vehicle = %id, error = %err, "vehicle task failed"),
            }
        }

        for id in vehicle_ids.iter().chain(passenger_ids.iter()) {
            ctx.bus.deregister(id);
        }

        Ok(SimulationOutcome {
            reports,
            vehicles: summaries,
        })
    }
}
