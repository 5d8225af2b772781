use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::message::ActorId;
use crate::models::position::Position;

/// The ride a vehicle is currently carrying out. Lives only inside that vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideAssignment {
    pub passenger: ActorId,
    pub pickup: Position,
    pub destination: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RideOutcome {
    Completed { vehicle: ActorId, eta: u32 },
    NoVehicleAvailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideReport {
    pub passenger: ActorId,
    pub pickup: Position,
    pub destination: Position,
    pub retry_count: u32,
    pub outcome: RideOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RideReport {
    pub fn chosen_vehicle(&self) -> Option<&ActorId> {
        match &self.outcome {
            RideOutcome::Completed { vehicle, .. } => Some(vehicle),
            RideOutcome::NoVehicleAvailable => None,
        }
    }

    pub fn chosen_eta(&self) -> Option<u32> {
        match self.outcome {
            RideOutcome::Completed { eta, .. } => Some(eta),
            RideOutcome::NoVehicleAvailable => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub id: ActorId,
    pub position: Position,
    pub rides_completed: u32,
}
