//! Vehicle side of the ride negotiation.
//!
//! An idle vehicle answers each ride request with an ETA bid, then waits a
//! bounded number of polls for the requester's decision. An accepted ride is
//! driven in two legs using diagonal grid steps, after which the passenger is
//! told it has arrived and the vehicle goes back to waiting.

use tokio::sync::{oneshot, watch};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::bus::Mailbox;
use crate::engine::movement::Leg;
use crate::engine::ActorContext;
use crate::error::AppError;
use crate::geo::{eta_minutes, euclidean};
use crate::models::message::{ActorId, Message};
use crate::models::position::Position;
use crate::models::ride::{RideAssignment, VehicleSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VehicleState {
    Wait,
    Propose { requester: ActorId, pickup: Position },
    AwaitDecision { requester: ActorId },
    MoveToPickup,
    MoveToDestination,
    Arrived,
}

impl VehicleState {
    pub fn name(&self) -> &'static str {
        match self {
            VehicleState::Wait => "wait",
            VehicleState::Propose { .. } => "propose",
            VehicleState::AwaitDecision { .. } => "await_decision",
            VehicleState::MoveToPickup => "move_to_pickup",
            VehicleState::MoveToDestination => "move_to_destination",
            VehicleState::Arrived => "arrived",
        }
    }

    pub fn permits(&self, next: &VehicleState) -> bool {
        use VehicleState::*;

        matches!(
            (self, next),
            (Wait, Wait)
                | (Wait, Propose { .. })
                | (Propose { .. }, AwaitDecision { .. })
                | (AwaitDecision { .. }, MoveToPickup)
                | (AwaitDecision { .. }, Wait)
                | (MoveToPickup, MoveToDestination)
                | (MoveToDestination, Arrived)
                | (Arrived, Wait)
        )
    }
}

pub struct Vehicle {
    id: ActorId,
    position: Position,
    ride: Option<RideAssignment>,
    rides_completed: u32,
    state: VehicleState,
    mailbox: Mailbox,
    ctx: ActorContext,
}

impl Vehicle {
    pub fn new(id: ActorId, position: Position, mailbox: Mailbox, ctx: ActorContext) -> Self {
        Self {
            id,
            position,
            ride: None,
            rides_completed: 0,
            state: VehicleState::Wait,
            mailbox,
            ctx,
        }
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_available(&self) -> bool {
        self.ride.is_none()
    }

    /// Runs until `shutdown` flips to true or its sender is dropped.
    /// `ready` fires once the vehicle is listening.
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
        ready: oneshot::Sender<ActorId>,
    ) -> Result<VehicleSummary, AppError> {
        info!(vehicle = %self.id, position = %self.position, "vehicle started");
        let _ = ready.send(self.id.clone());

        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                next = self.step() => {
                    let next = next?;
                    self.transition(next)?;
                }
            }
        }

        info!(vehicle = %self.id, rides = self.rides_completed, "vehicle stopped");
        Ok(VehicleSummary {
            id: self.id,
            position: self.position,
            rides_completed: self.rides_completed,
        })
    }

    fn transition(&mut self, next: VehicleState) -> Result<(), AppError> {
        let illegal = !self.state.permits(&next)
            || (matches!(next, VehicleState::Propose { .. }) && !self.is_available());
        if illegal {
            return Err(AppError::IllegalTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }
        if self.state != next {
            debug!(vehicle = %self.id, from = self.state.name(), to = next.name(), "transition");
        }
        self.state = next;
        Ok(())
    }

    async fn step(&mut self) -> Result<VehicleState, AppError> {
        let next = match self.state.clone() {
            VehicleState::Wait => self.wait().await,
            VehicleState::Propose { requester, pickup } => self.propose(requester, pickup).await,
            VehicleState::AwaitDecision { requester } => self.await_decision(requester).await,
            VehicleState::MoveToPickup => {
                let ride = self.assignment()?.clone();
                info!(vehicle = %self.id, pickup = %ride.pickup, "driving to pickup");
                self.drive(ride.pickup).await;
                info!(vehicle = %self.id, passenger = %ride.passenger, "passenger picked up");
                VehicleState::MoveToDestination
            }
            VehicleState::MoveToDestination => {
                let ride = self.assignment()?.clone();
                info!(
                    vehicle = %self.id,
                    passenger = %ride.passenger,
                    destination = %ride.destination,
                    "ride started"
                );
                self.drive(ride.destination).await;
                VehicleState::Arrived
            }
            VehicleState::Arrived => self.arrive().await?,
        };
        Ok(next)
    }

    fn assignment(&self) -> Result<&RideAssignment, AppError> {
        self.ride
            .as_ref()
            .ok_or_else(|| AppError::MissingAssignment(self.id.to_string()))
    }

    async fn wait(&mut self) -> VehicleState {
        let Some(envelope) = self.mailbox.recv_timeout(self.ctx.timings.request_wait).await else {
            return VehicleState::Wait;
        };

        match envelope.message {
            Message::Request { pickup } if self.is_available() => {
                info!(
                    vehicle = %self.id,
                    passenger = %envelope.sender,
                    pickup = %pickup,
                    "ride requested"
                );
                VehicleState::Propose {
                    requester: envelope.sender,
                    pickup,
                }
            }
            other => {
                debug!(
                    vehicle = %self.id,
                    sender = %envelope.sender,
                    performative = ?other.performative(),
                    "ignoring message while waiting"
                );
                VehicleState::Wait
            }
        }
    }

    async fn propose(&mut self, requester: ActorId, pickup: Position) -> VehicleState {
        let distance = euclidean(&self.position, &pickup);
        let eta = eta_minutes(distance, self.ctx.average_speed);

        let bid = Message::Bid {
            eta,
            position: self.position,
        };
        if self.ctx.deliver(&self.id, &requester, bid).await {
            self.ctx.metrics.bid_eta_minutes.observe(f64::from(eta));
            info!(vehicle = %self.id, passenger = %requester, eta, "bid sent");
        }

        VehicleState::AwaitDecision { requester }
    }

    async fn await_decision(&mut self, requester: ActorId) -> VehicleState {
        for _ in 0..self.ctx.timings.decision_polls {
            let Some(envelope) = self
                .mailbox
                .recv_timeout(self.ctx.timings.decision_poll)
                .await
            else {
                continue;
            };

            if envelope.sender != requester {
                debug!(
                    vehicle = %self.id,
                    sender = %envelope.sender,
                    expected = %requester,
                    "ignoring message from another sender"
                );
                continue;
            }

            match envelope.message {
                Message::Accept {
                    pickup,
                    destination,
                    passenger,
                } => {
                    info!(
                        vehicle = %self.id,
                        passenger = %passenger,
                        pickup = %pickup,
                        destination = %destination,
                        "ride accepted"
                    );
                    self.ride = Some(RideAssignment {
                        passenger,
                        pickup,
                        destination,
                    });
                    self.ctx.metrics.vehicles_busy.inc();
                    return VehicleState::MoveToPickup;
                }
                Message::Reject => {
                    info!(vehicle = %self.id, passenger = %requester, "bid rejected");
                    return VehicleState::Wait;
                }
                _ => continue,
            }
        }

        debug!(vehicle = %self.id, passenger = %requester, "no decision received");
        VehicleState::Wait
    }

    async fn drive(&mut self, target: Position) {
        for next in Leg::new(self.position, target) {
            self.position = next;
            debug!(vehicle = %self.id, position = %self.position, "moving");
            sleep(self.ctx.timings.tick).await;
        }
    }

    async fn arrive(&mut self) -> Result<VehicleState, AppError> {
        let ride = self
            .ride
            .take()
            .ok_or_else(|| AppError::MissingAssignment(self.id.to_string()))?;

        self.rides_completed += 1;
        self.ctx.metrics.vehicles_busy.dec();

        self.ctx
            .deliver(&self.id, &ride.passenger, Message::Inform)
            .await;

        info!(
            vehicle = %self.id,
            passenger = %ride.passenger,
            position = %self.position,
            "ride completed"
        );

        Ok(VehicleState::Wait)
    }
}
