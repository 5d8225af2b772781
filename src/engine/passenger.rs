//! Passenger side of the ride negotiation.
//!
//! A passenger broadcasts a ride request to every known vehicle, collects bids
//! for a bounded window, accepts the lowest ETA and rejects the rest, then
//! waits for the winner's arrival notice. Rounds without any bid are retried
//! up to [`MAX_RETRIES`] times before the passenger gives up.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::bus::Mailbox;
use crate::engine::selection::{losers, select_winner, CollectedBid};
use crate::engine::timing::MAX_RETRIES;
use crate::engine::ActorContext;
use crate::error::AppError;
use crate::geo::{euclidean, round2};
use crate::models::message::{ActorId, Message};
use crate::models::position::Position;
use crate::models::ride::{RideOutcome, RideReport};

/// Where a passenger's pickup and destination come from.
pub enum TripSource {
    Random { rng: StdRng, grid_max: i32 },
    Fixed { pickup: Position, destination: Position },
}

impl TripSource {
    pub fn random(seed: Option<u64>, grid_max: i32) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::Random { rng, grid_max }
    }

    pub fn fixed(pickup: Position, destination: Position) -> Self {
        Self::Fixed {
            pickup,
            destination,
        }
    }

    fn draw(&mut self) -> (Position, Position) {
        match self {
            // Pickup and destination are drawn independently.
            TripSource::Random { rng, grid_max } => (
                Position::random(rng, *grid_max),
                Position::random(rng, *grid_max),
            ),
            TripSource::Fixed {
                pickup,
                destination,
            } => (*pickup, *destination),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassengerState {
    Init,
    SendRequest,
    CollectBids,
    Retry,
    SelectWinner,
    AwaitCompletion,
    Done,
}

impl PassengerState {
    pub fn name(&self) -> &'static str {
        match self {
            PassengerState::Init => "init",
            PassengerState::SendRequest => "send_request",
            PassengerState::CollectBids => "collect_bids",
            PassengerState::Retry => "retry",
            PassengerState::SelectWinner => "select_winner",
            PassengerState::AwaitCompletion => "await_completion",
            PassengerState::Done => "done",
        }
    }

    pub fn permits(&self, next: &PassengerState) -> bool {
        use PassengerState::*;

        matches!(
            (self, next),
            (Init, SendRequest)
                | (SendRequest, CollectBids)
                | (CollectBids, SelectWinner)
                | (CollectBids, Retry)
                | (Retry, SendRequest)
                | (Retry, Done)
                | (SelectWinner, AwaitCompletion)
                | (AwaitCompletion, Done)
        )
    }
}

pub struct Passenger {
    id: ActorId,
    vehicles: Vec<ActorId>,
    trip: TripSource,
    pickup: Position,
    destination: Position,
    retry_count: u32,
    bids: Vec<CollectedBid>,
    chosen: Option<CollectedBid>,
    state: PassengerState,
    mailbox: Mailbox,
    ctx: ActorContext,
    started_at: DateTime<Utc>,
}

impl Passenger {
    pub fn new(
        id: ActorId,
        vehicles: Vec<ActorId>,
        trip: TripSource,
        mailbox: Mailbox,
        ctx: ActorContext,
    ) -> Self {
        Self {
            id,
            vehicles,
            trip,
            pickup: Position::default(),
            destination: Position::default(),
            retry_count: 0,
            bids: Vec::new(),
            chosen: None,
            state: PassengerState::Init,
            mailbox,
            ctx,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    pub fn state(&self) -> PassengerState {
        self.state
    }

    /// Drives the state machine to `Done` and returns the final report.
    pub async fn run(mut self) -> Result<RideReport, AppError> {
        info!(passenger = %self.id, vehicles = self.vehicles.len(), "passenger started");
        self.started_at = Utc::now();

        loop {
            let next = match self.state {
                PassengerState::Init => self.init(),
                PassengerState::SendRequest => self.send_request().await,
                PassengerState::CollectBids => self.collect_bids().await,
                PassengerState::Retry => self.retry(),
                PassengerState::SelectWinner => self.select_winner().await?,
                PassengerState::AwaitCompletion => self.await_completion().await?,
                PassengerState::Done => break,
            };
            self.transition(next)?;
        }

        Ok(self.finish())
    }

    fn transition(&mut self, next: PassengerState) -> Result<(), AppError> {
        if !self.state.permits(&next) {
            return Err(AppError::IllegalTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }
        debug!(passenger = %self.id, from = self.state.name(), to = next.name(), "transition");
        self.state = next;
        Ok(())
    }

    fn init(&mut self) -> PassengerState {
        let (pickup, destination) = self.trip.draw();
        self.pickup = pickup;
        self.destination = destination;
        self.retry_count = 0;

        info!(passenger = %self.id, pickup = %pickup, destination = %destination, "trip planned");
        PassengerState::SendRequest
    }

    async fn send_request(&mut self) -> PassengerState {
        self.bids.clear();

        for vehicle in &self.vehicles {
            let request = Message::Request {
                pickup: self.pickup,
            };
            if self.ctx.deliver(&self.id, vehicle, request).await {
                self.ctx.metrics.requests_sent_total.inc();
                debug!(passenger = %self.id, vehicle = %vehicle, "request sent");
            }
        }

        info!(passenger = %self.id, retry = self.retry_count, "requests broadcast");
        PassengerState::CollectBids
    }

    async fn collect_bids(&mut self) -> PassengerState {
        // One bounded wait per known vehicle, whatever each wait yields.
        for _ in 0..self.vehicles.len() {
            let Some(envelope) = self.mailbox.recv_timeout(self.ctx.timings.bid_window).await
            else {
                continue;
            };

            let Message::Bid { eta, position } = envelope.message else {
                debug!(
                    passenger = %self.id,
                    sender = %envelope.sender,
                    performative = ?envelope.message.performative(),
                    "ignoring non-bid message"
                );
                continue;
            };

            let bid = CollectedBid {
                vehicle: envelope.sender,
                eta,
                position,
                distance: round2(euclidean(&self.pickup, &position)),
            };
            debug!(
                passenger = %self.id,
                vehicle = %bid.vehicle,
                eta = bid.eta,
                distance = bid.distance,
                "bid received"
            );
            self.ctx.metrics.bids_received_total.inc();
            self.bids.push(bid);
        }

        if self.bids.is_empty() {
            info!(passenger = %self.id, "no bids received");
            self.ctx.metrics.rounds_total.with_label_values(&["empty"]).inc();
            PassengerState::Retry
        } else {
            self.ctx.metrics.rounds_total.with_label_values(&["bids"]).inc();
            PassengerState::SelectWinner
        }
    }

    fn retry(&mut self) -> PassengerState {
        self.retry_count += 1;

        if self.retry_count > MAX_RETRIES {
            warn!(
                passenger = %self.id,
                retries = self.retry_count,
                "no vehicle available, giving up"
            );
            return PassengerState::Done;
        }

        info!(passenger = %self.id, attempt = self.retry_count, "retrying ride request");
        PassengerState::SendRequest
    }

    async fn select_winner(&mut self) -> Result<PassengerState, AppError> {
        let winner = select_winner(&self.bids)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("{} selecting without bids", self.id)))?;

        info!(
            passenger = %self.id,
            bids = self.bids.len(),
            vehicle = %winner.vehicle,
            eta = winner.eta,
            "vehicle selected"
        );

        let accept = Message::Accept {
            pickup: self.pickup,
            destination: self.destination,
            passenger: self.id.clone(),
        };
        self.ctx.deliver(&self.id, &winner.vehicle, accept).await;

        for vehicle in losers(&self.bids, &winner.vehicle) {
            debug!(passenger = %self.id, vehicle = %vehicle, "rejecting bid");
            self.ctx.deliver(&self.id, &vehicle, Message::Reject).await;
        }

        self.chosen = Some(winner);
        Ok(PassengerState::AwaitCompletion)
    }

    async fn await_completion(&mut self) -> Result<PassengerState, AppError> {
        let winner = self
            .chosen
            .as_ref()
            .map(|bid| bid.vehicle.clone())
            .ok_or_else(|| AppError::Internal(format!("{} awaiting without a vehicle", self.id)))?;

        info!(
            passenger = %self.id,
            vehicle = %winner,
            pickup = %self.pickup,
            "waiting for vehicle"
        );

        // No give-up path: only the chosen vehicle's arrival notice ends the wait.
        loop {
            let Some(envelope) = self
                .mailbox
                .recv_timeout(self.ctx.timings.completion_poll)
                .await
            else {
                continue;
            };

            if envelope.sender == winner && envelope.message == Message::Inform {
                info!(passenger = %self.id, vehicle = %winner, "arrived at destination");
                return Ok(PassengerState::Done);
            }

            debug!(
                passenger = %self.id,
                sender = %envelope.sender,
                performative = ?envelope.message.performative(),
                "ignoring message while riding"
            );
        }
    }

    fn finish(self) -> RideReport {
        let outcome = match self.chosen {
            Some(bid) => RideOutcome::Completed {
                vehicle: bid.vehicle,
                eta: bid.eta,
            },
            None => RideOutcome::NoVehicleAvailable,
        };

        let report = RideReport {
            passenger: self.id,
            pickup: self.pickup,
            destination: self.destination,
            retry_count: self.retry_count,
            outcome,
            started_at: self.started_at,
            finished_at: Utc::now(),
        };

        let label = match report.outcome {
            RideOutcome::Completed { .. } => "completed",
            RideOutcome::NoVehicleAvailable => "no_vehicle",
        };
        self.ctx.metrics.rides_total.with_label_values(&[label]).inc();

        info!(
            passenger = %report.passenger,
            pickup = %report.pickup,
            destination = %report.destination,
            retries = report.retry_count,
            vehicle = report.chosen_vehicle().map(ActorId::as_str).unwrap_or("none"),
            eta = ?report.chosen_eta(),
            "passenger report"
        );

        report
    }
}
