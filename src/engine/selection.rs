use crate::models::message::ActorId;
use crate::models::position::Position;

/// A bid as recorded by the passenger, in the order it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedBid {
    pub vehicle: ActorId,
    pub eta: u32,
    pub position: Position,
    /// Straight-line distance from the passenger's pickup, two decimals.
    pub distance: f64,
}

/// Lowest ETA wins; on a tie the earliest collected bid is kept.
pub fn select_winner(bids: &[CollectedBid]) -> Option<&CollectedBid> {
    // min_by_key returns the first of several equal minima.
    bids.iter().min_by_key(|bid| bid.eta)
}

/// Every other vehicle that bid this round, once each, in collection order.
pub fn losers(bids: &[CollectedBid], winner: &ActorId) -> Vec<ActorId> {
    let mut rejected: Vec<ActorId> = Vec::with_capacity(bids.len());
    for bid in bids {
        if &bid.vehicle != winner && !rejected.contains(&bid.vehicle) {
            rejected.push(bid.vehicle.clone());
        }
    }
    rejected
}
