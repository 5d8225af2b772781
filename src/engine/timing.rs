use std::time::Duration;

/// Empty bidding rounds a passenger retries before giving up.
pub const MAX_RETRIES: u32 = 3;

const BID_WINDOW_UNITS: u32 = 10;
const COMPLETION_POLL_UNITS: u32 = 5;
const REQUEST_WAIT_UNITS: u32 = 30;
const DECISION_POLLS: u32 = 30;
const TICKS_PER_UNIT: u32 = 5;

/// Every wait in the protocol, scaled from a single time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub bid_window: Duration,
    pub completion_poll: Duration,
    pub request_wait: Duration,
    pub decision_poll: Duration,
    pub decision_polls: u32,
    pub tick: Duration,
    pub send_timeout: Duration,
}

impl Timings {
    pub fn from_time_unit(unit: Duration) -> Self {
        Self {
            bid_window: unit * BID_WINDOW_UNITS,
            completion_poll: unit * COMPLETION_POLL_UNITS,
            request_wait: unit * REQUEST_WAIT_UNITS,
            decision_poll: unit,
            decision_polls: DECISION_POLLS,
            tick: unit / TICKS_PER_UNIT,
            send_timeout: unit,
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self::from_time_unit(Duration::from_secs(1))
    }
}
