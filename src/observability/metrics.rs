use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub requests_sent_total: IntCounter,
    pub bids_received_total: IntCounter,
    pub rounds_total: IntCounterVec,
    pub rides_total: IntCounterVec,
    pub messages_dropped_total: IntCounterVec,
    pub vehicles_busy: IntGauge,
    pub bid_eta_minutes: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_sent_total =
            IntCounter::new("requests_sent_total", "Ride requests sent to vehicles")
                .expect("valid requests_sent_total metric");

        let bids_received_total =
            IntCounter::new("bids_received_total", "Bids recorded by passengers")
                .expect("valid bids_received_total metric");

        let rounds_total = IntCounterVec::new(
            Opts::new("rounds_total", "Bidding rounds by outcome"),
            &["outcome"],
        )
        .expect("valid rounds_total metric");

        let rides_total = IntCounterVec::new(
            Opts::new("rides_total", "Finished passenger runs by outcome"),
            &["outcome"],
        )
        .expect("valid rides_total metric");

        let messages_dropped_total = IntCounterVec::new(
            Opts::new("messages_dropped_total", "Messages the bus failed to deliver"),
            &["reason"],
        )
        .expect("valid messages_dropped_total metric");

        let vehicles_busy = IntGauge::new("vehicles_busy", "Vehicles carrying out a ride")
            .expect("valid vehicles_busy metric");

        let bid_eta_minutes = Histogram::with_opts(
            HistogramOpts::new("bid_eta_minutes", "ETA offered in bids, in minutes")
                .buckets(vec![5.0, 10.0, 20.0, 40.0, 80.0, 160.0]),
        )
        .expect("valid bid_eta_minutes metric");

        registry
            .register(Box::new(requests_sent_total.clone()))
            .expect("register requests_sent_total");
        registry
            .register(Box::new(bids_received_total.clone()))
            .expect("register bids_received_total");
        registry
            .register(Box::new(rounds_total.clone()))
            .expect("register rounds_total");
        registry
            .register(Box::new(rides_total.clone()))
            .expect("register rides_total");
        registry
            .register(Box::new(messages_dropped_total.clone()))
            .expect("register messages_dropped_total");
        registry
            .register(Box::new(vehicles_busy.clone()))
            .expect("register vehicles_busy");
        registry
            .register(Box::new(bid_eta_minutes.clone()))
            .expect("register bid_eta_minutes");

        Self {
            registry,
            requests_sent_total,
            bids_received_total,
            rounds_total,
            rides_total,
            messages_dropped_total,
            vehicles_busy,
            bid_eta_minutes,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
