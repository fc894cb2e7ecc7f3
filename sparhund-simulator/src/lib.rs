/*!
# Sparhund Simulator

Deterministic synthetic connection-decision traffic for tests and
benchmarks. A seeded generator walks a fixed pool of remote addresses and
application identifiers, advances a virtual millisecond clock, and hashes
every emitted event into a BLAKE3 state digest so two runs with the same
seed are byte-for-byte comparable.

Events can be handed back to the caller, or pushed into a shared ingest
channel to exercise the full drain path.
*/

use blake3::Hasher;
use crossbeam::channel::Sender;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use sparhund_core::events::{ConnectionEvent, Decision, Protocol};

const ADDRESS_POOL: &[&str] = &[
    "142.250.74.46",
    "104.16.249.249",
    "185.199.108.153",
    "13.107.42.14",
    "151.101.1.140",
    "172.217.18.110",
    "2606:4700::6810:f9f9",
];

const APP_POOL: &[&str] = &[
    "org.mozilla.firefox",
    "com.whatsapp",
    "com.spotify.music",
    "com.google.android.gms",
    "org.telegram.messenger",
    "",
];

/// Simulated wall-clock epoch, Unix milliseconds.
const EPOCH_MS: i64 = 1_700_000_000_000;

pub struct TrafficSimulator {
    rng: SmallRng,
    clock_ms: i64,
    block_probability: f64,
    pub state_hasher: Hasher,
    sink: Option<Sender<ConnectionEvent>>,
}

impl TrafficSimulator {
    /// * `seed` - Seed for the generator; equal seeds replay identically.
    /// * `block_probability` - Fraction of flows the simulated policy blocks.
    pub fn new(seed: u64, block_probability: f64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            clock_ms: EPOCH_MS,
            block_probability,
            state_hasher: Hasher::new(),
            sink: None,
        }
    }

    /// Routes every generated event into the given ingest channel as well.
    pub fn with_sink(mut self, sink: Sender<ConnectionEvent>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Generates the next decision event and folds it into the state hash.
    pub fn next_event(&mut self) -> ConnectionEvent {
        self.clock_ms += self.rng.random_range(1..50);

        let address = ADDRESS_POOL[self.rng.random_range(0..ADDRESS_POOL.len())];
        let app = APP_POOL[self.rng.random_range(0..APP_POOL.len())];
        let decision = if self.rng.random_bool(self.block_probability) {
            Decision::Block
        } else {
            Decision::Allow
        };
        let protocol = if self.rng.random_bool(0.8) {
            Protocol::Tcp
        } else {
            Protocol::Udp
        };

        let event = ConnectionEvent::new(address, decision, self.clock_ms)
            .with_port(self.rng.random_range(1024..u16::MAX))
            .with_app(app)
            .with_protocol(protocol);

        self.state_hasher.update(event.address.as_bytes());
        self.state_hasher.update(event.app.as_bytes());
        self.state_hasher.update(&[event.decision.is_blocked() as u8]);
        self.state_hasher.update(&event.timestamp.to_le_bytes());

        event
    }

    /// Emits `event_count` events, pushing each into the sink when one is
    /// attached. Returns the final state hash as a hex string.
    pub fn run(&mut self, event_count: usize) -> String {
        for _ in 0..event_count {
            let event = self.next_event();
            if let Some(sink) = &self.sink {
                // A disconnected sink means the consumer shut down; stop
                // generating rather than fail.
                if sink.send(event).is_err() {
                    break;
                }
            }
        }
        hex::encode(self.state_hasher.finalize().as_bytes())
    }
}
