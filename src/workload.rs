use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use breakdown_agent::{BreakdownNode, ErrorReporter};
use tracing::warn;

// ─── Simulated failures ──────────────────────────────────────────

/// Errors the simulated application raises.
#[derive(Debug)]
struct SimulatedError(&'static str);

impl fmt::Display for SimulatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for SimulatedError {}

static DB_ERRORS: &[&str] = &[
    "connection reset by peer",
    "deadlock detected",
    "statement timeout",
    "too many connections",
    "relation does not exist",
    "serialization failure",
    "disk full",
];

static HTTP_ERRORS: &[&str] = &["upstream timed out", "502 bad gateway", ""];

static ENDPOINTS: &[&str] = &[
    "GET /api/users/:id",
    "GET /api/products/:id",
    "POST /api/sessions",
    "POST /api/users",
];

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` blocking workers that simulate request handling until
/// the deadline or the `running` flag is cleared. Every request feeds a
/// latency sample into `latency`; a fraction of them fail and are
/// recorded through `errors`. Returns the total number of errors raised.
pub async fn run(
    running: Arc<AtomicBool>,
    errors: Arc<ErrorReporter>,
    latency: Arc<BreakdownNode>,
    concurrency: u32,
    duration_secs: u64,
) -> u64 {
    let deadline = Instant::now() + Duration::from_secs(duration_secs);
    let raised = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::with_capacity(concurrency as usize);

    for worker_id in 0..concurrency {
        let running = running.clone();
        let errors = errors.clone();
        let latency = latency.clone();
        let raised = raised.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            worker(worker_id, &running, &errors, &latency, &raised, deadline);
        }));
    }

    for h in handles {
        if let Err(e) = h.await {
            warn!(error = %e, "workload worker failed");
        }
    }

    running.store(false, Ordering::SeqCst);
    raised.load(Ordering::SeqCst)
}

// ─── Worker loop ─────────────────────────────────────────────────

fn worker(
    id: u32,
    running: &AtomicBool,
    errors: &ErrorReporter,
    latency: &BreakdownNode,
    raised: &AtomicU64,
    deadline: Instant,
) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        let endpoint = ENDPOINTS[rng.gen_range(0..ENDPOINTS.len())];
        let millis = handle_request(&mut rng, errors, raised);
        latency.find_or_add_child(endpoint).update_p95(millis);

        std::thread::sleep(Duration::from_millis(rng.gen_range(1..5)));
    }
}

fn handle_request(rng: &mut StdRng, errors: &ErrorReporter, raised: &AtomicU64) -> f64 {
    // long-tailed latency: mostly fast, occasionally slow
    let millis = if rng.gen_bool(0.9) {
        rng.gen_range(1.0..40.0)
    } else {
        rng.gen_range(40.0..900.0)
    };

    if rng.gen_bool(0.15) {
        raised.fetch_add(1, Ordering::Relaxed);
        if rng.gen_bool(0.6) {
            query_database(rng, errors);
        } else {
            call_upstream(rng, errors);
        }
    }

    millis
}

#[inline(never)]
fn query_database(rng: &mut StdRng, errors: &ErrorReporter) {
    let err = SimulatedError(DB_ERRORS[rng.gen_range(0..DB_ERRORS.len())]);
    errors.record_error("database", Some(&err), 0);
}

#[inline(never)]
fn call_upstream(rng: &mut StdRng, errors: &ErrorReporter) {
    let err = SimulatedError(HTTP_ERRORS[rng.gen_range(0..HTTP_ERRORS.len())]);
    errors.record_error("http-client", Some(&err), 0);
}
