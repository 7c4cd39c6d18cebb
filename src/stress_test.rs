use async_stream::stream;
use futures::stream::Stream;
use futures::stream::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use weft_core::{Registry, Splice, Value};
use weft_sync::{
    Connection, HttpConnection, MemoryLog, Server, Session, SessionConfig, SessionConfigBuilder,
};

/// Statistics collected during stress testing
#[derive(Clone, Debug)]
pub struct StressTestStats {
    pub num_sessions: usize,
    pub edits_per_session: usize,
    pub total_syncs: usize,
    pub failed_syncs: usize,
    pub log_length: usize,
    pub total_time: Duration,
    pub avg_sync_time: Duration,
    pub ops_per_second: f64,
    pub converged: bool,
}

impl StressTestStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Stress Test Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Number of Sessions:        {:>38} ║", self.num_sessions);
        println!("║  Edits per Session:         {:>38} ║", self.edits_per_session);
        println!("║  Total Push/Pull Calls:     {:>38} ║", self.total_syncs);
        println!("║  Failed Push/Pull Calls:    {:>38} ║", self.failed_syncs);
        println!("║  Operations in Log:         {:>38} ║", self.log_length);
        println!("║  Total Time:                {:>39}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("║  Average Sync Time:         {:>36}µs ║", format!("{:.2}", self.avg_sync_time.as_micros()));
        println!("║  Operations/Second:         {:>38.0} ║", self.ops_per_second);
        println!("║  Converged:                 {:>38} ║", self.converged);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

#[derive(Clone, Copy, Debug)]
enum SyncStep {
    Push(usize),
    Pull(usize),
}

/// Generator that yields which session syncs next and in which direction
fn sync_step_generator(num_sessions: usize, num_syncs: usize) -> impl Stream<Item = SyncStep> {
    stream! {
        let mut rng = StdRng::from_entropy();
        for _ in 0..num_syncs {
            let session = rng.gen_range(0..num_sessions);
            if rng.gen_bool(0.5) {
                yield SyncStep::Push(session);
            } else {
                yield SyncStep::Pull(session);
            }
        }
    }
}

/// A random splice against the session's latest value: insert, delete or
/// overwrite a few characters.
fn random_edit<C: Connection>(session: &Session<C>, rng: &mut StdRng, tag: char) {
    let latest = session.stream().latest();
    let len = latest.value().len();
    let offset = rng.gen_range(0..=len);
    let delete = if len > offset && rng.gen_bool(0.3) {
        rng.gen_range(1..=(len - offset).min(3))
    } else {
        0
    };
    let before = latest.value().slice(offset as i64, (offset + delete) as i64);
    let inserted: String = std::iter::repeat(tag).take(rng.gen_range(0..3)).collect();
    latest.append(Splice::new(offset as i64, before, Value::text(&inserted)).into());
}

fn session_tag(idx: usize) -> char {
    char::from(b'a' + (idx % 26) as u8)
}

/// Push and pull every session until none has pending operations.
/// Returns the number of calls made and how many of them failed.
async fn settle<C: Connection>(
    sessions: &[Session<C>],
    latest_version: impl Fn() -> i64,
) -> (usize, usize) {
    let (mut calls, mut failed) = (0, 0);
    for _ in 0..20 {
        for session in sessions {
            if let Err(err) = session.push().await {
                eprintln!("  push failed while settling: {}", err);
                failed += 1;
            }
            calls += 1;
        }
        for session in sessions {
            if let Err(err) = session.pull().await {
                eprintln!("  pull failed while settling: {}", err);
                failed += 1;
            }
            calls += 1;
        }
        let target = latest_version();
        if sessions
            .iter()
            .all(|s| s.pending().is_empty() && s.version() == target)
        {
            break;
        }
    }
    (calls, failed)
}

async fn run_sessions<C: Connection>(
    sessions: Vec<Session<C>>,
    log: Arc<MemoryLog>,
    edits_per_session: usize,
    num_syncs: usize,
) -> StressTestStats {
    let num_sessions = sessions.len();
    let start = Instant::now();

    println!("\n[Phase 1/2] Editing and synchronizing sessions...");

    let mut rng = StdRng::from_entropy();
    let mut sync_times = vec![];
    let mut steps = Box::pin(sync_step_generator(num_sessions, num_syncs));
    let mut total_syncs = 0;
    let mut failed_syncs = 0;
    let mut edits = vec![0usize; num_sessions];

    while let Some(step) = steps.next().await {
        let idx = match step {
            SyncStep::Push(idx) | SyncStep::Pull(idx) => idx,
        };
        if edits[idx] < edits_per_session {
            random_edit(&sessions[idx], &mut rng, session_tag(idx));
            edits[idx] += 1;
        }

        let sync_start = Instant::now();
        let result = match step {
            SyncStep::Push(idx) => sessions[idx].push().await,
            SyncStep::Pull(idx) => sessions[idx].pull().await,
        };
        if let Err(err) = result {
            eprintln!("  {:?} failed: {}", step, err);
            failed_syncs += 1;
        }
        sync_times.push(sync_start.elapsed());
        total_syncs += 1;

        if total_syncs % 100 == 0 {
            println!("  Syncs completed: {}/{}", total_syncs, num_syncs);
        }
    }

    for (idx, session) in sessions.iter().enumerate() {
        while edits[idx] < edits_per_session {
            random_edit(session, &mut rng, session_tag(idx));
            edits[idx] += 1;
        }
    }

    println!("[Phase 1/2] ✓ Completed");
    println!("[Phase 2/2] Settling sessions...");

    let log_for_version = Arc::clone(&log);
    let (settle_calls, settle_failures) =
        settle(&sessions, move || log_for_version.latest_version()).await;
    total_syncs += settle_calls;
    failed_syncs += settle_failures;

    let total_time = start.elapsed();
    let first = sessions[0].stream().latest().value().clone();
    let converged = sessions
        .iter()
        .all(|s| s.stream().latest().value() == &first);

    let avg_sync_time = if !sync_times.is_empty() {
        sync_times.iter().sum::<Duration>() / sync_times.len() as u32
    } else {
        Duration::ZERO
    };

    let log_length = log.operations().len();
    let ops_per_second = (log_length + total_syncs) as f64 / total_time.as_secs_f64();

    println!("[Phase 2/2] ✓ Completed");

    StressTestStats {
        num_sessions,
        edits_per_session,
        total_syncs,
        failed_syncs,
        log_length,
        total_time,
        avg_sync_time,
        ops_per_second,
        converged,
    }
}

fn config() -> SessionConfig {
    SessionConfigBuilder::new().poll_duration_ms(-1).build()
}

/// Sessions editing one text through an in-process log
pub async fn stress_test_memory(
    num_sessions: usize,
    edits_per_session: usize,
    num_syncs: usize,
) -> StressTestStats {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Memory Log Stress Test (Async)                      ║");
    println!("║  Sessions: {} | Edits/Session: {} | Syncs: {} ║",
             num_sessions, edits_per_session, num_syncs);
    println!("╚════════════════════════════════════════════════════════════╝");

    let log = Arc::new(MemoryLog::new());
    let sessions = (0..num_sessions)
        .map(|_| {
            Session::new(Arc::clone(&log), weft_stream::Stream::new(Value::text("")))
                .with_config(config())
        })
        .collect();
    run_sessions(sessions, log, edits_per_session, num_syncs).await
}

/// Sessions editing one text through the encoded request/response protocol
pub async fn stress_test_protocol(
    num_sessions: usize,
    edits_per_session: usize,
    num_syncs: usize,
) -> StressTestStats {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Protocol Stress Test (Async)                        ║");
    println!("║  Sessions: {} | Edits/Session: {} | Syncs: {} ║",
             num_sessions, edits_per_session, num_syncs);
    println!("╚════════════════════════════════════════════════════════════╝");

    let log = Arc::new(MemoryLog::new());
    let server = Arc::new(Server::new(Arc::clone(&log), Registry::new()));
    let sessions = (0..num_sessions)
        .map(|_| {
            let conn = Arc::new(HttpConnection::new(Arc::clone(&server), Registry::new()));
            Session::new(conn, weft_stream::Stream::new(Value::text(""))).with_config(config())
        })
        .collect();
    run_sessions(sessions, log, edits_per_session, num_syncs).await
}

/// Stress test comparing different session counts
pub async fn stress_test_scaling(max_sessions: usize, step_size: usize) {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║      Scaling Analysis - Sessions vs Sync Cost              ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut current = step_size;
    while current <= max_sessions {
        let stats = stress_test_memory(current, 20, current * 50).await;
        stats.print();
        current += step_size;
    }
}
