use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, bounded};
use tracing::{debug, warn};

use super::{CorrectionStrategy, StrategyContext, StrategyId, StrategyResult};
use crate::error::{CleanError, Result};

/// Worker threads serving generative calls unless configured otherwise.
const DEFAULT_GENERATIVE_WORKERS: usize = 2;

/// An external text-generation service: `(text) -> text`, no confidence signal.
pub trait GenerativeCorrector: Send + Sync {
    fn generate(&self, text: &str, column_hint: Option<&str>) -> Result<String>;
}

struct GenerationJob {
    text: String,
    column_hint: Option<String>,
    deadline: Instant,
    reply: Sender<Result<String>>,
}

/// Last-resort correction through a [`GenerativeCorrector`], bounded by a timeout.
///
/// Calls run on a fixed set of worker threads fed by a bounded queue. A call that
/// outlives its timeout keeps its worker busy until it returns; queued calls whose
/// caller already gave up are skipped.
pub struct GenerativeStrategy {
    jobs: Sender<GenerationJob>,
    timeout: Duration,
}

impl GenerativeStrategy {
    pub fn new(corrector: Arc<dyn GenerativeCorrector>, timeout: Duration) -> Self {
        Self::with_workers(corrector, timeout, DEFAULT_GENERATIVE_WORKERS)
    }

    pub fn with_workers(corrector: Arc<dyn GenerativeCorrector>, timeout: Duration, workers: usize) -> Self {
        let workers = workers.max(1);
        let (jobs, queue) = bounded(workers);
        for worker_id in 0..workers {
            if let Err(e) = spawn_worker(worker_id, queue.clone(), Arc::clone(&corrector)) {
                warn!("Failed to start generative worker {}: {}", worker_id, e);
            }
        }
        Self { jobs, timeout }
    }

    fn generate_with_timeout(&self, text: &str, column_hint: Option<&str>) -> Result<String> {
        let deadline = Instant::now() + self.timeout;
        let (reply, replies) = bounded(1);
        let job = GenerationJob {
            text: text.to_string(),
            column_hint: column_hint.map(str::to_string),
            deadline,
            reply,
        };
        match self.jobs.send_deadline(job, deadline) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => return Err(CleanError::Timeout(self.timeout)),
            Err(SendTimeoutError::Disconnected(_)) => {
                return Err(CleanError::Generative("no generative workers running".to_string()));
            }
        }

        match replies.recv_deadline(deadline) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(CleanError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(CleanError::Generative(
                "generative worker exited without a reply".to_string(),
            )),
        }
    }
}

fn spawn_worker(
    worker_id: usize,
    queue: Receiver<GenerationJob>,
    corrector: Arc<dyn GenerativeCorrector>,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name(format!("generative-correction-{}", worker_id))
        .spawn(move || {
            // Ends once the strategy, and with it the queue's sender, is dropped.
            for job in queue.iter() {
                if Instant::now() >= job.deadline {
                    debug!("Skipping expired generative call for '{}'", job.text);
                    continue;
                }
                let _ = job.reply.send(corrector.generate(&job.text, job.column_hint.as_deref()));
            }
        })?;
    Ok(())
}

impl CorrectionStrategy for GenerativeStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Generative
    }

    fn propose(&self, value: &str, ctx: &StrategyContext<'_>) -> Result<StrategyResult> {
        let text = ctx.original.unwrap_or(value);
        let generated = self.generate_with_timeout(text, ctx.column_hint)?;
        let generated = generated.trim();
        if generated.is_empty() {
            return Ok(StrategyResult::abstain(self.id()));
        }
        Ok(StrategyResult::propose(self.id(), generated, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo(&'static str);

    impl GenerativeCorrector for Echo {
        fn generate(&self, _text: &str, _column_hint: Option<&str>) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Slow;

    impl GenerativeCorrector for Slow {
        fn generate(&self, text: &str, _column_hint: Option<&str>) -> Result<String> {
            thread::sleep(Duration::from_millis(500));
            Ok(text.to_string())
        }
    }

    struct Broken;

    impl GenerativeCorrector for Broken {
        fn generate(&self, _text: &str, _column_hint: Option<&str>) -> Result<String> {
            Err(CleanError::Generative("503 from service".to_string()))
        }
    }

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl GenerativeCorrector for Recording {
        fn generate(&self, text: &str, _column_hint: Option<&str>) -> Result<String> {
            self.seen.lock().push(text.to_string());
            Ok(text.to_string())
        }
    }

    /// Sleeps on every call and tracks how many calls overlap.
    #[derive(Default)]
    struct Hanging {
        calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl GenerativeCorrector for Hanging {
        fn generate(&self, text: &str, _column_hint: Option<&str>) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(100));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(text.to_string())
        }
    }

    fn ctx() -> StrategyContext<'static> {
        StrategyContext::new(Some("notes"))
    }

    #[test]
    fn test_generated_text_is_proposed() {
        let s = GenerativeStrategy::new(Arc::new(Echo(" Bangalore \n")), Duration::from_secs(1));
        let result = s.propose("bnglr", &ctx()).unwrap();
        assert_eq!(result.candidate.as_deref(), Some("Bangalore"));

        let s = GenerativeStrategy::new(Arc::new(Echo("   ")), Duration::from_secs(1));
        assert!(s.propose("bnglr", &ctx()).unwrap().abstains());
    }

    #[test]
    fn test_timeout_and_failure_are_errors() {
        let s = GenerativeStrategy::new(Arc::new(Slow), Duration::from_millis(20));
        assert!(matches!(s.propose("x", &ctx()), Err(CleanError::Timeout(_))));

        let s = GenerativeStrategy::new(Arc::new(Broken), Duration::from_secs(1));
        assert!(matches!(s.propose("x", &ctx()), Err(CleanError::Generative(_))));
    }

    #[test]
    fn test_service_receives_original_text() {
        let recorder = Arc::new(Recording::default());
        let s = GenerativeStrategy::new(recorder.clone(), Duration::from_secs(1));
        s.propose("bnglr", &ctx().with_original("BNGLR Rd")).unwrap();
        s.propose("bnglr", &ctx()).unwrap();
        assert_eq!(*recorder.seen.lock(), vec!["BNGLR Rd".to_string(), "bnglr".to_string()]);
    }

    #[test]
    fn test_repeated_timeouts_stay_within_worker_pool() {
        let service = Arc::new(Hanging::default());
        let s = GenerativeStrategy::with_workers(service.clone(), Duration::from_millis(10), 1);
        for _ in 0..5 {
            assert!(matches!(s.propose("x", &ctx()), Err(CleanError::Timeout(_))));
        }
        thread::sleep(Duration::from_millis(400));
        assert!(service.max_active.load(Ordering::SeqCst) <= 1);
        // Calls whose caller already timed out are never started.
        assert!(service.calls.load(Ordering::SeqCst) <= 2);
    }
}
