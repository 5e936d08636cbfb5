//! Scripted payloads for engine tests.
//!
//! A `ScriptedPayload` decides pass/fail per iteration from a fixed script
//! and records every iteration into a shared [`Journal`], with start and
//! finish times taken from the (usually paused) Tokio clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actionlane::exec::{ActionContext, ActionError, BoxFuture, Payload};
use tokio::time::Instant;

/// What a scripted payload does on a given iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    Pass,
    Fail,
    /// Fail on the listed (0-based) iterations, pass otherwise.
    FailOn(Vec<u32>),
    /// Pass on the listed iterations, fail otherwise.
    PassOn(Vec<u32>),
    /// Return a fatal payload error.
    Error,
    /// Panic inside the payload task.
    Panic,
}

impl Script {
    fn passes(&self, iteration: u32) -> bool {
        match self {
            Script::Pass => true,
            Script::Fail | Script::Error | Script::Panic => false,
            Script::FailOn(idx) => !idx.contains(&iteration),
            Script::PassOn(idx) => idx.contains(&iteration),
        }
    }
}

/// One recorded iteration.
#[derive(Debug, Clone)]
pub struct Entry {
    pub action: String,
    pub iteration: u32,
    pub started: Instant,
    pub finished: Instant,
    pub passed: bool,
}

/// Shared, append-only record of scripted iterations.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: Entry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    /// Action ids in the order their first iteration started.
    pub fn order(&self) -> Vec<String> {
        let mut entries = self.entries();
        entries.sort_by_key(|e| e.started);
        let mut order: Vec<String> = Vec::new();
        for e in entries {
            if !order.contains(&e.action) {
                order.push(e.action);
            }
        }
        order
    }

    pub fn ran(&self, action: &str) -> bool {
        self.entries().iter().any(|e| e.action == action)
    }

    /// Number of iterations of `action` that ran.
    pub fn count(&self, action: &str) -> usize {
        self.entries().iter().filter(|e| e.action == action).count()
    }

    pub fn first_start(&self, action: &str) -> Option<Instant> {
        self.entries()
            .iter()
            .filter(|e| e.action == action)
            .map(|e| e.started)
            .min()
    }

    pub fn last_finish(&self, action: &str) -> Option<Instant> {
        self.entries()
            .iter()
            .filter(|e| e.action == action)
            .map(|e| e.finished)
            .max()
    }

    /// Start times of every iteration of `action`, in order.
    pub fn starts(&self, action: &str) -> Vec<Instant> {
        let mut starts: Vec<Instant> = self
            .entries()
            .iter()
            .filter(|e| e.action == action)
            .map(|e| e.started)
            .collect();
        starts.sort();
        starts
    }
}

/// A payload driven by a [`Script`].
#[derive(Debug)]
pub struct ScriptedPayload {
    script: Script,
    duration: Duration,
    journal: Journal,
    cancels: Arc<AtomicUsize>,
}

impl ScriptedPayload {
    pub fn new(script: Script, journal: &Journal) -> Self {
        Self {
            script,
            duration: Duration::ZERO,
            journal: journal.clone(),
            cancels: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn pass(journal: &Journal) -> Self {
        Self::new(Script::Pass, journal)
    }

    pub fn fail(journal: &Journal) -> Self {
        Self::new(Script::Fail, journal)
    }

    /// Each iteration takes `duration` of (Tokio) time.
    pub fn taking(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// How often `cancel` was forwarded to this payload.
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn into_arc(self) -> Arc<dyn Payload> {
        Arc::new(self)
    }
}

impl Payload for ScriptedPayload {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<bool, ActionError>> {
        Box::pin(async move {
            let started = Instant::now();
            if !self.duration.is_zero() {
                tokio::time::sleep(self.duration).await;
            }
            let passed = self.script.passes(ctx.iteration());
            self.journal.push(Entry {
                action: ctx.action_id().to_string(),
                iteration: ctx.iteration(),
                started,
                finished: Instant::now(),
                passed,
            });

            match self.script {
                Script::Error => Err(ActionError::Fatal(anyhow::anyhow!(
                    "scripted error in '{}'",
                    ctx.action_id()
                ))),
                Script::Panic => panic!("scripted panic in '{}'", ctx.action_id()),
                _ => Ok(passed),
            }
        })
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}
