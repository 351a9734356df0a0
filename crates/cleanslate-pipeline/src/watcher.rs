//! Polling directory watcher feeding the pipeline.
//!
//! # Design
//! - The directory is scanned once per tick (non-recursive). A file is
//!   submitted only after two consecutive scans observe the same size and
//!   modification time.
//! - [`WatchState`] is owned by the watch loop and is its only writer; pipeline
//!   tasks report back through a channel applied at the start of each tick.
//! - Failed files back off exponentially in ticks and are abandoned after
//!   `max_retries` failures; an abandoned file stays ignored until it changes
//!   or disappears.
//! - Hidden, temporary and unsupported files are never submitted.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use cleanslate_config::AppConfig;
use cleanslate_core::{FileIdentity, ProcessOptions, ProcessingResult, is_supported};
use cleanslate_events::Event;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::ProcessingPipeline;
use crate::shutdown::Shutdown;

/// File-name patterns the watcher never submits.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[".*", "~*", "*.tmp", "*.part", "*.partial"];

const MAX_BACKOFF_TICKS: u64 = 64;

/// Watcher tunables.
#[derive(Debug, Clone)]
pub struct WatcherSettings {
    /// Directory polled for new files.
    pub watch_dir: PathBuf,
    /// Directory receiving sanitized files; created at startup.
    pub output_dir: PathBuf,
    /// Delay between scans.
    pub poll_interval: Duration,
    /// Failures tolerated before a file is abandoned.
    pub max_retries: u32,
    /// File-name globs to skip.
    pub ignore_patterns: Vec<String>,
}

impl WatcherSettings {
    /// Derive settings from the application configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            watch_dir: config.watch.watch_dir.clone(),
            output_dir: config.watch.output_dir.clone(),
            poll_interval: config.watch.poll_interval,
            max_retries: config.watch.max_retries,
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|pattern| (*pattern).to_string())
                .collect(),
        }
    }
}

/// How a scan classified a file relative to the previous scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// First sighting.
    New,
    /// Size or modification time changed since the last scan.
    Growing,
    /// Unchanged since the last scan and eligible for processing.
    Stable,
    /// In flight, backing off, abandoned or ignored.
    AlreadySeen,
}

/// Size and modification time captured by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// File size in bytes.
    pub size: u64,
    /// Modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Observing,
    InFlight,
    BackingOff { retry_at: u64 },
    Abandoned,
    Ignored,
}

#[derive(Debug, Clone)]
struct WatchEntry {
    path: PathBuf,
    last: Observation,
    phase: Phase,
    failures: u32,
    seen_at: u64,
}

/// What happened to a failed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// The file will be retried once `retry_at` is reached.
    Retry {
        /// Failures so far.
        failures: u32,
        /// Tick at which the file becomes eligible again.
        retry_at: u64,
    },
    /// The file exhausted its retries.
    Abandoned {
        /// Failures so far.
        failures: u32,
    },
}

/// Per-file tracking owned by the watch loop.
#[derive(Debug, Default)]
pub struct WatchState {
    entries: HashMap<FileIdentity, WatchEntry>,
    tick: u64,
}

impl WatchState {
    /// Advance the tick counter; returns the new tick.
    pub const fn begin_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Current tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Record a scan observation and classify the file.
    pub fn observe(
        &mut self,
        identity: &FileIdentity,
        path: &Path,
        observation: Observation,
    ) -> Classification {
        let tick = self.tick;
        let Some(entry) = self.entries.get_mut(identity) else {
            self.entries.insert(
                identity.clone(),
                WatchEntry {
                    path: path.to_path_buf(),
                    last: observation,
                    phase: Phase::Observing,
                    failures: 0,
                    seen_at: tick,
                },
            );
            return Classification::New;
        };

        entry.seen_at = tick;
        if entry.phase == Phase::Ignored {
            entry.last = observation;
            return Classification::AlreadySeen;
        }
        if entry.last != observation {
            entry.last = observation;
            match entry.phase {
                Phase::InFlight => return Classification::AlreadySeen,
                Phase::Abandoned => {
                    entry.phase = Phase::Observing;
                    entry.failures = 0;
                }
                Phase::BackingOff { .. } => entry.phase = Phase::Observing,
                Phase::Observing | Phase::Ignored => {}
            }
            return Classification::Growing;
        }

        match entry.phase {
            Phase::Observing => Classification::Stable,
            Phase::BackingOff { retry_at } if tick >= retry_at => Classification::Stable,
            _ => Classification::AlreadySeen,
        }
    }

    /// Mark a stable file as submitted. Returns `false` when it already is.
    pub fn mark_in_flight(&mut self, identity: &FileIdentity) -> bool {
        match self.entries.get_mut(identity) {
            Some(entry) if entry.phase != Phase::InFlight => {
                entry.phase = Phase::InFlight;
                true
            }
            _ => false,
        }
    }

    /// Stop considering a file (unsupported type).
    pub fn mark_ignored(&mut self, identity: &FileIdentity) {
        if let Some(entry) = self.entries.get_mut(identity) {
            entry.phase = Phase::Ignored;
        }
    }

    /// Forget a file that was processed successfully.
    pub fn record_success(&mut self, identity: &FileIdentity) {
        self.entries.remove(identity);
    }

    /// Record a failed run and schedule a retry or abandon the file.
    pub fn record_failure(&mut self, identity: &FileIdentity, max_retries: u32) -> FailureDisposition {
        let tick = self.tick;
        let Some(entry) = self.entries.get_mut(identity) else {
            return FailureDisposition::Abandoned { failures: 0 };
        };
        entry.failures += 1;
        if entry.failures >= max_retries {
            entry.phase = Phase::Abandoned;
            return FailureDisposition::Abandoned {
                failures: entry.failures,
            };
        }
        let retry_at = tick + backoff_ticks(entry.failures);
        entry.phase = Phase::BackingOff { retry_at };
        FailureDisposition::Retry {
            failures: entry.failures,
            retry_at,
        }
    }

    /// Drop entries that were not seen during the current tick, unless a run
    /// is still in flight for them.
    pub fn prune(&mut self) -> usize {
        let tick = self.tick;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.seen_at == tick || entry.phase == Phase::InFlight);
        before - self.entries.len()
    }

    /// Number of tracked files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `identity` is tracked.
    #[must_use]
    pub fn contains(&self, identity: &FileIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    /// Whether `identity` was abandoned.
    #[must_use]
    pub fn is_abandoned(&self, identity: &FileIdentity) -> bool {
        self.entries
            .get(identity)
            .is_some_and(|entry| entry.phase == Phase::Abandoned)
    }

    fn path_of(&self, identity: &FileIdentity) -> Option<&Path> {
        self.entries.get(identity).map(|entry| entry.path.as_path())
    }
}

/// Retry delay in ticks after `failures` failures: 1, 2, 4, ... capped.
const fn backoff_ticks(failures: u32) -> u64 {
    let exponent = if failures == 0 { 0 } else { failures - 1 };
    if exponent >= 6 {
        MAX_BACKOFF_TICKS
    } else {
        let ticks = 1_u64 << exponent;
        if ticks > MAX_BACKOFF_TICKS {
            MAX_BACKOFF_TICKS
        } else {
            ticks
        }
    }
}

/// Counters for one tick, mostly for logs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Files seen for the first time.
    pub new: usize,
    /// Files still changing.
    pub growing: usize,
    /// Files handed to the pipeline.
    pub submitted: Vec<PathBuf>,
    /// Completions applied at the start of the tick.
    pub completed: usize,
    /// Entries dropped because the file disappeared.
    pub pruned: usize,
}

struct Completion {
    identity: FileIdentity,
    outcome: Result<ProcessingResult, String>,
}

/// Polls `WATCH_DIR` and submits stable files to the pipeline.
pub struct DirectoryWatcher {
    pipeline: Arc<ProcessingPipeline>,
    settings: WatcherSettings,
    ignore: GlobSet,
    tasks: JoinSet<()>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl DirectoryWatcher {
    /// Prepare a watcher, creating the watch and output directories.
    ///
    /// # Errors
    ///
    /// Returns an error when a directory cannot be created or an ignore
    /// pattern does not compile.
    pub fn new(pipeline: Arc<ProcessingPipeline>, settings: WatcherSettings) -> PipelineResult<Self> {
        for dir in [&settings.watch_dir, &settings.output_dir] {
            std::fs::create_dir_all(dir)
                .map_err(|err| PipelineError::io("create_watch_dirs", dir, err))?;
        }
        let ignore = build_globset(&settings.ignore_patterns)?;
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Ok(Self {
            pipeline,
            settings,
            ignore,
            tasks: JoinSet::new(),
            completions_tx,
            completions_rx,
        })
    }

    /// Poll until shutdown, then wait for in-flight runs.
    pub async fn run(mut self, mut shutdown: Shutdown) {
        info!(
            watch_dir = %self.settings.watch_dir.display(),
            interval_ms = u64::try_from(self.settings.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "directory watcher started"
        );
        let mut state = WatchState::default();
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.wait() => break,
                _ = ticker.tick() => {
                    let report = self.tick(&mut state).await;
                    if !report.submitted.is_empty() {
                        debug!(submitted = report.submitted.len(), tracked = state.len(), "watch tick");
                    }
                }
            }
        }
        info!(in_flight = self.tasks.len(), "watcher stopping; waiting for in-flight runs");
        self.settle(&mut state).await;
    }

    /// Run one scan: apply finished runs, classify files, submit stable ones.
    pub async fn tick(&mut self, state: &mut WatchState) -> TickReport {
        let mut report = TickReport {
            completed: self.apply_completions(state).await,
            ..TickReport::default()
        };
        state.begin_tick();

        for (path, observation) in self.scan() {
            let identity = match FileIdentity::resolve(&path) {
                Ok(identity) => identity,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to resolve file identity");
                    continue;
                }
            };
            match state.observe(&identity, &path, observation) {
                Classification::New => {
                    report.new += 1;
                    if is_supported(&path) {
                        debug!(path = %path.display(), size = observation.size, "new candidate");
                    } else {
                        warn!(path = %path.display(), "skipping unsupported file type");
                        state.mark_ignored(&identity);
                    }
                }
                Classification::Growing => {
                    report.growing += 1;
                    debug!(path = %path.display(), size = observation.size, "file still changing");
                }
                Classification::Stable => {
                    if self.submit(state, identity, &path, observation.size) {
                        report.submitted.push(path);
                    }
                }
                Classification::AlreadySeen => {}
            }
        }

        report.pruned = state.prune();
        self.pipeline.metrics().set_watcher_tracked(state.len());
        report
    }

    /// Wait for every in-flight run and apply its outcome.
    pub async fn settle(&mut self, state: &mut WatchState) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "pipeline task failed to join");
            }
        }
        self.apply_completions(state).await;
    }

    fn submit(&mut self, state: &mut WatchState, identity: FileIdentity, path: &Path, size: u64) -> bool {
        if !state.mark_in_flight(&identity) {
            return false;
        }
        info!(path = %path.display(), size, "submitting stable file");
        let _ = self.pipeline.events().publish(Event::CandidateDetected {
            identity: identity.to_string(),
            size,
        });
        let pipeline = Arc::clone(&self.pipeline);
        let completions = self.completions_tx.clone();
        let path = path.to_path_buf();
        self.tasks.spawn(async move {
            let outcome = pipeline
                .process(&path, ProcessOptions::default())
                .await
                .map_err(|err| describe(&err, &path));
            let _ = completions.send(Completion { identity, outcome });
        });
        true
    }

    async fn apply_completions(&mut self, state: &mut WatchState) -> usize {
        while self.tasks.try_join_next().is_some() {}
        let mut applied = 0;
        while let Ok(Completion { identity, outcome }) = self.completions_rx.try_recv() {
            applied += 1;
            let reason = match outcome {
                Ok(result) if result.success => {
                    state.record_success(&identity);
                    continue;
                }
                Ok(result) => result
                    .failure
                    .map_or_else(|| "pipeline run failed".to_string(), |failure| failure.message),
                Err(message) => message,
            };
            self.handle_failure(state, &identity, &reason).await;
        }
        applied
    }

    async fn handle_failure(&self, state: &mut WatchState, identity: &FileIdentity, reason: &str) {
        match state.record_failure(identity, self.settings.max_retries) {
            FailureDisposition::Retry { failures, retry_at } => {
                warn!(
                    identity = %identity,
                    failures,
                    retry_at,
                    reason,
                    "pipeline run failed; will retry"
                );
            }
            FailureDisposition::Abandoned { failures } => {
                let path = state
                    .path_of(identity)
                    .map_or_else(|| identity.to_string(), |path| path.display().to_string());
                error!(path, failures, reason, "abandoning file after repeated failures");
                let _ = self.pipeline.events().publish(Event::FileAbandoned {
                    identity: identity.to_string(),
                    attempts: failures,
                    reason: reason.to_string(),
                });
                let _ = self
                    .pipeline
                    .record_abandonment(identity, failures, reason)
                    .await;
            }
        }
    }

    fn scan(&self) -> Vec<(PathBuf, Observation)> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        for entry in WalkDir::new(&self.settings.watch_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "failed to read watch directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || self.ignore.is_match(entry.file_name()) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    debug!(path = %entry.path().display(), error = %err, "file vanished during scan");
                    continue;
                }
            };
            if seen.insert(entry.path().to_path_buf()) {
                found.push((
                    entry.into_path(),
                    Observation {
                        size: metadata.len(),
                        modified: metadata.modified().ok(),
                    },
                ));
            }
        }
        found
    }
}

fn describe(err: &PipelineError, path: &Path) -> String {
    match err {
        PipelineError::FileNotFound { .. } => format!("file not found: {}", path.display()),
        PipelineError::UnsupportedFileType { extension, .. } => format!(
            "unsupported file type: {}",
            extension.as_deref().unwrap_or("<none>")
        ),
        other => other.to_string(),
    }
}

fn build_globset(patterns: &[String]) -> PipelineResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| PipelineError::Glob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| PipelineError::Glob {
        pattern: patterns.join(","),
        source,
    })
}
