use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, BackendError};
use crate::identity::{Identity, IdentityError, RegisteredUser};
use crate::metrics::{MetricsLog, MetricsSampler, Progress, DEFAULT_CADENCE_SECS};
use crate::mistakes::MistakeLedger;
use crate::record::{HalfStats, MetricsSubmission, TestRecord};
use crate::settings::Settings;
use crate::timer::{SessionTimer, TimerEvent};

/// Shown (and typed) when no reference text could be fetched
pub const PLACEHOLDER_TEXT: &str =
    "The reference text could not be loaded, so type this sentence instead.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionPhase {
    #[strum(to_string = "awaiting identity")]
    AwaitingIdentity,
    #[strum(to_string = "first half")]
    FirstHalfActive,
    #[strum(to_string = "break")]
    Break,
    #[strum(to_string = "second half")]
    SecondHalfActive,
    #[strum(to_string = "completed")]
    Completed,
}

impl SessionPhase {
    pub fn accepts_input(&self) -> bool {
        matches!(self, Self::FirstHalfActive | Self::SecondHalfActive)
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self,
            Self::FirstHalfActive | Self::Break | Self::SecondHalfActive
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub cadence_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cadence_secs: DEFAULT_CADENCE_SECS,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidIdentity(#[from] IdentityError),
    #[error("registration failed: {0}")]
    Registration(#[source] BackendError),
    #[error("no identity has been registered yet")]
    NoIdentity,
    #[error("cannot {action} during {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: SessionPhase,
    },
}

/// Outcome of the two persistence calls made when a session finishes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistenceReport {
    pub record_id: Option<String>,
    pub metrics_error: Option<String>,
    pub test_error: Option<String>,
}

impl PersistenceReport {
    pub fn is_ok(&self) -> bool {
        self.metrics_error.is_none() && self.test_error.is_none()
    }
}

/// Everything that changes while a session runs, owned in one place and
/// mutated only by [`TestSession`] transitions.
#[derive(Debug, Clone)]
struct SessionState {
    phase: SessionPhase,
    settings: Settings,
    reference: String,
    input: String,
    ledger: MistakeLedger,
    characters_typed: usize,
    mistakes: usize,
    typing_started: bool,
    first_half: Option<HalfStats>,
    second_half: Option<HalfStats>,
    first_metrics: Option<MetricsLog>,
    second_metrics: Option<MetricsLog>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::AwaitingIdentity,
            settings: Settings::default(),
            reference: String::new(),
            input: String::new(),
            ledger: MistakeLedger::default(),
            characters_typed: 0,
            mistakes: 0,
            typing_started: false,
            first_half: None,
            second_half: None,
            first_metrics: None,
            second_metrics: None,
        }
    }
}

impl SessionState {
    fn load_half(&mut self, reference: String) {
        self.ledger = MistakeLedger::for_reference(&reference);
        self.reference = reference;
        self.input.clear();
        self.characters_typed = 0;
        self.mistakes = 0;
        self.typing_started = false;
    }

    fn reference_len(&self) -> usize {
        self.ledger.len()
    }

    fn progress(&self) -> Progress {
        Progress::new(self.characters_typed, self.mistakes)
    }
}

/// Two-half timed typing test driven by input events and one-second ticks
#[derive(Debug)]
pub struct TestSession<B: Backend> {
    backend: B,
    config: SessionConfig,
    user: Option<(Identity, RegisteredUser)>,
    state: SessionState,
    timer: SessionTimer,
    sampler: Option<MetricsSampler>,
    last_record: Option<TestRecord>,
    last_metrics: Option<MetricsSubmission>,
    persistence: Option<PersistenceReport>,
    finished_sessions: u64,
}

impl<B: Backend> TestSession<B> {
    pub fn new(backend: B, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            user: None,
            state: SessionState::default(),
            timer: SessionTimer::new(),
            sampler: None,
            last_record: None,
            last_metrics: None,
            persistence: None,
            finished_sessions: 0,
        }
    }

    /// Register the test taker and start the first half
    pub fn submit_identity(&mut self, identity: Identity) -> Result<(), SessionError> {
        self.expect_phase("submit identity", &[SessionPhase::AwaitingIdentity])?;
        let identity = identity.validated()?;

        let user = self.backend.register_user(&identity).map_err(|e| {
            error!(error = %e, "user registration failed");
            SessionError::Registration(e)
        })?;
        info!(user_id = %user.id, name = %identity.name, "user registered");

        self.user = Some((identity, user));
        self.begin_first_half();
        Ok(())
    }

    /// Start a fresh session for the identity already registered
    pub fn restart(&mut self) -> Result<(), SessionError> {
        self.expect_phase(
            "restart",
            &[SessionPhase::AwaitingIdentity, SessionPhase::Completed],
        )?;
        if self.user.is_none() {
            return Err(SessionError::NoIdentity);
        }
        self.begin_first_half();
        Ok(())
    }

    /// Replace the typed text with `text`. Returns how many new mistakes it
    /// produced.
    pub fn input(&mut self, text: &str) -> Result<usize, SessionError> {
        if !self.state.phase.accepts_input() {
            return Err(SessionError::InvalidPhase {
                action: "type",
                phase: self.state.phase,
            });
        }

        let limit = self.state.reference_len();
        let text: String = text.chars().take(limit).collect();

        if !self.state.typing_started && !text.is_empty() {
            self.state.typing_started = true;
            self.timer.start(self.state.settings.half_time);
            self.sampler = Some(MetricsSampler::start(self.config.cadence_secs));
            debug!(phase = %self.state.phase, "typing started");
        }

        let new_mistakes = self.state.ledger.record_attempt(&self.state.reference, &text);
        self.state.mistakes += new_mistakes;
        self.state.characters_typed = text.chars().count();
        self.state.input = text;

        if limit > 0 && self.state.characters_typed >= limit {
            debug!(phase = %self.state.phase, "reference text completed early");
            self.finish_half();
        }
        Ok(new_mistakes)
    }

    pub fn type_char(&mut self, c: char) -> Result<usize, SessionError> {
        let mut text = self.state.input.clone();
        text.push(c);
        self.input(&text)
    }

    pub fn backspace(&mut self) -> Result<usize, SessionError> {
        let mut text = self.state.input.clone();
        text.pop();
        self.input(&text)
    }

    /// Advance the session clock by one second
    pub fn tick(&mut self) {
        match self.state.phase {
            SessionPhase::FirstHalfActive | SessionPhase::SecondHalfActive => {
                if let Some(sampler) = self.sampler.as_mut() {
                    let progress = self.state.progress();
                    sampler.tick(|| progress);
                }
                if let Some(TimerEvent::Expired) = self.timer.tick() {
                    debug!(phase = %self.state.phase, "half time expired");
                    self.finish_half();
                }
            }
            SessionPhase::Break => {
                if let Some(TimerEvent::Expired) = self.timer.tick() {
                    self.begin_second_half();
                }
            }
            SessionPhase::AwaitingIdentity | SessionPhase::Completed => {}
        }
    }

    /// Stop the test now, keeping whatever has been typed so far
    pub fn end_test(&mut self) -> Result<(), SessionError> {
        if !self.state.phase.is_running() {
            return Err(SessionError::InvalidPhase {
                action: "end the test",
                phase: self.state.phase,
            });
        }

        self.timer.stop();
        if let Some(sampler) = self.sampler.as_mut() {
            sampler.stop();
        }
        info!(phase = %self.state.phase, "test ended manually");

        if self.state.phase.accepts_input() {
            self.finalize_current_half();
        }
        self.complete(true);
        Ok(())
    }

    fn expect_phase(
        &self,
        action: &'static str,
        allowed: &[SessionPhase],
    ) -> Result<(), SessionError> {
        if allowed.contains(&self.state.phase) {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase {
                action,
                phase: self.state.phase,
            })
        }
    }

    fn begin_first_half(&mut self) {
        let settings = self.backend.fetch_settings().unwrap_or_else(|e| {
            warn!(error = %e, "settings unavailable, using defaults");
            Settings::default()
        });
        let reference = self.fetch_reference();

        self.timer.stop();
        self.sampler = None;
        self.state = SessionState {
            phase: SessionPhase::FirstHalfActive,
            settings,
            ..SessionState::default()
        };
        self.state.load_half(reference);
        self.timer.reset_to(settings.half_time);
        self.persistence = None;
        info!(
            half_time = settings.half_time,
            break_time = settings.break_time,
            "first half ready"
        );
    }

    /// Load the second reference text once the break has run out. Like the
    /// first half, the half timer and a fresh sampler only arm on the first
    /// keystroke, so idle seconds between the break and typing are not sampled.
    fn begin_second_half(&mut self) {
        let reference = self.fetch_reference();
        self.state.load_half(reference);
        self.sampler = None;
        self.timer.reset_to(self.state.settings.half_time);
        self.state.phase = SessionPhase::SecondHalfActive;
        info!("second half ready");
    }

    fn fetch_reference(&self) -> String {
        match self.backend.fetch_random_text() {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("backend returned empty text, using placeholder");
                PLACEHOLDER_TEXT.to_string()
            }
            Err(e) => {
                warn!(error = %e, "reference text unavailable, using placeholder");
                PLACEHOLDER_TEXT.to_string()
            }
        }
    }

    /// Freeze the half in progress into [`HalfStats`] and its metrics log
    fn finalize_current_half(&mut self) {
        self.timer.stop();
        let progress = self.state.progress();
        let log = match self.sampler.take() {
            Some(mut sampler) => {
                sampler.finish(progress);
                sampler.into_log()
            }
            None => MetricsLog {
                intervals: Vec::new(),
                total_mistakes: progress.mistakes,
                total_characters_typed: progress.characters_typed,
            },
        };
        let stats = HalfStats {
            characters_typed: progress.characters_typed,
            mistakes: progress.mistakes,
            time_spent: self
                .state
                .settings
                .half_time
                .saturating_sub(self.timer.remaining()),
        };

        match self.state.phase {
            SessionPhase::FirstHalfActive => {
                self.state.first_half = Some(stats);
                self.state.first_metrics = Some(log);
            }
            SessionPhase::SecondHalfActive => {
                self.state.second_half = Some(stats);
                self.state.second_metrics = Some(log);
            }
            _ => return,
        }
        info!(
            phase = %self.state.phase,
            characters = stats.characters_typed,
            mistakes = stats.mistakes,
            time_spent = stats.time_spent,
            "half finalized"
        );
    }

    fn finish_half(&mut self) {
        let phase = self.state.phase;
        self.finalize_current_half();

        match phase {
            SessionPhase::FirstHalfActive => {
                self.state.phase = SessionPhase::Break;
                self.timer.start(self.state.settings.break_time);
            }
            SessionPhase::SecondHalfActive => self.complete(false),
            _ => {}
        }
    }

    fn complete(&mut self, ended_early: bool) {
        self.timer.stop();
        self.sampler = None;

        let Some((identity, user)) = self.user.as_ref() else {
            return;
        };
        let settings = self.state.settings;
        let first_half = self.state.first_half.unwrap_or_default();
        let record = TestRecord::new(
            identity,
            user,
            settings,
            first_half,
            self.state.second_half,
            ended_early,
        );
        let submission = MetricsSubmission {
            user_id: user.id.clone(),
            first_half: self.state.first_metrics.clone().unwrap_or_default(),
            second_half: self.state.second_metrics.clone(),
            half_time: settings.half_time,
            break_time: settings.break_time,
        };

        let mut report = PersistenceReport::default();
        if let Err(e) = self.backend.submit_metrics(&submission) {
            error!(error = %e, "failed to persist metrics");
            report.metrics_error = Some(e.to_string());
        }
        match self.backend.submit_test(&record) {
            Ok(persisted) => report.record_id = persisted.id,
            Err(e) => {
                error!(error = %e, "failed to persist test record");
                report.test_error = Some(e.to_string());
            }
        }
        info!(
            ended_early,
            characters = record.total_characters_typed,
            mistakes = record.total_mistakes,
            persisted = report.is_ok(),
            "session finished"
        );

        self.last_record = Some(record);
        self.last_metrics = Some(submission);
        self.persistence = Some(report);
        self.finished_sessions += 1;

        if ended_early {
            let kept = std::mem::take(&mut self.state);
            self.state.settings = kept.settings;
            self.timer.reset_to(kept.settings.half_time);
        } else {
            self.state.phase = SessionPhase::Completed;
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    /// True only before anyone has registered in this process
    pub fn needs_identity(&self) -> bool {
        self.state.phase == SessionPhase::AwaitingIdentity && self.user.is_none()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.user.as_ref().map(|(identity, _)| identity)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|(_, user)| user.id.as_str())
    }

    pub fn time_left(&self) -> u64 {
        self.timer.remaining()
    }

    pub fn timer_active(&self) -> bool {
        self.timer.is_active()
    }

    pub fn settings(&self) -> Settings {
        self.state.settings
    }

    pub fn reference_text(&self) -> &str {
        &self.state.reference
    }

    pub fn input_text(&self) -> &str {
        &self.state.input
    }

    pub fn characters_typed(&self) -> usize {
        self.state.characters_typed
    }

    pub fn mistakes(&self) -> usize {
        self.state.mistakes
    }

    pub fn is_mistake_position(&self, idx: usize) -> bool {
        self.state.ledger.is_marked(idx)
    }

    pub fn first_half(&self) -> Option<HalfStats> {
        self.state.first_half
    }

    pub fn second_half(&self) -> Option<HalfStats> {
        self.state.second_half
    }

    pub fn first_metrics(&self) -> Option<&MetricsLog> {
        self.state.first_metrics.as_ref()
    }

    pub fn second_metrics(&self) -> Option<&MetricsLog> {
        self.state.second_metrics.as_ref()
    }

    pub fn last_record(&self) -> Option<&TestRecord> {
        self.last_record.as_ref()
    }

    /// Metrics of the last finished session, as submitted
    pub fn last_metrics(&self) -> Option<&MetricsSubmission> {
        self.last_metrics.as_ref()
    }

    pub fn persistence(&self) -> Option<&PersistenceReport> {
        self.persistence.as_ref()
    }

    /// Number of records finalized so far; grows by one per finished session
    pub fn finished_sessions(&self) -> u64 {
        self.finished_sessions
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
