//! Analysis trigger: decides when a page is ready to analyze
//!
//! The trigger is a plain state machine. It never sleeps or spawns anything;
//! it owns four timer handles (deadlines) that the driver inspects with
//! [`Trigger::next_deadline`] and fires with [`Trigger::take_due`].

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::AnalysisResult;
use crate::payment::Observation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Monitoring,
    Analyzing,
    Complete,
}

/// Flags owned by the trigger; the pipeline only ever reads them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringState {
    pub payment_method_detected: bool,
    pub final_amount_detected: bool,
    pub analysis_count: u32,
    pub is_analyzing: bool,
    pub has_emitted_result: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Poll,
    HardTimeout,
    Settle,
    Reanalysis,
}

impl TimerKind {
    const ALL: [TimerKind; 4] = [
        TimerKind::Poll,
        TimerKind::HardTimeout,
        TimerKind::Settle,
        TimerKind::Reanalysis,
    ];
}

/// Cancellable one-shot deadlines, one slot per kind
#[derive(Debug, Clone, Default)]
pub struct Timers {
    poll: Option<Instant>,
    hard_timeout: Option<Instant>,
    settle: Option<Instant>,
    reanalysis: Option<Instant>,
}

impl Timers {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<Instant> {
        match kind {
            TimerKind::Poll => &mut self.poll,
            TimerKind::HardTimeout => &mut self.hard_timeout,
            TimerKind::Settle => &mut self.settle,
            TimerKind::Reanalysis => &mut self.reanalysis,
        }
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        match kind {
            TimerKind::Poll => self.poll,
            TimerKind::HardTimeout => self.hard_timeout,
            TimerKind::Settle => self.settle,
            TimerKind::Reanalysis => self.reanalysis,
        }
    }

    /// Arm `kind`, replacing any pending deadline
    pub fn arm(&mut self, kind: TimerKind, at: Instant) {
        *self.slot(kind) = Some(at);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        *self.slot(kind) = None;
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.deadline(kind).is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        TimerKind::ALL.iter().filter_map(|k| self.deadline(*k)).min()
    }

    /// Disarm and return the earliest timer whose deadline has passed
    pub fn take_due(&mut self, now: Instant) -> Option<TimerKind> {
        let due = TimerKind::ALL
            .iter()
            .filter_map(|k| self.deadline(*k).map(|at| (at, *k)))
            .filter(|(at, _)| *at <= now)
            .min_by_key(|(at, _)| *at)
            .map(|(_, kind)| kind)?;
        self.cancel(due);
        Some(due)
    }
}

/// Timing knobs of the state machine
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerConfig {
    pub poll_interval: Duration,
    pub hard_timeout: Duration,
    pub settle_delay: Duration,
    pub reanalysis_debounce: Duration,
    /// Analysis passes allowed per page view
    pub max_passes: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            hard_timeout: Duration::from_millis(10_000),
            settle_delay: Duration::from_millis(2000),
            reanalysis_debounce: Duration::from_millis(2000),
            max_passes: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trigger {
    config: TriggerConfig,
    phase: Phase,
    state: MonitoringState,
    timers: Timers,
}

/// Shortest interval for timers that re-arm themselves
const MIN_INTERVAL: Duration = Duration::from_millis(1);

impl Trigger {
    pub fn new(mut config: TriggerConfig) -> Self {
        config.poll_interval = config.poll_interval.max(MIN_INTERVAL);
        config.settle_delay = config.settle_delay.max(MIN_INTERVAL);
        config.reanalysis_debounce = config.reanalysis_debounce.max(MIN_INTERVAL);
        Self {
            config,
            phase: Phase::Idle,
            state: MonitoringState::default(),
            timers: Timers::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &MonitoringState {
        &self.state
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn take_due(&mut self, now: Instant) -> Option<TimerKind> {
        self.timers.take_due(now)
    }

    /// Mutations are only worth watching once the page has been picked up
    pub fn observes_mutations(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Nothing is pending and no further pass can happen without a mutation
    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Complete && !self.timers.is_armed(TimerKind::Reanalysis)
    }

    pub fn passes_remaining(&self) -> bool {
        self.state.analysis_count < self.config.max_passes
    }

    /// Idle → Monitoring
    pub fn page_ready(&mut self, now: Instant) {
        if self.phase != Phase::Idle {
            return;
        }
        self.phase = Phase::Monitoring;
        self.timers.arm(TimerKind::Poll, now + self.config.poll_interval);
        self.timers.arm(TimerKind::HardTimeout, now + self.config.hard_timeout);
        debug!("monitoring started");
    }

    fn should_begin(&self) -> bool {
        let payment = self.state.payment_method_detected;
        let amount = self.state.final_amount_detected;
        (payment && amount) || ((payment || amount) && self.state.analysis_count == 0)
    }

    /// Poll tick. Returns true if analysis began.
    pub fn on_poll(&mut self, observation: Observation, now: Instant) -> bool {
        if self.phase != Phase::Monitoring {
            return false;
        }
        self.state.payment_method_detected |= observation.payment_method_selected;
        self.state.final_amount_detected |= observation.final_amount_present;

        if self.should_begin() {
            return self.begin_analysis(now);
        }
        self.timers.arm(TimerKind::Poll, now + self.config.poll_interval);
        false
    }

    /// Hard timeout. Returns true if analysis began.
    pub fn on_hard_timeout(&mut self, now: Instant) -> bool {
        if self.phase != Phase::Monitoring {
            return false;
        }
        info!("hard timeout reached, analyzing regardless of page signals");
        self.begin_analysis(now)
    }

    /// Enter Analyzing and arm the settle timer. A no-op while a pass is in flight.
    pub fn begin_analysis(&mut self, now: Instant) -> bool {
        if self.state.is_analyzing {
            return false;
        }
        self.state.is_analyzing = true;
        self.state.analysis_count += 1;
        self.timers.cancel(TimerKind::Poll);
        self.timers.cancel(TimerKind::HardTimeout);
        self.timers.arm(TimerKind::Settle, now + self.config.settle_delay);
        self.phase = Phase::Analyzing;
        debug!(pass = self.state.analysis_count, "analysis scheduled");
        true
    }

    /// Record a finished pass. Returns true if this is the first disclosure.
    pub fn complete(&mut self, result: &AnalysisResult) -> bool {
        self.phase = Phase::Complete;
        self.state.is_analyzing = false;

        if !self.state.has_emitted_result && result.is_noteworthy() {
            self.state.has_emitted_result = true;
            return true;
        }
        false
    }

    /// Mutation batch. Returns true if a re-analysis was (re)armed.
    pub fn on_mutation(&mut self, significant: bool, now: Instant) -> bool {
        if !significant || !self.observes_mutations() || !self.passes_remaining() {
            return false;
        }
        self.timers.arm(TimerKind::Reanalysis, now + self.config.reanalysis_debounce);
        debug!("re-analysis armed");
        true
    }

    /// Debounced re-analysis. Returns true if analysis began.
    pub fn on_reanalysis_due(&mut self, now: Instant) -> bool {
        self.timers.cancel(TimerKind::Reanalysis);
        if !self.passes_remaining() || self.state.is_analyzing {
            return false;
        }
        info!(pass = self.state.analysis_count + 1, "significant page change, re-analyzing");
        self.state.payment_method_detected = false;
        self.state.final_amount_detected = false;
        self.state.is_analyzing = false;
        self.begin_analysis(now)
    }
}
