//! Focus timer (Pomodoro) with persisted settings and statistics.

use crate::backend::StorageBackend;
use crate::date_key::DateKey;
use crate::error::StoreResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const SETTINGS_KEY: &str = "focusTimer.settings";
pub const STATS_KEY: &str = "focusTimer.stats";

/// Timer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusMode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl FocusMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Focus => "Focus",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Self::ShortBreak | Self::LongBreak)
    }

    /// Message shown when a session of this mode ends.
    pub fn completion_message(&self) -> &'static str {
        match self {
            Self::Focus => "Focus session completed! Time for a break.",
            Self::ShortBreak | Self::LongBreak => "Break completed! Ready to focus again.",
        }
    }
}

/// User settings. Missing fields in stored data fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusSettings {
    pub focus_mins: u32,
    pub short_break_mins: u32,
    pub long_break_mins: u32,
    pub sessions_before_long_break: u32,
    pub sound_enabled: bool,
    pub auto_start_breaks: bool,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            focus_mins: 25,
            short_break_mins: 5,
            long_break_mins: 15,
            sessions_before_long_break: 4,
            sound_enabled: true,
            auto_start_breaks: false,
        }
    }
}

impl FocusSettings {
    pub fn duration(&self, mode: FocusMode) -> Duration {
        let mins = match mode {
            FocusMode::Focus => self.focus_mins,
            FocusMode::ShortBreak => self.short_break_mins,
            FocusMode::LongBreak => self.long_break_mins,
        };
        Duration::from_secs(u64::from(mins.max(1)) * 60)
    }
}

/// Lifetime and daily counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusStats {
    pub total_sessions: u32,
    pub total_focus_mins: u32,
    pub today_sessions: u32,
    pub streak: u32,
    /// Day `today_sessions` was last zeroed.
    pub last_reset: Option<DateKey>,
}

impl FocusStats {
    /// Zero today's count when the day changed since the last reset.
    pub fn roll_over(&mut self, today: DateKey) -> bool {
        if self.last_reset == Some(today) {
            return false;
        }
        self.today_sessions = 0;
        self.last_reset = Some(today);
        true
    }

    /// Total focus time as "Xh Ym".
    pub fn format_focus_time(&self) -> String {
        format!("{}h {}m", self.total_focus_mins / 60, self.total_focus_mins % 60)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

/// Report of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionComplete {
    pub finished: FocusMode,
    pub next: FocusMode,
    /// The next session was started automatically.
    pub auto_started: bool,
}

impl SessionComplete {
    pub fn message(&self) -> &'static str {
        self.finished.completion_message()
    }
}

/// Focus timer state machine.
///
/// Time only moves through [`FocusTimer::advance`], so the caller decides
/// the clock.
#[derive(Debug, Clone)]
pub struct FocusTimer {
    settings: FocusSettings,
    stats: FocusStats,
    mode: FocusMode,
    state: TimerState,
    remaining: Duration,
    /// Focus sessions completed since the timer was created.
    session_count: u32,
}

impl FocusTimer {
    pub fn new(settings: FocusSettings, stats: FocusStats) -> Self {
        let remaining = settings.duration(FocusMode::Focus);
        Self {
            settings,
            stats,
            mode: FocusMode::Focus,
            state: TimerState::Idle,
            remaining,
            session_count: 0,
        }
    }

    /// Restore settings and stats from `backend`, rolling daily counters
    /// over to `today`.
    pub fn load(backend: &impl StorageBackend, today: DateKey) -> Self {
        let settings: FocusSettings = read_or_default(backend, SETTINGS_KEY);
        let mut stats: FocusStats = read_or_default(backend, STATS_KEY);
        if stats.roll_over(today) {
            debug!(%today, "focus stats rolled over");
        }
        Self::new(settings, stats)
    }

    pub fn save_settings(&self, backend: &mut impl StorageBackend) -> StoreResult<()> {
        backend.write(SETTINGS_KEY, &serde_json::to_string(&self.settings)?)
    }

    pub fn save_stats(&self, backend: &mut impl StorageBackend) -> StoreResult<()> {
        backend.write(STATS_KEY, &serde_json::to_string(&self.stats)?)
    }

    /// Replace settings; an idle or paused timer is reset to the new length.
    pub fn set_settings(&mut self, settings: FocusSettings) {
        self.settings = settings;
        if self.state != TimerState::Running {
            self.state = TimerState::Idle;
            self.remaining = self.total();
        }
    }

    /// Switch mode. Ignored while running.
    pub fn set_mode(&mut self, mode: FocusMode) -> bool {
        if self.state == TimerState::Running {
            return false;
        }
        self.mode = mode;
        self.state = TimerState::Idle;
        self.remaining = self.total();
        true
    }

    /// Start, or resume when paused.
    pub fn start(&mut self) {
        self.state = TimerState::Running;
    }

    pub fn pause(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
        }
    }

    pub fn toggle(&mut self) {
        if self.state == TimerState::Running {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Stop and refill the current mode.
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.remaining = self.total();
    }

    /// Move to the next mode without crediting the current session.
    pub fn skip(&mut self) -> FocusMode {
        self.state = TimerState::Idle;
        let next = self.next_mode();
        self.set_mode(next);
        next
    }

    /// Let `elapsed` pass. Returns the completion report when the running
    /// session reaches zero.
    pub fn advance(&mut self, elapsed: Duration) -> Option<SessionComplete> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            Some(self.complete())
        } else {
            None
        }
    }

    fn complete(&mut self) -> SessionComplete {
        let finished = self.mode;
        self.state = TimerState::Idle;

        if finished == FocusMode::Focus {
            self.session_count += 1;
            self.stats.total_sessions += 1;
            self.stats.total_focus_mins += self.settings.focus_mins;
            self.stats.today_sessions += 1;
            self.stats.streak += 1;
        }

        let next = self.next_mode();
        self.set_mode(next);

        let auto_started = self.settings.auto_start_breaks && next.is_break();
        if auto_started {
            self.start();
        }

        debug!(finished = finished.name(), next = next.name(), auto_started, "focus session complete");
        SessionComplete {
            finished,
            next,
            auto_started,
        }
    }

    fn next_mode(&self) -> FocusMode {
        match self.mode {
            FocusMode::Focus => {
                let every = self.settings.sessions_before_long_break.max(1);
                if self.session_count > 0 && self.session_count % every == 0 {
                    FocusMode::LongBreak
                } else {
                    FocusMode::ShortBreak
                }
            }
            FocusMode::ShortBreak | FocusMode::LongBreak => FocusMode::Focus,
        }
    }

    pub fn total(&self) -> Duration {
        self.settings.duration(self.mode)
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Elapsed share of the session, 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        let total = self.total().as_secs_f64();
        if total <= 0.0 {
            return 0.0;
        }
        ((total - self.remaining.as_secs_f64()) / total).clamp(0.0, 1.0)
    }

    pub fn format_remaining(&self) -> String {
        let secs = self.remaining.as_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    pub fn mode(&self) -> FocusMode {
        self.mode
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn session_count(&self) -> u32 {
        self.session_count
    }

    pub fn settings(&self) -> &FocusSettings {
        &self.settings
    }

    /// Start a new day for the daily counter if `today` moved on.
    pub fn roll_over(&mut self, today: DateKey) -> bool {
        self.stats.roll_over(today)
    }

    pub fn stats(&self) -> &FocusStats {
        &self.stats
    }

    /// Sessions left before the next long break.
    pub fn until_long_break(&self) -> u32 {
        let every = self.settings.sessions_before_long_break.max(1);
        every - self.session_count % every
    }
}

fn read_or_default<T: DeserializeOwned + Default>(backend: &impl StorageBackend, key: &str) -> T {
    match backend.read(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, error = %e, "discarding corrupt focus timer data");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "could not read focus timer data");
            T::default()
        }
    }
}
