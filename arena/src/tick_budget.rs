use std::time::Duration;

use engine::profiling::{Profiler, StepTimings};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetThreshold {
    pub warn_ms: f64,
    pub critical_ms: f64,
}

impl BudgetThreshold {
    pub const fn new(warn_ms: f64, critical_ms: f64) -> Self {
        Self {
            warn_ms,
            critical_ms,
        }
    }

    fn is_valid(self) -> bool {
        self.warn_ms.is_finite()
            && self.critical_ms.is_finite()
            && self.warn_ms > 0.0
            && self.critical_ms > 0.0
            && self.warn_ms < self.critical_ms
    }

    pub fn from_env(defaults: BudgetThreshold) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), defaults)
    }

    fn from_lookup<F>(mut lookup: F, defaults: BudgetThreshold) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let warn_ms = parse_override_ms(lookup("ARENA_TICK_WARN_MS")).unwrap_or(defaults.warn_ms);
        let critical_ms =
            parse_override_ms(lookup("ARENA_TICK_CRIT_MS")).unwrap_or(defaults.critical_ms);
        let threshold = BudgetThreshold::new(warn_ms, critical_ms);
        if threshold.is_valid() {
            threshold
        } else {
            defaults
        }
    }

    /// Warn at half the tick period, critical at the full period.
    pub fn for_tick_period(period: Duration) -> Self {
        let ms = period.as_micros() as f64 / 1_000.0;
        Self::new(ms * 0.5, ms)
    }
}

fn parse_override_ms(raw: Option<String>) -> Option<f64> {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum BudgetStatus {
    #[default]
    Ok,
    Warn,
    Critical,
}

impl BudgetStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Critical => "CRIT",
        }
    }
}

pub fn classify(ms: f64, threshold: BudgetThreshold) -> BudgetStatus {
    if ms > threshold.critical_ms {
        BudgetStatus::Critical
    } else if ms > threshold.warn_ms {
        BudgetStatus::Warn
    } else {
        BudgetStatus::Ok
    }
}

/// Room-tick profiler. Counts slow ticks and logs the ones over budget.
#[derive(Debug, Clone)]
pub struct TickBudget {
    room: String,
    threshold: BudgetThreshold,
    total_ticks: usize,
    over_warn_ticks: usize,
    over_critical_ticks: usize,
    consecutive_critical: usize,
    max_consecutive_critical: usize,
    last: BudgetStatus,
}

impl TickBudget {
    pub fn new(room: impl Into<String>, threshold: BudgetThreshold) -> Self {
        Self {
            room: room.into(),
            threshold,
            total_ticks: 0,
            over_warn_ticks: 0,
            over_critical_ticks: 0,
            consecutive_critical: 0,
            max_consecutive_critical: 0,
            last: BudgetStatus::Ok,
        }
    }

    pub fn last_status(&self) -> BudgetStatus {
        self.last
    }

    pub fn total_ticks(&self) -> usize {
        self.total_ticks
    }

    pub fn over_warn_ticks(&self) -> usize {
        self.over_warn_ticks
    }

    pub fn over_critical_ticks(&self) -> usize {
        self.over_critical_ticks
    }

    pub fn max_consecutive_critical(&self) -> usize {
        self.max_consecutive_critical
    }

    pub fn warn_pct(&self) -> f64 {
        pct(self.over_warn_ticks, self.total_ticks)
    }

    fn observe(&mut self, tick: u64, ms: f64) -> BudgetStatus {
        let status = classify(ms, self.threshold);
        self.total_ticks = self.total_ticks.saturating_add(1);
        if status >= BudgetStatus::Warn {
            self.over_warn_ticks = self.over_warn_ticks.saturating_add(1);
        }
        if status == BudgetStatus::Critical {
            self.over_critical_ticks = self.over_critical_ticks.saturating_add(1);
            self.consecutive_critical = self.consecutive_critical.saturating_add(1);
            self.max_consecutive_critical =
                self.max_consecutive_critical.max(self.consecutive_critical);
        } else {
            self.consecutive_critical = 0;
        }
        if status != BudgetStatus::Ok {
            warn!(
                room = %self.room,
                tick,
                ms,
                status = status.label(),
                "room tick over budget"
            );
        }
        self.last = status;
        status
    }
}

impl Profiler for TickBudget {
    fn on_step(&mut self, frame: u64, timings: StepTimings) {
        self.observe(frame, timings.total.as_secs_f64() * 1_000.0);
    }
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64) * 100.0 / (whole as f64)
    }
}
