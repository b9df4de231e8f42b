use crate::foundation::error::{TrellisError, TrellisResult};

/// Default lead time, in seconds, during which an upcoming subtree is prefetched.
pub const DEFAULT_PREFETCH_TIME: f64 = 1.0;

/// What a range command switches the subtree to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    /// Subtree inactive from this time on.
    Noop,
    /// Subtree live from this time on.
    Cont,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RangeCommand {
    pub time: f64,
    pub kind: RangeKind,
}

impl RangeCommand {
    pub fn noop(time: f64) -> Self {
        Self {
            time,
            kind: RangeKind::Noop,
        }
    }

    pub fn cont(time: f64) -> Self {
        Self {
            time,
            kind: RangeKind::Cont,
        }
    }
}

/// Per-frame activity of a subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    /// Evaluated and drawn.
    Active,
    /// About to become active: resources are synced, nothing is evaluated or drawn.
    Prefetch,
    /// Skipped entirely.
    Inactive,
}

#[derive(serde::Deserialize)]
struct TimeRangesRepr {
    commands: Vec<RangeCommand>,
    #[serde(default = "default_prefetch_time")]
    prefetch_time: f64,
}

fn default_prefetch_time() -> f64 {
    DEFAULT_PREFETCH_TIME
}

/// Ordered range commands gating a subtree.
///
/// The gate is level-triggered: liveness at `t` depends only on the commands and `t`, never on
/// which frames were rendered before.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "TimeRangesRepr")]
pub struct TimeRanges {
    commands: Vec<RangeCommand>,
    prefetch_time: f64,
}

impl TimeRanges {
    pub fn new(commands: Vec<RangeCommand>) -> TrellisResult<Self> {
        Self::with_prefetch_time(commands, DEFAULT_PREFETCH_TIME)
    }

    pub fn with_prefetch_time(
        commands: Vec<RangeCommand>,
        prefetch_time: f64,
    ) -> TrellisResult<Self> {
        for (i, c) in commands.iter().enumerate() {
            if !c.time.is_finite() || c.time < 0.0 {
                return Err(TrellisError::animation(format!(
                    "range command {i} time must be finite and >= 0 (got {})",
                    c.time
                )));
            }
        }
        if let Some(i) = commands.windows(2).position(|w| w[0].time > w[1].time) {
            return Err(TrellisError::animation(format!(
                "range command times must be non-decreasing (command {} at {} follows {})",
                i + 1,
                commands[i + 1].time,
                commands[i].time
            )));
        }
        if !prefetch_time.is_finite() || prefetch_time < 0.0 {
            return Err(TrellisError::animation(format!(
                "prefetch_time must be finite and >= 0 (got {prefetch_time})"
            )));
        }
        Ok(Self {
            commands,
            prefetch_time,
        })
    }

    pub fn commands(&self) -> &[RangeCommand] {
        &self.commands
    }

    pub fn prefetch_time(&self) -> f64 {
        self.prefetch_time
    }

    /// Last command whose time is `<= t`. With equal times the later command wins.
    pub fn active_command(&self, t: f64) -> Option<&RangeCommand> {
        let idx = self.commands.partition_point(|c| c.time <= t);
        idx.checked_sub(1).map(|i| &self.commands[i])
    }

    pub fn is_live(&self, t: f64) -> bool {
        matches!(
            self.active_command(t),
            Some(RangeCommand {
                kind: RangeKind::Cont,
                ..
            })
        )
    }

    pub fn liveness(&self, t: f64) -> Liveness {
        if self.is_live(t) {
            return Liveness::Active;
        }
        let idx = self.commands.partition_point(|c| c.time <= t);
        let next_cont = self.commands[idx..]
            .iter()
            .find(|c| c.kind == RangeKind::Cont);
        match next_cont {
            Some(c) if c.time - t <= self.prefetch_time => Liveness::Prefetch,
            _ => Liveness::Inactive,
        }
    }
}

impl TryFrom<TimeRangesRepr> for TimeRanges {
    type Error = TrellisError;

    fn try_from(r: TimeRangesRepr) -> Result<Self, Self::Error> {
        Self::with_prefetch_time(r.commands, r.prefetch_time)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timing/time_range.rs"]
mod tests;
