//! Onboarding state machine. Tracks which (level, phase) the seller is at.

use serde::{Deserialize, Serialize};

/// Highest verification level.
pub const MAX_LEVEL: u8 = 3;

/// Number of phases in a level, or 0 for a level outside `1..=MAX_LEVEL`.
pub fn phases_for_level(level: u8) -> u8 {
    match level {
        1 => 3,
        2 | 3 => 2,
        _ => 0,
    }
}

/// A position in the onboarding sequence.
///
/// Always valid: `level` is in `1..=3` and `phase` in
/// `1..=phases_for_level(level)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct StepPosition {
    level: u8,
    phase: u8,
}

#[derive(Deserialize)]
struct RawPosition {
    level: u8,
    phase: u8,
}

impl TryFrom<RawPosition> for StepPosition {
    type Error = String;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        StepPosition::new(raw.level, raw.phase)
            .ok_or_else(|| format!("no onboarding step at {}.{}", raw.level, raw.phase))
    }
}

impl StepPosition {
    /// Account basics: the step that creates the onboarding session.
    pub const INITIAL: StepPosition = StepPosition { level: 1, phase: 1 };
    /// Branding: the step whose success completes onboarding.
    pub const TERMINAL: StepPosition = StepPosition { level: 3, phase: 2 };

    pub fn new(level: u8, phase: u8) -> Option<Self> {
        (phase >= 1 && phase <= phases_for_level(level)).then_some(Self { level, phase })
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn phase(&self) -> u8 {
        self.phase
    }

    pub fn is_initial(&self) -> bool {
        *self == Self::INITIAL
    }

    pub fn is_terminal(&self) -> bool {
        *self == Self::TERMINAL
    }

    /// The next position. Stays put at the terminal step.
    pub fn advanced(self) -> Self {
        if self.phase < phases_for_level(self.level) {
            Self {
                phase: self.phase + 1,
                ..self
            }
        } else if self.level < MAX_LEVEL {
            Self {
                level: self.level + 1,
                phase: 1,
            }
        } else {
            self
        }
    }

    /// The previous position. Stays put at the initial step.
    pub fn retreated(self) -> Self {
        if self.phase > 1 {
            Self {
                phase: self.phase - 1,
                ..self
            }
        } else if self.level > 1 {
            let level = self.level - 1;
            Self {
                level,
                phase: phases_for_level(level),
            }
        } else {
            self
        }
    }

    /// Every position in workflow order.
    pub fn all() -> impl Iterator<Item = StepPosition> {
        (1..=MAX_LEVEL).flat_map(|level| {
            (1..=phases_for_level(level)).map(move |phase| StepPosition { level, phase })
        })
    }
}

impl Default for StepPosition {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl std::fmt::Display for StepPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.level, self.phase)
    }
}

/// Lifecycle of a whole onboarding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    InProgress,
    Complete,
    Abandoned,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Abandoned)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Abandoned => "abandoned",
        };
        write!(f, "{s}")
    }
}

/// Owns the current position and the workflow status.
///
/// `advance` is crate-private: only a server-acknowledged submission moves
/// the seller forward. `retreat` is local navigation and always allowed.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowController {
    position: StepPosition,
    status: WorkflowStatus,
}

impl Default for WorkflowController {
    fn default() -> Self {
        Self::at(StepPosition::INITIAL)
    }
}

impl WorkflowController {
    pub fn at(position: StepPosition) -> Self {
        Self {
            position,
            status: WorkflowStatus::InProgress,
        }
    }

    pub fn position(&self) -> StepPosition {
        self.position
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Move forward one step. Returns whether the position changed.
    pub(crate) fn advance(&mut self) -> bool {
        let next = self.position.advanced();
        let moved = next != self.position;
        self.position = next;
        moved
    }

    /// Move back one step. Returns whether the position changed.
    pub fn retreat(&mut self) -> bool {
        let previous = self.position.retreated();
        let moved = previous != self.position;
        self.position = previous;
        moved
    }

    pub(crate) fn reseed(&mut self, position: StepPosition) {
        self.position = position;
        self.status = WorkflowStatus::InProgress;
    }

    pub(crate) fn complete(&mut self) {
        self.status = WorkflowStatus::Complete;
    }

    pub(crate) fn abandon(&mut self) {
        self.status = WorkflowStatus::Abandoned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(level: u8, phase: u8) -> StepPosition {
        StepPosition::new(level, phase).unwrap()
    }

    #[test]
    fn phase_counts_per_level() {
        assert_eq!(phases_for_level(1), 3);
        assert_eq!(phases_for_level(2), 2);
        assert_eq!(phases_for_level(3), 2);
        assert_eq!(phases_for_level(0), 0);
        assert_eq!(phases_for_level(4), 0);
    }

    #[test]
    fn rejects_out_of_range_positions() {
        assert!(StepPosition::new(0, 1).is_none());
        assert!(StepPosition::new(1, 0).is_none());
        assert!(StepPosition::new(1, 4).is_none());
        assert!(StepPosition::new(2, 3).is_none());
        assert!(StepPosition::new(4, 1).is_none());
        assert!(StepPosition::new(3, 2).is_some());
    }

    #[test]
    fn advance_walks_every_step() {
        let expected = [(1, 2), (1, 3), (2, 1), (2, 2), (3, 1), (3, 2)];
        let mut current = StepPosition::INITIAL;
        for (level, phase) in expected {
            current = current.advanced();
            assert_eq!(current, pos(level, phase));
        }
        assert_eq!(current.advanced(), StepPosition::TERMINAL);
    }

    #[test]
    fn retreat_undoes_advance_everywhere() {
        for p in StepPosition::all().filter(|p| !p.is_terminal()) {
            assert_eq!(p.advanced().retreated(), p, "round trip from {p}");
        }
    }

    #[test]
    fn level_boundaries() {
        assert_eq!(pos(1, 3).advanced(), pos(2, 1));
        assert_eq!(pos(2, 1).retreated(), pos(1, 3));
        assert_eq!(pos(2, 2).advanced(), pos(3, 1));
        assert_eq!(pos(3, 1).retreated(), pos(2, 2));
    }

    #[test]
    fn ends_are_no_ops() {
        assert_eq!(StepPosition::TERMINAL.advanced(), StepPosition::TERMINAL);
        assert_eq!(StepPosition::INITIAL.retreated(), StepPosition::INITIAL);
    }

    #[test]
    fn all_lists_seven_steps_in_order() {
        let all: Vec<_> = StepPosition::all().collect();
        assert_eq!(all.len(), 7);
        assert_eq!(all.first(), Some(&StepPosition::INITIAL));
        assert_eq!(all.last(), Some(&StepPosition::TERMINAL));
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn deserialize_validates_range() {
        let ok: StepPosition = serde_json::from_str(r#"{"level":2,"phase":2}"#).unwrap();
        assert_eq!(ok, pos(2, 2));
        assert!(serde_json::from_str::<StepPosition>(r#"{"level":2,"phase":3}"#).is_err());
    }

    #[test]
    fn controller_transitions() {
        let mut c = WorkflowController::default();
        assert!(!c.retreat());
        assert!(c.advance());
        assert_eq!(c.position(), pos(1, 2));
        assert!(c.retreat());
        assert_eq!(c.position(), StepPosition::INITIAL);

        let mut c = WorkflowController::at(StepPosition::TERMINAL);
        assert!(!c.advance());
        c.complete();
        assert_eq!(c.status(), WorkflowStatus::Complete);
        assert!(c.status().is_terminal());
    }

    #[test]
    fn status_display_matches_serde() {
        for status in [
            WorkflowStatus::InProgress,
            WorkflowStatus::Complete,
            WorkflowStatus::Abandoned,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(format!("\"{status}\""), json);
        }
    }
}
