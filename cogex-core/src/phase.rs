/// Lifecycle of a single session: built, filled trial by trial, persisted.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Created,
    Running,
    Finalized,
}

impl SessionPhase {
    pub fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            Created => Running,
            Running => Finalized,
            Finalized => return None,
        })
    }

    pub fn accepts_outcomes(&self) -> bool {
        !matches!(self, SessionPhase::Finalized)
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, SessionPhase::Finalized)
    }
}
