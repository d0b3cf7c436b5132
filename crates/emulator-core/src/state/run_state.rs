use crate::fault::Fault;

/// Deterministic execution-state machine observed by hosts.
///
/// `Halted` and `Faulted` are terminal; a machine left `Running` after a
/// bounded `run` simply exhausted its budget without halting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Image and tables are loaded; no instruction has executed yet.
    #[default]
    Ready,
    /// Executing instructions.
    Running,
    /// `HALT` retired; the run completed successfully.
    Halted,
    /// An unrecoverable condition was latched at the recorded address.
    Faulted(Fault),
}

impl RunState {
    /// Returns the latched fault, if this state is `Faulted`.
    #[must_use]
    pub const fn fault(self) -> Option<Fault> {
        match self {
            Self::Faulted(fault) => Some(fault),
            Self::Ready | Self::Running | Self::Halted => None,
        }
    }

    /// Returns `true` when further `step` calls can make progress.
    #[must_use]
    pub const fn can_step(self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::RunState;
    use crate::fault::{Fault, FaultCause};

    #[test]
    fn default_state_is_ready() {
        assert_eq!(RunState::default(), RunState::Ready);
    }

    #[test]
    fn only_faulted_reports_a_fault() {
        let fault = Fault {
            pc: 8,
            cause: FaultCause::DivideByZero,
        };
        assert_eq!(RunState::Faulted(fault).fault(), Some(fault));
        assert_eq!(RunState::Ready.fault(), None);
        assert_eq!(RunState::Running.fault(), None);
        assert_eq!(RunState::Halted.fault(), None);
    }

    #[test]
    fn terminal_states_cannot_step() {
        assert!(RunState::Ready.can_step());
        assert!(RunState::Running.can_step());
        assert!(!RunState::Halted.can_step());
        let fault = Fault {
            pc: 0,
            cause: FaultCause::UnknownOpcode(0),
        };
        assert!(!RunState::Faulted(fault).can_step());
    }
}
