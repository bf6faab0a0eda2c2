//! In-memory record of stack lifecycle states during one run

use pipewatch_common::{StackState, StackUnit};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("cannot create {unit}: dependency {dependency} is {state}")]
    DependencyNotActive {
        unit: StackUnit,
        dependency: StackUnit,
        state: StackState,
    },

    #[error("illegal transition for {unit}: {from} -> {to}")]
    IllegalTransition {
        unit: StackUnit,
        from: StackState,
        to: StackState,
    },
}

/// Tracks the state of every stack unit
#[derive(Debug, Clone, Default)]
pub struct StackLedger {
    states: HashMap<StackUnit, StackState>,
}

impl StackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, unit: StackUnit) -> StackState {
        self.states.get(&unit).copied().unwrap_or_default()
    }

    fn transition(&mut self, unit: StackUnit, to: StackState) -> Result<(), LedgerError> {
        let from = self.state(unit);
        if !from.can_transition_to(to) {
            return Err(LedgerError::IllegalTransition { unit, from, to });
        }
        debug!(unit = %unit, from = %from, to = %to, "Stack state change");
        self.states.insert(unit, to);
        Ok(())
    }

    /// Mark `units` as creating
    ///
    /// Every dependency must already be active or be part of the same batch.
    pub fn begin_create(&mut self, units: &[StackUnit]) -> Result<(), LedgerError> {
        for unit in units {
            for dependency in unit.depends_on() {
                let state = self.state(*dependency);
                if state != StackState::Active && !units.contains(dependency) {
                    return Err(LedgerError::DependencyNotActive {
                        unit: *unit,
                        dependency: *dependency,
                        state,
                    });
                }
            }
        }
        for unit in units {
            self.transition(*unit, StackState::Creating)?;
        }
        Ok(())
    }

    /// Record the end of a create: active on success, absent on failure
    pub fn finish_create(&mut self, units: &[StackUnit], succeeded: bool) -> Result<(), LedgerError> {
        let to = if succeeded {
            StackState::Active
        } else {
            StackState::Absent
        };
        for unit in units {
            self.transition(*unit, to)?;
        }
        Ok(())
    }

    pub fn begin_destroy(&mut self, unit: StackUnit) -> Result<(), LedgerError> {
        self.transition(unit, StackState::Destroying)
    }

    /// Record the end of a destroy: absent on success, failed otherwise
    pub fn finish_destroy(&mut self, unit: StackUnit, succeeded: bool) -> Result<(), LedgerError> {
        let to = if succeeded {
            StackState::Absent
        } else {
            StackState::DestroyFailed
        };
        self.transition(unit, to)
    }
}
