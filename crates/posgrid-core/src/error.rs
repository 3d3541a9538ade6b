//! Error types for posgrid environments.
//!
//! Runtime errors surfaced by `reset`/`step` live in [`EnvError`]; every
//! variant is recoverable by the caller. Construction-time problems with a
//! game or driver configuration are [`ConfigError`]s.

use std::error::Error;
use std::fmt;

use crate::id::{AgentId, EnvStatus};

/// Initial-state sampling could not place an entity on a free cell.
///
/// Recoverable: the caller can reduce entity density or reconfigure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoFreeCellError {
    /// Number of cells that were excluded (already occupied) at the time.
    pub excluded: usize,
    /// Number of unblocked cells on the grid.
    pub free_cells: usize,
}

impl fmt::Display for NoFreeCellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no free cell available ({} excluded of {} unblocked)",
            self.excluded, self.free_cells
        )
    }
}

impl Error for NoFreeCellError {}

/// Errors returned by environment `reset` and `step`.
#[derive(Clone, Debug, PartialEq)]
pub enum EnvError {
    /// An agent's action is not in its action space, is missing, or the
    /// agent is not active. The environment state is left unchanged.
    InvalidAction {
        /// The offending agent.
        agent: AgentId,
        /// What was wrong with the action.
        reason: String,
    },
    /// `step` was called outside the `Ready` status. Call `reset`.
    InvalidState {
        /// The status the environment was in.
        status: EnvStatus,
    },
    /// Initial-state sampling could not place an entity.
    NoFreeCell(NoFreeCellError),
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAction { agent, reason } => {
                write!(f, "invalid action for agent {agent}: {reason}")
            }
            Self::InvalidState { status } => {
                write!(f, "step called while environment is {status}; call reset first")
            }
            Self::NoFreeCell(e) => write!(f, "initial state: {e}"),
        }
    }
}

impl Error for EnvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoFreeCell(e) => Some(e),
            _ => None,
        }
    }
}

impl From<NoFreeCellError> for EnvError {
    fn from(e: NoFreeCellError) -> Self {
        Self::NoFreeCell(e)
    }
}

/// Errors detected while validating a game or environment configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A numeric or enumerated parameter is outside its valid range.
    InvalidParameter {
        /// Parameter name as it appears in the config struct.
        name: &'static str,
        /// Description of the violated constraint.
        reason: String,
    },
    /// No layout is registered under the requested grid name.
    UnknownGrid {
        /// The requested name.
        name: String,
    },
    /// A grid layout is malformed.
    InvalidGrid {
        /// Description of the layout problem.
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidParameter`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter { name, reason } => write!(f, "invalid {name}: {reason}"),
            Self::UnknownGrid { name } => write!(f, "unknown grid '{name}'"),
            Self::InvalidGrid { reason } => write!(f, "invalid grid: {reason}"),
        }
    }
}

impl Error for ConfigError {}
