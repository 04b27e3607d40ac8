//! Termination requests delivered by the operating environment.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The notifications that ask the process to persist and stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationSignal {
    /// SIGINT (Ctrl-C)
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGQUIT
    Quit,
}

impl TerminationSignal {
    /// POSIX signal number, for diagnostics.
    pub fn number(self) -> i32 {
        match self {
            TerminationSignal::Interrupt => 2,
            TerminationSignal::Quit => 3,
            TerminationSignal::Terminate => 15,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Terminate => "SIGTERM",
            TerminationSignal::Quit => "SIGQUIT",
        }
    }
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.number())
    }
}

/// One received termination notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationRequest {
    pub signal: TerminationSignal,
    pub received_at: DateTime<Utc>,
}

impl TerminationRequest {
    /// Stamp a notification with the current time.
    pub fn new(signal: TerminationSignal) -> Self {
        Self {
            signal,
            received_at: Utc::now(),
        }
    }
}
