//! Link quality tracking for the headband's horseshoe (contact quality) stream.

use std::fmt;

pub const CHANNEL_COUNT: usize = 4;

/// Sensor contacts in the order the headband reports them.
pub const CHANNEL_NAMES: [&str; CHANNEL_COUNT] = ["TP9", "Fp1", "Fp2", "TP10"];

/// Codes at or above this value mean the contact is off or too noisy.
pub const DISCONNECTED_CODE: f64 = 3.0;

/// One quality code per contact, lower is better (0..=4 in practice).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectionStatus(pub [f64; CHANNEL_COUNT]);

impl ConnectionStatus {
    /// Placeholder held until the first horseshoe message arrives.
    pub const UNREPORTED: ConnectionStatus = ConnectionStatus([4.0; CHANNEL_COUNT]);

    pub fn all_connected(&self) -> bool {
        self.0.iter().all(|&code| code < DISCONNECTED_CODE)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, code) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", code)?;
        }
        write!(f, "]")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// No horseshoe message seen yet; data is accepted optimistically.
    NeverUpdated,
    Usable,
    Degraded,
}

/// Outcome of a single link check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LinkCheck {
    Usable,
    /// The link was degraded and had been notified as such; this check ends
    /// the episode.
    Recovered,
    /// First degraded check of an episode. The caller reports it.
    Degraded(ConnectionStatus),
    /// Degraded, already reported.
    StillDegraded,
}

impl LinkCheck {
    pub fn is_usable(&self) -> bool {
        matches!(self, LinkCheck::Usable | LinkCheck::Recovered)
    }
}

/// Decides whether incoming data can be trusted, and debounces the
/// degraded-link notification to once per episode.
#[derive(Debug)]
pub struct LinkMonitor {
    status: ConnectionStatus,
    updated: bool,
    notified: bool,
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkMonitor {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::UNREPORTED,
            updated: false,
            notified: false,
        }
    }

    /// Replace the stored codes. Never gated.
    pub fn update(&mut self, codes: [f64; CHANNEL_COUNT]) {
        self.status = ConnectionStatus(codes);
        self.updated = true;
    }

    /// Evaluate the latest codes and advance the notification state.
    pub fn check(&mut self) -> LinkCheck {
        if !self.updated {
            return LinkCheck::Usable;
        }

        if self.status.all_connected() {
            if std::mem::replace(&mut self.notified, false) {
                LinkCheck::Recovered
            } else {
                LinkCheck::Usable
            }
        } else if self.notified {
            LinkCheck::StillDegraded
        } else {
            self.notified = true;
            LinkCheck::Degraded(self.status)
        }
    }

    pub fn is_usable(&mut self) -> bool {
        self.check().is_usable()
    }

    /// Current state without touching the notification flag.
    pub fn state(&self) -> LinkState {
        if !self.updated {
            LinkState::NeverUpdated
        } else if self.status.all_connected() {
            LinkState::Usable
        } else {
            LinkState::Degraded
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn notified(&self) -> bool {
        self.notified
    }
}
