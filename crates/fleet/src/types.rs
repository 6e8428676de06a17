//! Lifecycle actions understood by the service manager.

use std::fmt;

/// A single service manager sub-command applied to one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
}

impl Verb {
    /// Sub-command as passed to the service manager.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }

    /// Present participle for progress messages.
    pub fn progressive(&self) -> &'static str {
        match self {
            Self::Start => "Starting",
            Self::Stop => "Stopping",
            Self::Restart => "Restarting",
            Self::Enable => "Enabling",
            Self::Disable => "Disabling",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bulk transition applied to every discovered instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
    /// Disable first, then stop
    DisableStop,
}

impl Transition {
    /// Sub-actions applied to each instance, in order.
    pub fn steps(&self) -> &'static [Verb] {
        match self {
            Self::Start => &[Verb::Start],
            Self::Stop => &[Verb::Stop],
            Self::Restart => &[Verb::Restart],
            Self::Enable => &[Verb::Enable],
            Self::Disable => &[Verb::Disable],
            Self::DisableStop => &[Verb::Disable, Verb::Stop],
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.steps().iter().map(Verb::as_str).collect();
        f.write_str(&names.join("+"))
    }
}
