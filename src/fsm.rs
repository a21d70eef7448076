use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Watch,
    Lookup,
}

/// Lifecycle of a session: idle until started, then running in exactly one
/// mode until stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running(SessionMode),
}

/// Tracks the session lifecycle and rejects invalid transitions: a running
/// session must be stopped before another can start, and a stray stop is a
/// no-op.
#[derive(Debug)]
pub struct SessionFsm {
    state: SessionState,
}

impl SessionFsm {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    /// Enters `Running(mode)`. Returns false (and changes nothing) when a
    /// session is already active.
    pub fn start(&mut self, mode: SessionMode) -> bool {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Running(mode);
                debug!("[SessionFsm] Idle → Running({:?})", mode);
                true
            }
            SessionState::Running(active) => {
                warn!(
                    "[SessionFsm] start({:?}) rejected, {:?} session still active",
                    mode, active
                );
                false
            }
        }
    }

    /// Returns to `Idle`, reporting which mode was active, if any.
    pub fn stop(&mut self) -> Option<SessionMode> {
        match self.state {
            SessionState::Running(mode) => {
                self.state = SessionState::Idle;
                debug!("[SessionFsm] Running({:?}) → Idle", mode);
                Some(mode)
            }
            SessionState::Idle => {
                warn!("[SessionFsm] stop() with no active session");
                None
            }
        }
    }

    pub fn get_state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> Option<SessionMode> {
        match self.state {
            SessionState::Running(mode) => Some(mode),
            SessionState::Idle => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running(_))
    }
}

impl Default for SessionFsm {
    fn default() -> Self {
        Self::new()
    }
}
