//! Session state and reply classification.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ lock() ┌────────────────┐ authOK ┌─────────────────┐ lockOK ┌────────┐
//! │ Idle │───────>│ Authenticating │───────>│ AwaitingLockAck │───────>│ Locked │
//! └──────┘        └────────────────┘        └─────────────────┘        └────────┘
//!    ^                    │ failure                 │ failure / timeout     │ unlock()
//!    │                    ↓                         ↓                       ↓
//!    └──────────────────────────── teardown ───────────────────────── ┌───────────┐
//!                                                                      │ Unlocking │
//!                                                                      └───────────┘
//! ```
//!
//! Both the foreground session and the background listener touch this state,
//! so every field sits behind one mutex. The lock is never held across an
//! await point.

use std::sync::{Mutex, MutexGuard, PoisonError};

use dlock_proto::Event;

use crate::LockError;

/// Phase of the lock protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPhase {
    /// No lock requested
    #[default]
    Idle,
    /// Auth frame sent, waiting for authOK
    Authenticating,
    /// Lock frame sent, waiting for the first reply
    AwaitingLockAck,
    /// Lock granted, listener owns the read half
    Locked,
    /// Unlock frame sent, waiting for the listener's outcome
    Unlocking,
}

#[derive(Debug, Default)]
struct Flags {
    /// Bumped on every dial; identifies the connection the flags describe
    epoch: u64,
    connected: bool,
    holding: bool,
    phase: LockPhase,
}

/// Flags shared between a session and its background listener.
#[derive(Debug, Default)]
pub struct SessionState {
    flags: Mutex<Flags>,
}

impl SessionState {
    /// Fresh state: not connected, not holding, idle.
    pub fn new() -> Self {
        Self::default()
    }

    fn flags(&self) -> MutexGuard<'_, Flags> {
        // Flags stay consistent even if a holder panicked mid-update
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True while a socket exists and has not been torn down.
    pub fn is_connected(&self) -> bool {
        self.flags().connected
    }

    /// True between a lock request and the end of the matching unlock.
    pub fn is_holding(&self) -> bool {
        self.flags().holding
    }

    /// Current protocol phase.
    pub fn phase(&self) -> LockPhase {
        self.flags().phase
    }

    /// Record a freshly dialed connection.
    ///
    /// Returns the connection's epoch, to be passed back to
    /// [`SessionState::reset_connection`].
    pub fn mark_connected(&self) -> u64 {
        let mut flags = self.flags();
        flags.epoch = flags.epoch.wrapping_add(1);
        flags.connected = true;
        flags.epoch
    }

    /// Move to `phase`.
    pub fn set_phase(&self, phase: LockPhase) {
        self.flags().phase = phase;
    }

    /// Claim the hold for a new lock request.
    ///
    /// Fails with [`LockError::AlreadyLocked`] if a request is already in
    /// flight or held.
    pub fn begin_hold(&self) -> Result<(), LockError> {
        let mut flags = self.flags();
        if flags.holding {
            return Err(LockError::AlreadyLocked);
        }
        flags.holding = true;
        flags.phase = LockPhase::AwaitingLockAck;
        Ok(())
    }

    /// Give up the hold after an unlock attempt, whatever its outcome.
    pub fn release_hold(&self) {
        let mut flags = self.flags();
        flags.holding = false;
        if !flags.connected {
            flags.phase = LockPhase::Idle;
        }
    }

    /// Session teardown: clear every flag. The epoch counter survives.
    pub fn reset(&self) {
        let mut flags = self.flags();
        *flags = Flags { epoch: flags.epoch, ..Flags::default() };
    }

    /// Teardown of the connection dialed at `epoch`.
    ///
    /// A no-op once a newer connection has been marked, so a late close of a
    /// stale connection cannot clear the flags of its successor.
    pub fn reset_connection(&self, epoch: u64) -> bool {
        let mut flags = self.flags();
        if flags.epoch != epoch {
            return false;
        }
        *flags = Flags { epoch, ..Flags::default() };
        true
    }
}

/// Outcome of the first reply to a lock request.
pub fn interpret_lock_reply(reply: Event) -> Result<(), LockError> {
    match reply {
        Event::LockOk => Ok(()),
        Event::OperateTimeout => Err(LockError::NotUnlockedInTime),
        Event::LockFail => Err(LockError::Congested),
        Event::AlreadyLocked => Err(LockError::AlreadyLocked),
        Event::NotFindLock => Err(LockError::NoSuchLock),
        other => Err(LockError::Busy { reply: other }),
    }
}

/// What the background listener does with an inbound event.
#[derive(Debug)]
pub enum ListenerStep {
    /// Informational; keep reading
    Continue,
    /// Terminal; close the connection and hand this outcome to `unlock()`
    Deliver(Result<(), LockError>),
    /// Terminal without an outcome; close the connection
    Stop,
}

/// Classify an event received after the lock was granted.
pub fn classify_listener_event(event: Event) -> ListenerStep {
    match event {
        Event::LockOk => ListenerStep::Continue,
        Event::UnlockOk => ListenerStep::Deliver(Ok(())),
        Event::NotFindLock => ListenerStep::Deliver(Err(LockError::NoSuchLock)),
        Event::OperateTimeout => ListenerStep::Deliver(Err(LockError::NotUnlockedInTime)),
        _ => ListenerStep::Stop,
    }
}
