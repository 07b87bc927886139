//! Event tags carried in byte 0 of every frame.

use std::fmt;

/// Protocol event.
///
/// Tags are stable on the wire. Tag 0 is reserved and never valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Event {
    /// Server could not classify a request
    TypeError = 0x01,
    /// Authenticate with the shared secret (payload: secret)
    Auth = 0x02,
    /// Acquire a lock (payload: resource key)
    Lock = 0x03,
    /// Release the held lock
    Unlock = 0x04,
    /// Server could not decode a request
    DecodeFail = 0x05,
    /// Authentication accepted
    AuthOk = 0x06,
    /// Authentication rejected
    AuthFail = 0x07,
    /// Lock holder overstayed, or the lock expired
    OperateTimeout = 0x08,
    /// Lock acquired
    LockOk = 0x09,
    /// Congestion ahead, lock not obtained
    LockFail = 0x0A,
    /// Lock request repeated while already queued or held
    AlreadyLocked = 0x0B,
    /// Release confirmed
    UnlockOk = 0x0C,
    /// Unlock requested without a held lock
    NotFindLock = 0x0D,
}

impl Event {
    /// Every event, in tag order.
    pub const ALL: [Self; 13] = [
        Self::TypeError,
        Self::Auth,
        Self::Lock,
        Self::Unlock,
        Self::DecodeFail,
        Self::AuthOk,
        Self::AuthFail,
        Self::OperateTimeout,
        Self::LockOk,
        Self::LockFail,
        Self::AlreadyLocked,
        Self::UnlockOk,
        Self::NotFindLock,
    ];

    /// Parse a wire tag. Returns `None` for unknown tags.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(Self::TypeError),
            0x02 => Some(Self::Auth),
            0x03 => Some(Self::Lock),
            0x04 => Some(Self::Unlock),
            0x05 => Some(Self::DecodeFail),
            0x06 => Some(Self::AuthOk),
            0x07 => Some(Self::AuthFail),
            0x08 => Some(Self::OperateTimeout),
            0x09 => Some(Self::LockOk),
            0x0A => Some(Self::LockFail),
            0x0B => Some(Self::AlreadyLocked),
            0x0C => Some(Self::UnlockOk),
            0x0D => Some(Self::NotFindLock),
            _ => None,
        }
    }

    /// Wire tag.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Whether frames of this event carry a length-prefixed payload.
    pub fn carries_payload(self) -> bool {
        matches!(self, Self::Auth | Self::Lock)
    }

    /// Whether this event is sent by the client.
    pub fn is_request(self) -> bool {
        matches!(self, Self::Auth | Self::Lock | Self::Unlock)
    }

    /// Protocol name, as used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::TypeError => "typeError",
            Self::Auth => "auth",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::DecodeFail => "decodeFail",
            Self::AuthOk => "authOK",
            Self::AuthFail => "authFail",
            Self::OperateTimeout => "operateTimeout",
            Self::LockOk => "lockOK",
            Self::LockFail => "lockFail",
            Self::AlreadyLocked => "alreadyLocked",
            Self::UnlockOk => "unlockOK",
            Self::NotFindLock => "notFindLock",
        }
    }
}

impl TryFrom<u8> for Event {
    type Error = crate::ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::from_u8(tag).ok_or(crate::ProtocolError::UnrecognizedPacket { tag })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_their_position() {
        for (index, event) in Event::ALL.iter().enumerate() {
            assert_eq!(event.to_u8() as usize, index + 1);
            assert_eq!(Event::from_u8(event.to_u8()), Some(*event));
        }
    }

    #[test]
    fn reserved_and_unknown_tags_are_rejected() {
        assert_eq!(Event::from_u8(0x00), None);
        assert_eq!(Event::from_u8(0x0E), None);
        assert_eq!(Event::from_u8(0xFF), None);
        assert!(matches!(
            Event::try_from(0x42),
            Err(crate::ProtocolError::UnrecognizedPacket { tag: 0x42 })
        ));
    }

    #[test]
    fn only_auth_and_lock_carry_payloads() {
        let carriers: Vec<_> = Event::ALL.into_iter().filter(|e| e.carries_payload()).collect();
        assert_eq!(carriers, vec![Event::Auth, Event::Lock]);
    }
}
