//! Access decisions
//!
//! A decision is a sum type: [`Decision::Granted`], [`Decision::Denied`] with
//! one [`DenialReason`], or the transient [`Decision::WaitingForAms`]. The
//! legacy single-word bitmask encoding exists only at the wire boundary
//! ([`Decision::to_wire`] / [`Decision::from_wire`]).

use core::fmt;

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialReason {
    /// Generic denial
    NoReasonGiven,
    /// A matching ACE exists but does not grant every requested bit
    InsufficientPermission,
    /// No ACE exists for the subject
    SubjectNotFound,
    /// The subject has ACEs but none lists the resource
    ResourceNotFound,
    /// A matching ACE exists but the current time is outside its windows
    InvalidPeriod,
    /// Engine busy, caller contract violation or internal failure
    PolicyEngineError,
    /// Delegation to the access management service failed
    AmsServiceError,
}

impl DenialReason {
    /// Rank of the local-decision reasons, from least to most specific
    ///
    /// Used to report the furthest stage any ACE reached when several ACEs
    /// of one subject are visited. Reasons outside the local procedure rank 0.
    #[must_use]
    pub const fn specificity(self) -> u8 {
        match self {
            Self::SubjectNotFound => 1,
            Self::ResourceNotFound => 2,
            Self::InvalidPeriod => 3,
            Self::InsufficientPermission => 4,
            _ => 0,
        }
    }

    const fn wire_bits(self) -> u16 {
        match self {
            Self::NoReasonGiven => 0,
            Self::InsufficientPermission => wire::INSUFFICIENT_PERMISSION,
            Self::SubjectNotFound => wire::SUBJECT_NOT_FOUND,
            Self::ResourceNotFound => wire::RESOURCE_NOT_FOUND,
            Self::InvalidPeriod => wire::INVALID_PERIOD,
            Self::PolicyEngineError => wire::POLICY_ENGINE_ERROR,
            Self::AmsServiceError => wire::AMS_SERVICE,
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoReasonGiven => "no reason given",
            Self::InsufficientPermission => "insufficient permission",
            Self::SubjectNotFound => "subject not found",
            Self::ResourceNotFound => "resource not found",
            Self::InvalidPeriod => "outside valid period",
            Self::PolicyEngineError => "policy engine error",
            Self::AmsServiceError => "access management service error",
        };
        f.write_str(text)
    }
}

/// Outcome of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Request may proceed
    Granted,
    /// Request is refused
    Denied(DenialReason),
    /// Not terminal: the final decision arrives through the response sink
    WaitingForAms,
}

/// Legacy bitmask values used on the wire
pub mod wire {
    /// Access granted
    pub const GRANTED: u16 = 1 << 0;
    /// Access denied
    pub const DENIED: u16 = 1 << 1;
    /// Reason: insufficient permission
    pub const INSUFFICIENT_PERMISSION: u16 = 1 << 2;
    /// Reason: subject not found
    pub const SUBJECT_NOT_FOUND: u16 = 1 << 3;
    /// Reason: resource not found
    pub const RESOURCE_NOT_FOUND: u16 = 1 << 4;
    /// Reason: policy engine error
    pub const POLICY_ENGINE_ERROR: u16 = 1 << 5;
    /// Reason: invalid period
    pub const INVALID_PERIOD: u16 = 1 << 6;
    /// Waiting for a delegated decision
    pub const WAITING: u16 = 1 << 7;
    /// Access management service flag
    pub const AMS_SERVICE: u16 = 1 << 8;
    /// Bits that carry a local denial reason
    pub const REASON_MASK: u16 = INSUFFICIENT_PERMISSION
        | INVALID_PERIOD
        | SUBJECT_NOT_FOUND
        | RESOURCE_NOT_FOUND
        | POLICY_ENGINE_ERROR;
}

impl Decision {
    /// Shorthand for `Denied(PolicyEngineError)`
    pub const ENGINE_ERROR: Self = Self::Denied(DenialReason::PolicyEngineError);

    /// Shorthand for `Denied(AmsServiceError)`
    pub const AMS_ERROR: Self = Self::Denied(DenialReason::AmsServiceError);

    /// True only for `Granted`
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// True for `Granted` and every `Denied`
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::WaitingForAms)
    }

    /// Denial reason, if any
    #[must_use]
    pub const fn reason(&self) -> Option<DenialReason> {
        match self {
            Self::Denied(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Encode as the legacy bitmask
    #[must_use]
    pub const fn to_wire(&self) -> u16 {
        match self {
            Self::Granted => wire::GRANTED,
            Self::Denied(reason) => wire::DENIED | reason.wire_bits(),
            Self::WaitingForAms => wire::WAITING | wire::AMS_SERVICE,
        }
    }

    /// Decode a legacy bitmask
    ///
    /// Returns `None` for values that no decision encodes to.
    #[must_use]
    pub fn from_wire(bits: u16) -> Option<Self> {
        let decision = match bits {
            wire::GRANTED => Self::Granted,
            b if b == wire::WAITING | wire::AMS_SERVICE => Self::WaitingForAms,
            b if b & wire::DENIED == wire::DENIED => {
                let reason = match b & !wire::DENIED {
                    0 => DenialReason::NoReasonGiven,
                    wire::INSUFFICIENT_PERMISSION => DenialReason::InsufficientPermission,
                    wire::SUBJECT_NOT_FOUND => DenialReason::SubjectNotFound,
                    wire::RESOURCE_NOT_FOUND => DenialReason::ResourceNotFound,
                    wire::INVALID_PERIOD => DenialReason::InvalidPeriod,
                    wire::POLICY_ENGINE_ERROR => DenialReason::PolicyEngineError,
                    wire::AMS_SERVICE => DenialReason::AmsServiceError,
                    _ => return None,
                };
                Self::Denied(reason)
            }
            _ => return None,
        };
        Some(decision)
    }

    /// Legacy reason code: the wire value masked with [`wire::REASON_MASK`]
    #[must_use]
    pub const fn reason_code(&self) -> u16 {
        self.to_wire() & wire::REASON_MASK
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => f.write_str("granted"),
            Self::Denied(reason) => write!(f, "denied ({})", reason),
            Self::WaitingForAms => f.write_str("waiting for access management service"),
        }
    }
}
