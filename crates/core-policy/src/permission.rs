//! CRUDN permissions
//!
//! A permission is a 5-bit set, least significant bit first:
//! Create, Read, Update/Write, Delete, Notify. ACEs store the *granted* set,
//! requests carry exactly one *requested* value derived from the method.

use bitflags::bitflags;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PolicyError;

bitflags! {
    /// CRUDN permission bits
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct Permission: u16 {
        /// Create a resource
        const CREATE = 1 << 0;
        /// Read, observe, discover
        const READ = 1 << 1;
        /// Update or write
        const WRITE = 1 << 2;
        /// Delete a resource
        const DELETE = 1 << 3;
        /// Notify
        const NOTIFY = 1 << 4;
        /// Every CRUDN bit
        const FULL_CONTROL = Self::CREATE.bits()
            | Self::READ.bits()
            | Self::WRITE.bits()
            | Self::DELETE.bits()
            | Self::NOTIFY.bits();
    }
}

impl Permission {
    /// Requested permission for a request method
    ///
    /// PUT and POST both map to WRITE because the target may not exist yet.
    /// Anything unrecognised asks for full control.
    #[must_use]
    pub const fn from_method(method: Method) -> Self {
        match method {
            Method::Get => Self::READ,
            Method::Put | Method::Post => Self::WRITE,
            Method::Delete => Self::DELETE,
            Method::Other => Self::FULL_CONTROL,
        }
    }

    /// True iff every requested bit is present in the granted set
    #[must_use]
    pub const fn is_sufficient(granted: Self, requested: Self) -> bool {
        requested.bits() & granted.bits() == requested.bits()
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.bits())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let bits = u16::deserialize(deserializer)?;
        Self::from_bits(bits).ok_or_else(|| {
            serde::de::Error::custom(alloc::format!("unknown permission bits {:#x}", bits))
        })
    }
}

/// Request method of an inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// DELETE
    Delete,
    /// Any other method
    Other,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}

impl FromStr for Method {
    type Err = PolicyError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        [
            Self::Get,
            Self::Put,
            Self::Post,
            Self::Delete,
            Self::Other,
        ]
        .into_iter()
        .find(|method| {
            let name = alloc::format!("{}", method);
            name.eq_ignore_ascii_case(s.trim())
        })
        .ok_or_else(|| {
            PolicyError::SerializationError(alloc::format!("unknown method '{}'", s))
        })
    }
}
