use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::db::user::UserCore;

/// Different privilege levels, in increasing order.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Member = 0,
    Staff = 1,
}

impl Rights {
    /// The rights a user currently holds.
    pub fn of(user: &UserCore) -> Self {
        if user.is_staff {
            Self::Staff
        } else {
            Self::Member
        }
    }
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Member => "member",
                Self::Staff => "staff",
            }
        )
    }
}

/// A level of access a route can demand.
pub trait Role {
    /// The minimum rights needed.
    const RIGHTS: Rights;
}

/// Any logged-in user.
pub struct Member;

impl Role for Member {
    const RIGHTS: Rights = Rights::Member;
}

/// A logged-in staff user.
pub struct Staff;

impl Role for Staff {
    const RIGHTS: Rights = Rights::Staff;
}
