//! Typed entity IDs.
//!
//! Each entity gets its own UUID newtype so a `RequestId` can never be
//! handed to a function expecting an `ApprovalId`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! typed_ids {
    ($($(#[$meta:meta])* $name:ident;)+) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generates a fresh UUID v7 ID. Later IDs sort after earlier ones.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Borrows the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<Uuid>().map(Self)
            }
        }
    )+};
}

typed_ids! {
    /// An employee, manager or administrator.
    UserId;
    /// A department in the org chart.
    DepartmentId;
    /// A position in the org chart.
    PositionId;
    /// A leave type such as vacation or sick leave.
    LeaveTypeId;
    /// A policy assigning a leave type to a user.
    PolicyId;
    /// A (user, leave type, year) balance row.
    BalanceId;
    /// An entry in the balance ledger.
    TransactionId;
    /// A pending hold against a balance.
    ReservationId;
    /// A leave request.
    RequestId;
    /// One approval step of a request.
    ApprovalId;
    /// A blackout rule.
    BlackoutId;
}
