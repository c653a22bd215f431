//! Identifier newtypes.
//!
//! Every entity in the relational store is keyed by a 64-bit integer. The
//! newtypes keep a `MemberId` from being passed where a `FamilyId` is expected,
//! and their `Ord` impls define the deterministic member ordering used for
//! discounts and fund allocation.

use serde::{Deserialize, Serialize};

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw database value.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw database value.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

integer_id!(
    /// Identifier of a family, the billing unit.
    FamilyId
);

integer_id!(
    /// Identifier of a season.
    SeasonId
);

integer_id!(
    /// Identifier of a family member.
    MemberId
);

integer_id!(
    /// Identifier of a workshop.
    WorkshopId
);

integer_id!(
    /// Identifier of a recorded payment.
    PaymentId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_ids_order_by_raw_value() {
        let mut ids = vec![MemberId::new(12), MemberId::new(3), MemberId::new(7)];
        ids.sort();
        assert_eq!(ids, vec![MemberId::new(3), MemberId::new(7), MemberId::new(12)]);
    }

    #[test]
    fn id_conversions_preserve_value() {
        let id = FamilyId::from(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&SeasonId::new(2024)).unwrap();
        assert_eq!(json, "2024");
        let parsed: SeasonId = serde_json::from_str("2024").unwrap();
        assert_eq!(parsed, SeasonId::new(2024));
    }
}
