//! Shared types for the membership reconciliation workspace.
//!
//! Everything that crosses the boundary between the persistence adapters and
//! the reconciliation engine lives here:
//! - Integer identifiers for families, seasons, members, workshops and payments
//! - `Money` (integer cents) and `DiscountPercent`
//! - Closed vocabularies for payment, season and membership statuses
//! - Record and snapshot shapes returned by the read port

pub mod ids;
pub mod money;
pub mod records;
pub mod vocab;

pub use ids::{FamilyId, MemberId, PaymentId, SeasonId, WorkshopId};
pub use money::{DiscountPercent, Money};
pub use records::{
    Family, FamilySnapshot, Member, Membership, MembershipSet, Payment, Revision, Season,
    SeasonSnapshot, WorkshopPrice, WorkshopRegistration,
};
pub use vocab::{MembershipStatus, ParseVocabError, PaymentStatus, PaymentType, SeasonStatus};
