//! Record and snapshot shapes loaded by the read port.
//!
//! A reconciliation run loads these once, computes over them without mutation
//! and discards them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    FamilyId, MemberId, MembershipStatus, Money, PaymentId, PaymentStatus, PaymentType, SeasonId,
    SeasonStatus, WorkshopId,
};

/// A yearly operating period with its own pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub start_year: i32,
    pub end_year: i32,
    pub status: SeasonStatus,

    /// Base membership fee charged per member.
    pub membership_amount: Money,

    /// Raw discount percentage for the second and later members of a family.
    /// Validated by the pricing resolver, not here.
    pub discount_percent: i32,

    /// Donations accumulated over the whole season.
    pub total_donations: Money,
}

impl Season {
    /// Creates an active season with no discount and no donations.
    pub fn new(id: SeasonId, start_year: i32, membership_amount: Money) -> Self {
        Self {
            id,
            start_year,
            end_year: start_year + 1,
            status: SeasonStatus::Active,
            membership_amount,
            discount_percent: 0,
            total_donations: Money::zero(),
        }
    }

    pub fn with_discount(mut self, percent: i32) -> Self {
        self.discount_percent = percent;
        self
    }

    pub fn with_status(mut self, status: SeasonStatus) -> Self {
        self.status = status;
        self
    }

    /// Human-readable label, e.g. `2024-2025`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.start_year, self.end_year)
    }
}

/// Price of one workshop in one season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopPrice {
    pub workshop_id: WorkshopId,
    pub season_id: SeasonId,
    pub amount: Money,
}

/// A season together with every workshop price defined for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonSnapshot {
    pub season: Season,
    pub prices: Vec<WorkshopPrice>,
}

impl SeasonSnapshot {
    /// Returns the price row for `workshop_id`, if one exists for this season.
    pub fn price_for(&self, workshop_id: WorkshopId) -> Option<&WorkshopPrice> {
        self.prices
            .iter()
            .find(|p| p.workshop_id == workshop_id && p.season_id == self.season.id)
    }
}

/// Contact data of a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Family {
    pub fn new(id: FamilyId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            phone: None,
        }
    }
}

/// A member's enrollment in a workshop for a season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopRegistration {
    pub member_id: MemberId,
    pub workshop_id: WorkshopId,
    pub season_id: SeasonId,
}

/// A family member with the registrations of one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub family_id: FamilyId,
    pub first_name: String,
    pub last_name: String,

    /// Implicit membership intent, independent of any workshop.
    pub membership_requested: bool,

    pub registrations: Vec<WorkshopRegistration>,
}

impl Member {
    /// Creates a member with no intent for any season.
    pub fn new(id: MemberId, family_id: FamilyId, first_name: impl Into<String>) -> Self {
        Self {
            id,
            family_id,
            first_name: first_name.into(),
            last_name: String::new(),
            membership_requested: false,
            registrations: Vec::new(),
        }
    }

    pub fn requesting_membership(mut self) -> Self {
        self.membership_requested = true;
        self
    }

    pub fn registered_for(mut self, workshop_id: WorkshopId, season_id: SeasonId) -> Self {
        self.registrations.push(WorkshopRegistration {
            member_id: self.id,
            workshop_id,
            season_id,
        });
        self
    }

    /// Returns the registrations that belong to `season_id`.
    pub fn registrations_for(
        &self,
        season_id: SeasonId,
    ) -> impl Iterator<Item = &WorkshopRegistration> {
        self.registrations
            .iter()
            .filter(move |r| r.season_id == season_id)
    }

    /// Returns true if the member is eligible for a status in `season_id`.
    pub fn has_intent(&self, season_id: SeasonId) -> bool {
        self.membership_requested || self.registrations_for(season_id).next().is_some()
    }
}

/// A family with its members, as loaded for one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilySnapshot {
    pub family: Family,
    pub season_id: SeasonId,
    pub members: Vec<Member>,

    /// Share of the season's donations credited to this family.
    pub donation_credit: Money,
}

impl FamilySnapshot {
    pub fn member(&self, member_id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == member_id)
    }
}

/// A recorded payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub family_id: FamilyId,
    pub season_id: SeasonId,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Creates a completed payment settled at `at`.
    pub fn completed(
        id: PaymentId,
        family_id: FamilyId,
        season_id: SeasonId,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            family_id,
            season_id,
            payment_type: PaymentType::Transfer,
            status: PaymentStatus::Completed,
            amount,
            created_at: at,
            updated_at: at,
            settled_at: Some(at),
        }
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = status;
        if status != PaymentStatus::Completed {
            self.settled_at = None;
        }
        self
    }

    /// Date the payment settled; falls back to the last update when unset.
    pub fn settlement_date(&self) -> DateTime<Utc> {
        self.settled_at.unwrap_or(self.updated_at)
    }
}

/// A persisted membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub member_id: MemberId,
    pub season_id: SeasonId,
    pub status: MembershipStatus,
}

/// Optimistic-concurrency counter of a family+season membership set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(i64);

impl Revision {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Revision of a membership set that has never been written.
    pub fn initial() -> Self {
        Self(0)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every membership row of one family for one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSet {
    pub family_id: FamilyId,
    pub season_id: SeasonId,
    pub revision: Revision,
    pub statuses: BTreeMap<MemberId, MembershipStatus>,
}

impl MembershipSet {
    /// An unwritten set for the given key.
    pub fn empty(family_id: FamilyId, season_id: SeasonId) -> Self {
        Self {
            family_id,
            season_id,
            revision: Revision::initial(),
            statuses: BTreeMap::new(),
        }
    }

    pub fn status_of(&self, member_id: MemberId) -> Option<MembershipStatus> {
        self.statuses.get(&member_id).copied()
    }

    /// Rows a reconciliation run must keep as they are, including rows of
    /// members who have since left the family.
    pub fn carried_over(&self) -> BTreeMap<MemberId, MembershipStatus> {
        self.statuses
            .iter()
            .filter(|(_, status)| !status.is_reconcilable())
            .map(|(member_id, status)| (*member_id, *status))
            .collect()
    }

    /// Rows in member order.
    pub fn rows(&self) -> Vec<Membership> {
        self.statuses
            .iter()
            .map(|(member_id, status)| Membership {
                member_id: *member_id,
                season_id: self.season_id,
                status: *status,
            })
            .collect()
    }
}
