//! Fee calculation for one family in one season.

use std::collections::BTreeSet;

use common::{FamilySnapshot, MemberId, Money, SeasonId, WorkshopId};
use serde::Serialize;

use super::{PricingResolver, ReconciliationError};

/// Fee of one workshop registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkshopFee {
    pub workshop_id: WorkshopId,
    pub amount: Money,
}

/// What one member owes for the season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberFee {
    pub member_id: MemberId,

    /// Membership component after the multi-member discount.
    pub membership_fee: Money,

    /// Amount taken off the membership component; zero for the first member.
    pub membership_discount: Money,

    /// Workshop components, never discounted, ordered by workshop.
    pub workshop_fees: Vec<WorkshopFee>,

    /// `membership_fee + Σ workshop_fees`.
    pub net: Money,
}

impl MemberFee {
    /// Amount owed before the discount.
    pub fn gross(&self) -> Money {
        self.net + self.membership_discount
    }

    pub fn workshop_total(&self) -> Money {
        self.workshop_fees.iter().map(|w| w.amount).sum()
    }
}

/// Per-member fees of a family, in allocation order, with the family totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    pub season_id: SeasonId,

    /// Members with intent, ordered by member id ascending.
    pub members: Vec<MemberFee>,

    pub gross_total: Money,
    pub discount_total: Money,
    pub net_total: Money,
    pub donation_credit: Money,

    /// `max(0, net_total − donation_credit)`.
    pub total_due: Money,
}

impl FeeBreakdown {
    /// Returns true if no member has intent for the season.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member(&self, member_id: MemberId) -> Option<&MemberFee> {
        self.members.iter().find(|m| m.member_id == member_id)
    }
}

/// Computes what each member of a family owes for a season.
///
/// Members are ordered by identity, never by mutable attributes, so that the
/// same inputs always assign the discount to the same members.
#[derive(Debug, Clone, Copy)]
pub struct FeeCalculator<'a> {
    pricing: PricingResolver<'a>,
}

impl<'a> FeeCalculator<'a> {
    pub fn new(pricing: PricingResolver<'a>) -> Self {
        Self { pricing }
    }

    /// Calculates the breakdown for `family`, skipping members in `excluded`
    /// (members whose membership is cancelled).
    pub fn calculate(
        &self,
        family: &FamilySnapshot,
        excluded: &BTreeSet<MemberId>,
    ) -> Result<FeeBreakdown, ReconciliationError> {
        let season_id = self.pricing.season().season.id;
        let membership_fee = self.pricing.resolve_membership_fee()?;
        let discount = self.pricing.resolve_discount()?;
        let discounted_fee = membership_fee.discounted(discount);

        let mut intent: Vec<_> = family
            .members
            .iter()
            .filter(|m| m.has_intent(season_id) && !excluded.contains(&m.id))
            .collect();
        intent.sort_by_key(|m| m.id);

        let mut members = Vec::with_capacity(intent.len());
        for (position, member) in intent.into_iter().enumerate() {
            let mut workshop_ids: Vec<_> = member
                .registrations_for(season_id)
                .map(|r| r.workshop_id)
                .collect();
            workshop_ids.sort();

            let workshop_fees = workshop_ids
                .into_iter()
                .map(|workshop_id| -> Result<WorkshopFee, ReconciliationError> {
                    Ok(WorkshopFee {
                        workshop_id,
                        amount: self.pricing.resolve_workshop_fee(workshop_id)?,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            // Only the first member in order pays the full membership fee
            let charged = if position == 0 {
                membership_fee
            } else {
                discounted_fee
            };
            let workshop_total: Money = workshop_fees.iter().map(|w| w.amount).sum();

            members.push(MemberFee {
                member_id: member.id,
                membership_fee: charged,
                membership_discount: membership_fee - charged,
                workshop_fees,
                net: charged + workshop_total,
            });
        }

        let net_total: Money = members.iter().map(|m| m.net).sum();
        let discount_total: Money = members.iter().map(|m| m.membership_discount).sum();
        let donation_credit = family.donation_credit.floor_zero();

        Ok(FeeBreakdown {
            season_id,
            gross_total: net_total + discount_total,
            discount_total,
            net_total,
            donation_credit,
            total_due: (net_total - donation_credit).floor_zero(),
            members,
        })
    }
}
