//! Family statement built from a reconciliation run.

use common::{
    FamilyId, FamilySnapshot, MemberId, MembershipStatus, Money, SeasonId, SeasonSnapshot,
};
use serde::Serialize;

use super::{FundingOutcome, Reconciliation};

/// One member's line on a family statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementLine {
    pub member_id: MemberId,
    pub member_name: String,
    pub membership_fee: Money,
    pub membership_discount: Money,
    pub workshop_total: Money,
    pub net: Money,
    pub status: MembershipStatus,
}

/// Summary of a reconciliation run for one family and season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyStatement {
    pub family_id: FamilyId,
    pub family_name: String,
    pub season_id: SeasonId,
    pub season_label: String,
    pub outcome: FundingOutcome,
    pub lines: Vec<StatementLine>,
    pub gross_total: Money,
    pub discount_total: Money,
    pub donation_credit: Money,
    pub total_due: Money,
    pub total_received: Money,
    pub balance_due: Money,
    pub credit: Money,
}

impl FamilyStatement {
    pub fn new(
        family: &FamilySnapshot,
        season: &SeasonSnapshot,
        reconciliation: &Reconciliation,
    ) -> Self {
        let name_of = |member_id: MemberId| {
            family
                .member(member_id)
                .map(|m| format!("{} {}", m.first_name, m.last_name).trim().to_string())
                .unwrap_or_default()
        };

        let mut lines: Vec<StatementLine> = reconciliation
            .fees
            .members
            .iter()
            .map(|fee| StatementLine {
                member_id: fee.member_id,
                member_name: name_of(fee.member_id),
                membership_fee: fee.membership_fee,
                membership_discount: fee.membership_discount,
                workshop_total: fee.workshop_total(),
                net: fee.net,
                status: reconciliation
                    .status_of(fee.member_id)
                    .unwrap_or_default(),
            })
            .collect();

        // Cancelled members owe nothing but stay visible.
        lines.extend(
            reconciliation
                .statuses
                .iter()
                .filter(|(_, status)| status.is_cancelled())
                .map(|(member_id, status)| StatementLine {
                    member_id: *member_id,
                    member_name: name_of(*member_id),
                    membership_fee: Money::zero(),
                    membership_discount: Money::zero(),
                    workshop_total: Money::zero(),
                    net: Money::zero(),
                    status: *status,
                }),
        );
        lines.sort_by_key(|line| line.member_id);

        let fees = &reconciliation.fees;
        Self {
            family_id: reconciliation.family_id,
            family_name: family.family.name.clone(),
            season_id: reconciliation.season_id,
            season_label: season.season.label(),
            outcome: reconciliation.outcome,
            lines,
            gross_total: fees.gross_total,
            discount_total: fees.discount_total,
            donation_credit: fees.donation_credit,
            total_due: fees.total_due,
            total_received: reconciliation.payments.total_received,
            balance_due: reconciliation.balance_due,
            credit: reconciliation.credit,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use common::{Family, Member, MembershipSet, Payment, PaymentId, Season};

    use super::*;
    use crate::reconciliation::StatusReconciler;

    const FAMILY: FamilyId = FamilyId::new(3);
    const SEASON: SeasonId = SeasonId::new(7);

    #[test]
    fn test_statement_lists_every_member_with_a_row() {
        let season = SeasonSnapshot {
            season: Season::new(SEASON, 2024, Money::from_units(100)).with_discount(20),
            prices: vec![],
        };
        let mut first = Member::new(MemberId::new(1), FAMILY, "Ana").requesting_membership();
        first.last_name = "Costa".to_string();
        let family = FamilySnapshot {
            family: Family::new(FAMILY, "Costa"),
            season_id: SEASON,
            members: vec![
                first,
                Member::new(MemberId::new(2), FAMILY, "Rui").requesting_membership(),
                Member::new(MemberId::new(3), FAMILY, "Ines").requesting_membership(),
            ],
            donation_credit: Money::from_units(10),
        };
        let mut current = MembershipSet::empty(FAMILY, SEASON);
        current
            .statuses
            .insert(MemberId::new(3), MembershipStatus::Cancelled);
        let payments = [Payment::completed(
            PaymentId::new(1),
            FAMILY,
            SEASON,
            Money::from_units(200),
            Utc.with_ymd_and_hms(2024, 9, 15, 0, 0, 0).unwrap(),
        )];

        let reconciliation = StatusReconciler::new(&season)
            .reconcile(&family, &payments, &current)
            .unwrap();
        let statement = FamilyStatement::new(&family, &season, &reconciliation);

        assert_eq!(statement.season_label, "2024-2025");
        assert_eq!(statement.lines.len(), 3);
        assert_eq!(statement.lines[0].member_name, "Ana Costa");
        assert_eq!(statement.lines[1].membership_discount, Money::from_units(20));
        assert_eq!(statement.lines[2].status, MembershipStatus::Cancelled);
        assert_eq!(statement.lines[2].net, Money::zero());
        assert_eq!(statement.total_due, Money::from_units(170));
        assert_eq!(statement.credit, Money::from_units(30));
        assert_eq!(statement.balance_due, Money::zero());

        let json = serde_json::to_value(&statement).unwrap();
        assert_eq!(json["outcome"], "fully_funded");
    }
}
