//! Aggregation of a family's payments for one season.

use chrono::{DateTime, Utc};
use common::{FamilyId, Money, Payment, PaymentId, PaymentStatus, SeasonId};
use serde::Serialize;

/// A payment that counts toward funds received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountedPayment {
    pub payment_id: PaymentId,
    pub amount: Money,
    pub settled_at: DateTime<Utc>,
}

/// Funds received by a family for a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    pub season_id: SeasonId,

    /// Counted payments ordered by settlement date, ties broken by payment id.
    pub counted: Vec<CountedPayment>,

    pub total_received: Money,

    pub excluded_cancelled: usize,
    pub excluded_pending: usize,
    pub excluded_other_season: usize,
    pub excluded_other_family: usize,
}

impl PaymentSummary {
    pub fn excluded(&self) -> usize {
        self.excluded_cancelled
            + self.excluded_pending
            + self.excluded_other_season
            + self.excluded_other_family
    }
}

/// Sums the completed payments of one family for one season.
///
/// Payments tagged with another season are excluded, not corrected.
#[derive(Debug, Clone, Copy)]
pub struct PaymentAggregator {
    family_id: FamilyId,
    season_id: SeasonId,
}

impl PaymentAggregator {
    pub fn new(family_id: FamilyId, season_id: SeasonId) -> Self {
        Self {
            family_id,
            season_id,
        }
    }

    pub fn aggregate(&self, payments: &[Payment]) -> PaymentSummary {
        let mut summary = PaymentSummary {
            season_id: self.season_id,
            counted: Vec::new(),
            total_received: Money::zero(),
            excluded_cancelled: 0,
            excluded_pending: 0,
            excluded_other_season: 0,
            excluded_other_family: 0,
        };

        for payment in payments {
            if payment.family_id != self.family_id {
                summary.excluded_other_family += 1;
                continue;
            }
            if payment.season_id != self.season_id {
                summary.excluded_other_season += 1;
                continue;
            }
            match payment.status {
                PaymentStatus::Completed => summary.counted.push(CountedPayment {
                    payment_id: payment.id,
                    amount: payment.amount,
                    settled_at: payment.settlement_date(),
                }),
                PaymentStatus::Cancelled => summary.excluded_cancelled += 1,
                PaymentStatus::Pending => summary.excluded_pending += 1,
            }
        }

        summary.counted.sort_by(|a, b| {
            a.settled_at
                .cmp(&b.settled_at)
                .then(a.payment_id.cmp(&b.payment_id))
        });
        summary.total_received = summary.counted.iter().map(|p| p.amount).sum();
        summary
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const FAMILY: FamilyId = FamilyId::new(1);
    const SEASON: SeasonId = SeasonId::new(1);

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, day, 9, 0, 0).unwrap()
    }

    fn completed(id: i64, units: i64, day: u32) -> Payment {
        Payment::completed(
            PaymentId::new(id),
            FAMILY,
            SEASON,
            Money::from_units(units),
            at(day),
        )
    }

    #[test]
    fn test_sums_completed_payments() {
        let payments = vec![completed(1, 50, 1), completed(2, 25, 2)];
        let summary = PaymentAggregator::new(FAMILY, SEASON).aggregate(&payments);
        assert_eq!(summary.total_received, Money::from_units(75));
        assert_eq!(summary.excluded(), 0);
    }

    #[test]
    fn test_cancelled_payment_never_counts() {
        let without = vec![completed(1, 50, 1)];
        let with = vec![
            completed(1, 50, 1),
            completed(2, 10_000, 2).with_status(PaymentStatus::Cancelled),
        ];
        let aggregator = PaymentAggregator::new(FAMILY, SEASON);

        let a = aggregator.aggregate(&without);
        let b = aggregator.aggregate(&with);

        assert_eq!(a.total_received, b.total_received);
        assert_eq!(a.counted, b.counted);
        assert_eq!(b.excluded_cancelled, 1);
    }

    #[test]
    fn test_pending_payment_is_informational() {
        let payments = vec![completed(1, 40, 1).with_status(PaymentStatus::Pending)];
        let summary = PaymentAggregator::new(FAMILY, SEASON).aggregate(&payments);
        assert_eq!(summary.total_received, Money::zero());
        assert_eq!(summary.excluded_pending, 1);
    }

    #[test]
    fn test_other_season_and_family_are_excluded() {
        let mut other_season = completed(1, 40, 1);
        other_season.season_id = SeasonId::new(2);
        let mut other_family = completed(2, 40, 1);
        other_family.family_id = FamilyId::new(2);

        let summary =
            PaymentAggregator::new(FAMILY, SEASON).aggregate(&[other_season, other_family]);

        assert_eq!(summary.total_received, Money::zero());
        assert_eq!(summary.excluded_other_season, 1);
        assert_eq!(summary.excluded_other_family, 1);
    }

    #[test]
    fn test_counted_in_settlement_order_with_id_tiebreak() {
        let payments = vec![completed(7, 10, 3), completed(5, 10, 3), completed(9, 10, 1)];
        let summary = PaymentAggregator::new(FAMILY, SEASON).aggregate(&payments);
        let order: Vec<_> = summary.counted.iter().map(|p| p.payment_id).collect();
        assert_eq!(
            order,
            vec![PaymentId::new(9), PaymentId::new(5), PaymentId::new(7)]
        );
    }
}
