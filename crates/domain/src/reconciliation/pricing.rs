//! Pricing resolution for one season.

use common::{DiscountPercent, Money, SeasonSnapshot, WorkshopId};

use super::ReconciliationError;

/// Resolves fees from a loaded season snapshot.
#[derive(Debug, Clone, Copy)]
pub struct PricingResolver<'a> {
    season: &'a SeasonSnapshot,
}

impl<'a> PricingResolver<'a> {
    pub fn new(season: &'a SeasonSnapshot) -> Self {
        Self { season }
    }

    pub fn season(&self) -> &'a SeasonSnapshot {
        self.season
    }

    /// Returns the base membership fee charged per member.
    pub fn resolve_membership_fee(&self) -> Result<Money, ReconciliationError> {
        let season = &self.season.season;
        if season.membership_amount.is_negative() {
            return Err(ReconciliationError::NegativeMembershipFee {
                season_id: season.id,
                fee: season.membership_amount,
            });
        }
        Ok(season.membership_amount)
    }

    /// Returns the price of `workshop_id` for this season.
    ///
    /// An unpriced workshop is an error, never a zero fee.
    pub fn resolve_workshop_fee(&self, workshop_id: WorkshopId) -> Result<Money, ReconciliationError> {
        let season_id = self.season.season.id;
        let price = self
            .season
            .price_for(workshop_id)
            .ok_or(ReconciliationError::PricingNotFound {
                workshop_id,
                season_id,
            })?;
        if price.amount.is_negative() {
            return Err(ReconciliationError::NegativeWorkshopPrice {
                season_id,
                workshop_id,
                amount: price.amount,
            });
        }
        Ok(price.amount)
    }

    /// Returns the discount applied to the membership fee of every
    /// additional family member.
    pub fn resolve_discount(&self) -> Result<DiscountPercent, ReconciliationError> {
        let season = &self.season.season;
        DiscountPercent::new(season.discount_percent).ok_or(
            ReconciliationError::DiscountOutOfRange {
                season_id: season.id,
                percent: season.discount_percent,
            },
        )
    }

    /// Checks every season parameter the fee computation depends on.
    pub fn validate(&self) -> Result<(), ReconciliationError> {
        let season = &self.season.season;
        if season.start_year > season.end_year {
            return Err(ReconciliationError::InvertedYears {
                season_id: season.id,
                start_year: season.start_year,
                end_year: season.end_year,
            });
        }
        self.resolve_membership_fee()?;
        self.resolve_discount()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::{Season, SeasonId, WorkshopPrice};

    use super::*;

    const SEASON: SeasonId = SeasonId::new(1);

    fn snapshot(season: Season, prices: &[(i64, i64)]) -> SeasonSnapshot {
        SeasonSnapshot {
            prices: prices
                .iter()
                .map(|(workshop, cents)| WorkshopPrice {
                    workshop_id: WorkshopId::new(*workshop),
                    season_id: season.id,
                    amount: Money::from_cents(*cents),
                })
                .collect(),
            season,
        }
    }

    #[test]
    fn test_membership_fee_is_the_season_amount() {
        let snapshot = snapshot(Season::new(SEASON, 2024, Money::from_units(100)), &[]);
        let pricing = PricingResolver::new(&snapshot);
        assert_eq!(pricing.resolve_membership_fee().unwrap(), Money::from_units(100));
    }

    #[test]
    fn test_negative_membership_fee_is_a_configuration_error() {
        let snapshot = snapshot(Season::new(SEASON, 2024, Money::from_cents(-1)), &[]);
        let err = PricingResolver::new(&snapshot)
            .resolve_membership_fee()
            .unwrap_err();
        assert!(matches!(err, ReconciliationError::NegativeMembershipFee { .. }));
    }

    #[test]
    fn test_workshop_fee_lookup() {
        let snapshot = snapshot(
            Season::new(SEASON, 2024, Money::from_units(100)),
            &[(4, 4500), (5, 3000)],
        );
        let pricing = PricingResolver::new(&snapshot);
        assert_eq!(
            pricing.resolve_workshop_fee(WorkshopId::new(5)).unwrap(),
            Money::from_cents(3000)
        );
    }

    #[test]
    fn test_unpriced_workshop_is_not_zero_priced() {
        let snapshot = snapshot(Season::new(SEASON, 2024, Money::from_units(100)), &[(4, 4500)]);
        let err = PricingResolver::new(&snapshot)
            .resolve_workshop_fee(WorkshopId::new(6))
            .unwrap_err();
        assert!(matches!(
            err,
            ReconciliationError::PricingNotFound { workshop_id, season_id }
                if workshop_id == WorkshopId::new(6) && season_id == SEASON
        ));
    }

    #[test]
    fn test_negative_workshop_price_is_rejected() {
        let snapshot = snapshot(Season::new(SEASON, 2024, Money::from_units(100)), &[(4, -10)]);
        let err = PricingResolver::new(&snapshot)
            .resolve_workshop_fee(WorkshopId::new(4))
            .unwrap_err();
        assert!(matches!(
            err,
            ReconciliationError::NegativeWorkshopPrice { workshop_id, .. }
                if workshop_id == WorkshopId::new(4)
        ));
    }

    #[test]
    fn test_discount_range() {
        let ok = snapshot(Season::new(SEASON, 2024, Money::from_units(100)).with_discount(20), &[]);
        assert_eq!(
            PricingResolver::new(&ok).resolve_discount().unwrap().value(),
            20
        );

        for percent in [-5, 101] {
            let bad = snapshot(
                Season::new(SEASON, 2024, Money::from_units(100)).with_discount(percent),
                &[],
            );
            let err = PricingResolver::new(&bad).resolve_discount().unwrap_err();
            assert!(matches!(err, ReconciliationError::DiscountOutOfRange { .. }));
        }
    }

    #[test]
    fn test_validate_checks_years() {
        let mut season = Season::new(SEASON, 2024, Money::from_units(100));
        season.end_year = 2023;
        let snapshot = snapshot(season, &[]);
        let err = PricingResolver::new(&snapshot).validate().unwrap_err();
        assert!(matches!(err, ReconciliationError::InvertedYears { .. }));
    }
}
