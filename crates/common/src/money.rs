//! Money and discount value objects.

use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = 10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a whole-unit value.
    pub const fn from_units(units: i64) -> Self {
        Self { cents: units * 100 }
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-unit portion.
    pub fn units(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after whole units).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Returns the amount, or zero if it is negative.
    pub fn floor_zero(self) -> Money {
        if self.cents < 0 { Money::zero() } else { self }
    }

    /// Returns the amount reduced by `discount`, rounded half-up to the cent.
    pub fn discounted(self, discount: DiscountPercent) -> Money {
        let kept = i64::from(100 - discount.value());
        Money {
            cents: (self.cents * kept + 50).div_euclid(100),
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-{}.{:02}", self.units().abs(), self.cents_part())
        } else {
            write!(f, "{}.{:02}", self.units(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.cents -= rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> std::iter::Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// A validated discount percentage in the range 0–100.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "i32", into = "i32")]
pub struct DiscountPercent(u8);

impl DiscountPercent {
    /// Returns the percentage if it lies within 0–100.
    pub fn new(value: i32) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(DiscountPercent)
    }

    pub const fn none() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i32> for DiscountPercent {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        DiscountPercent::new(value).ok_or_else(|| format!("discount {value}% is outside 0-100"))
    }
}

impl From<DiscountPercent> for i32 {
    fn from(p: DiscountPercent) -> Self {
        i32::from(p.0)
    }
}

impl std::fmt::Display for DiscountPercent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.units(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);

        let mut c = a;
        c += b;
        c -= Money::from_cents(200);
        assert_eq!(c.cents(), 1300);
    }

    #[test]
    fn test_money_sum() {
        let amounts = [Money::from_units(10), Money::from_units(5), Money::from_cents(50)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total, Money::from_cents(1550));
        assert_eq!(Vec::<Money>::new().into_iter().sum::<Money>(), Money::zero());
    }

    #[test]
    fn test_floor_zero() {
        assert_eq!(Money::from_cents(-1).floor_zero(), Money::zero());
        assert_eq!(Money::from_cents(7).floor_zero(), Money::from_cents(7));
    }

    #[test]
    fn test_discount_on_round_amounts() {
        let fee = Money::from_units(100);
        let twenty = DiscountPercent::new(20).unwrap();
        assert_eq!(fee.discounted(twenty), Money::from_units(80));
        assert_eq!(fee.discounted(DiscountPercent::none()), fee);
        assert_eq!(fee.discounted(DiscountPercent::new(100).unwrap()), Money::zero());
    }

    #[test]
    fn test_discount_rounds_half_up() {
        // 33.33 * 0.85 = 28.3305
        let fee = Money::from_cents(3333);
        assert_eq!(fee.discounted(DiscountPercent::new(15).unwrap()).cents(), 2833);
        // 0.05 * 0.50 = 0.025
        let fee = Money::from_cents(5);
        assert_eq!(fee.discounted(DiscountPercent::new(50).unwrap()).cents(), 3);
    }

    #[test]
    fn test_discount_percent_range() {
        assert!(DiscountPercent::new(0).is_some());
        assert!(DiscountPercent::new(100).is_some());
        assert!(DiscountPercent::new(101).is_none());
        assert!(DiscountPercent::new(-1).is_none());
    }

    #[test]
    fn test_discount_percent_rejects_out_of_range_json() {
        assert!(serde_json::from_str::<DiscountPercent>("150").is_err());
        let p: DiscountPercent = serde_json::from_str("25").unwrap();
        assert_eq!(p.value(), 25);
    }
}
