//! Booking cost calculation
//!
//! Converts a rental window and an item's rate card into a price breakdown.
//! Durations are billed in started hours (minimum one). Rentals shorter than
//! a day use the hourly rate when the item has one; everything else is billed
//! per started day.

use crate::error::AppError;
use crate::models::{DateRange, RateCard};
use chrono::Duration;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Platform commission applied when no other policy is configured (percent)
pub const DEFAULT_SERVICE_FEE_PERCENT: Decimal = Decimal::TEN;

const MILLIS_PER_HOUR: i64 = 3_600_000;
const HOURS_PER_DAY: i64 = 24;

/// Price breakdown for a rental window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CostBreakdown {
    /// Rental charge before fees and deposit
    pub base_cost: Decimal,

    /// Refundable deposit
    pub security_deposit: Decimal,

    /// Platform commission on the base cost
    pub service_fee: Decimal,

    /// Delivery charge, when delivery was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_fee: Option<Decimal>,

    /// Amount the renter pays
    pub total_amount: Decimal,
}

/// Started hours in `duration`, never less than one.
///
/// A zero or negative duration is billed as one hour.
pub fn effective_hours(duration: Duration) -> i64 {
    let millis = duration.num_milliseconds();
    if millis <= 0 {
        return 1;
    }
    ((millis + MILLIS_PER_HOUR - 1) / MILLIS_PER_HOUR).max(1)
}

/// Started days covered by `hours`
pub fn rental_days(hours: i64) -> i64 {
    (hours.max(1) + HOURS_PER_DAY - 1) / HOURS_PER_DAY
}

/// Pricing rules for bookings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Commission as a percentage of the base cost
    pub service_fee_percent: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            service_fee_percent: DEFAULT_SERVICE_FEE_PERCENT,
        }
    }
}

impl PricingPolicy {
    /// Create a policy with a custom commission percentage
    pub fn new(service_fee_percent: Decimal) -> Self {
        Self {
            service_fee_percent,
        }
    }

    /// Rental charge for `range` before fees
    pub fn base_cost(&self, card: &RateCard, range: &DateRange) -> Decimal {
        let hours = effective_hours(range.duration());

        match card.hourly_rate {
            Some(hourly) if hours < HOURS_PER_DAY => hourly * Decimal::from(hours),
            _ => card.daily_rate * Decimal::from(rental_days(hours)),
        }
    }

    /// Commission on `base_cost`, rounded to cents
    pub fn service_fee(&self, base_cost: Decimal) -> Decimal {
        (base_cost * self.service_fee_percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Full price breakdown for renting under `card` during `range`
    pub fn calculate(
        &self,
        card: &RateCard,
        range: &DateRange,
        delivery_fee: Option<Decimal>,
    ) -> CostBreakdown {
        let base_cost = self.base_cost(card, range);
        let service_fee = self.service_fee(base_cost);
        let total_amount = base_cost
            + card.security_deposit
            + service_fee
            + delivery_fee.unwrap_or(Decimal::ZERO);

        CostBreakdown {
            base_cost,
            security_deposit: card.security_deposit,
            service_fee,
            delivery_fee,
            total_amount,
        }
    }
}

/// Price breakdown using the default 10% commission
pub fn calculate_booking_cost(
    card: &RateCard,
    range: &DateRange,
    delivery_fee: Option<Decimal>,
) -> CostBreakdown {
    PricingPolicy::default().calculate(card, range, delivery_fee)
}

/// Check a rental window against an item's minimum and maximum duration
pub fn check_rental_duration(
    range: &DateRange,
    min_days: i32,
    max_days: Option<i32>,
) -> Result<(), AppError> {
    let days = rental_days(effective_hours(range.duration()));

    if days < i64::from(min_days) {
        return Err(AppError::Validation(format!(
            "rental of {} day(s) is shorter than the minimum of {}",
            days, min_days
        )));
    }

    if let Some(max) = max_days {
        if days > i64::from(max) {
            return Err(AppError::Validation(format!(
                "rental of {} day(s) exceeds the maximum of {}",
                days, max
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn card() -> RateCard {
        RateCard {
            daily_rate: dec!(25),
            hourly_rate: Some(dec!(5)),
            security_deposit: dec!(50),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn range(duration: Duration) -> DateRange {
        DateRange::new(t0(), t0() + duration).unwrap()
    }

    #[test]
    fn test_effective_hours_rounds_up_with_minimum_of_one() {
        assert_eq!(effective_hours(Duration::zero()), 1);
        assert_eq!(effective_hours(Duration::minutes(30)), 1);
        assert_eq!(effective_hours(Duration::hours(1)), 1);
        assert_eq!(effective_hours(Duration::hours(1) + Duration::seconds(1)), 2);
        assert_eq!(effective_hours(Duration::minutes(23 * 60 + 1)), 24);
        assert_eq!(effective_hours(Duration::hours(48)), 48);
        assert_eq!(effective_hours(Duration::hours(-3)), 1);
    }

    #[test]
    fn test_effective_hours_matches_ceiling_for_whole_minutes() {
        for minutes in 0..(72 * 60) {
            let expected = ((minutes + 59) / 60).max(1);
            assert_eq!(effective_hours(Duration::minutes(minutes)), expected);
        }
    }

    #[test]
    fn test_two_day_rental() {
        let cost = calculate_booking_cost(&card(), &range(Duration::days(2)), None);
        assert_eq!(cost.base_cost, dec!(50));
        assert_eq!(cost.service_fee, dec!(5));
        assert_eq!(cost.total_amount, dec!(105));
        assert_eq!(cost.delivery_fee, None);
    }

    #[test]
    fn test_four_hour_rental_uses_hourly_rate() {
        let cost = calculate_booking_cost(&card(), &range(Duration::hours(4)), None);
        assert_eq!(cost.base_cost, dec!(20));
        assert_eq!(cost.service_fee, dec!(2));
        assert_eq!(cost.total_amount, dec!(72));
    }

    #[test]
    fn test_same_instant_charges_one_hour() {
        let cost = calculate_booking_cost(&card(), &range(Duration::zero()), None);
        assert_eq!(cost.base_cost, dec!(5));
        assert_eq!(cost.service_fee, dec!(0.5));
        assert_eq!(cost.total_amount, dec!(55.5));
    }

    #[test]
    fn test_delivery_fee_added_to_total() {
        let cost = calculate_booking_cost(&card(), &range(Duration::days(1)), Some(dec!(15)));
        assert_eq!(cost.base_cost, dec!(25));
        assert_eq!(cost.service_fee, dec!(2.5));
        assert_eq!(cost.delivery_fee, Some(dec!(15)));
        assert_eq!(cost.total_amount, dec!(92.5));
    }

    #[test]
    fn test_short_rental_without_hourly_rate_bills_a_day() {
        let daily_only = RateCard {
            hourly_rate: None,
            ..card()
        };
        let cost = calculate_booking_cost(&daily_only, &range(Duration::hours(3)), None);
        assert_eq!(cost.base_cost, dec!(25));
    }

    #[test]
    fn test_partial_day_rounds_up() {
        let cost = calculate_booking_cost(&card(), &range(Duration::hours(25)), None);
        assert_eq!(cost.base_cost, dec!(50));
    }

    #[test]
    fn test_service_fee_rounded_to_cents() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.service_fee(dec!(25.55)), dec!(2.56));
        assert_eq!(policy.service_fee(dec!(0.04)), dec!(0.00));
    }

    #[test]
    fn test_custom_service_fee_percent() {
        let policy = PricingPolicy::new(dec!(15));
        let cost = policy.calculate(&card(), &range(Duration::days(2)), None);
        assert_eq!(cost.service_fee, dec!(7.5));
        assert_eq!(cost.total_amount, dec!(107.5));
    }

    #[test]
    fn test_rental_days() {
        assert_eq!(rental_days(1), 1);
        assert_eq!(rental_days(24), 1);
        assert_eq!(rental_days(25), 2);
        assert_eq!(rental_days(0), 1);
    }

    #[test]
    fn test_check_rental_duration() {
        assert!(check_rental_duration(&range(Duration::days(2)), 1, Some(7)).is_ok());
        assert!(check_rental_duration(&range(Duration::days(2)), 3, None).is_err());
        assert!(check_rental_duration(&range(Duration::days(8)), 1, Some(7)).is_err());
        assert!(check_rental_duration(&range(Duration::hours(4)), 1, None).is_ok());
    }
}
