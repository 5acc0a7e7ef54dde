//! Rental fee and overdue fine arithmetic.
//!
//! Pure date arithmetic over calendar dates; no clock reads, no side
//! effects. Callers decide which "today" applies; the fine actually
//! charged is always evaluated at the moment of return.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Rental cost for the planned period: days between borrow date and expected
/// return date times the book's daily fee. Zero for a same-day return.
///
/// `expected_return_date >= borrow_date` is a precondition enforced by the
/// borrowing lifecycle, not here.
pub fn rental_fee(borrow_date: NaiveDate, expected_return_date: NaiveDate, daily_fee: Decimal) -> Decimal {
    let days = (expected_return_date - borrow_date).num_days();
    Decimal::from(days) * daily_fee
}

/// Fine owed when `today` is past the expected return date, at a fixed
/// per-day rate. Zero when not overdue or when no expected date exists.
pub fn overdue_fine(
    expected_return_date: Option<NaiveDate>,
    today: NaiveDate,
    fine_per_day: Decimal,
) -> Decimal {
    let Some(expected) = expected_return_date else {
        return Decimal::ZERO;
    };

    let overdue_days = (today - expected).num_days();
    if overdue_days <= 0 {
        return Decimal::ZERO;
    }

    Decimal::from(overdue_days) * fine_per_day
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rental_fee_week() {
        let fee = rental_fee(date(2024, 9, 1), date(2024, 9, 8), dec!(1.50));
        assert_eq!(fee, dec!(10.50));
    }

    #[test]
    fn test_rental_fee_same_day_is_zero() {
        let fee = rental_fee(date(2024, 9, 1), date(2024, 9, 1), dec!(3.25));
        assert_eq!(fee, Decimal::ZERO);
    }

    #[test]
    fn test_rental_fee_linear_in_days() {
        let one_week = rental_fee(date(2024, 9, 1), date(2024, 9, 8), dec!(2.40));
        let two_weeks = rental_fee(date(2024, 9, 1), date(2024, 9, 15), dec!(2.40));
        assert_eq!(two_weeks, one_week * dec!(2));
    }

    #[test]
    fn test_no_fine_before_or_on_due_date() {
        let due = date(2024, 9, 10);
        assert_eq!(overdue_fine(Some(due), date(2024, 9, 5), dec!(2)), Decimal::ZERO);
        assert_eq!(overdue_fine(Some(due), due, dec!(2)), Decimal::ZERO);
    }

    #[test]
    fn test_fine_grows_per_day_past_due() {
        let due = date(2024, 9, 10);
        let rate = dec!(2);
        assert_eq!(overdue_fine(Some(due), date(2024, 9, 11), rate), dec!(2));
        assert_eq!(overdue_fine(Some(due), date(2024, 9, 12), rate), dec!(4));
        assert_eq!(overdue_fine(Some(due), date(2024, 9, 13), rate), dec!(6));
    }

    #[test]
    fn test_fine_without_expected_date_is_zero() {
        assert_eq!(overdue_fine(None, date(2024, 9, 13), dec!(2)), Decimal::ZERO);
    }

    #[test]
    fn test_week_rental_three_days_late() {
        // Book at 1.50/day borrowed for 7 days, returned 3 days late at
        // 2.00/day fine: 10.50 rental, 6.00 fine.
        let borrow = date(2024, 9, 1);
        let expected = date(2024, 9, 8);
        let returned = date(2024, 9, 11);

        assert_eq!(rental_fee(borrow, expected, dec!(1.50)), dec!(10.50));
        assert_eq!(overdue_fine(Some(expected), returned, dec!(2.00)), dec!(6.00));
    }
}
