use chrono::{DateTime, Utc};

/// Rs. per day for a chauffeur.
pub const DRIVER_DAILY_RATE: f64 = 1000.0;

const DAY_MS: i64 = 86_400_000;

/// Billed days: any started day counts in full. Zero when the return is
/// not after the pickup.
pub fn rental_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let ms = (end - start).num_milliseconds();
    if ms <= 0 {
        0
    } else {
        (ms + DAY_MS - 1) / DAY_MS
    }
}

pub fn daily_rate(car_price: f64, needs_driver: bool) -> f64 {
    car_price + if needs_driver { DRIVER_DAILY_RATE } else { 0.0 }
}

/// What a booking costs, itemised the way the confirmation step shows it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub days: i64,
    pub car_daily: f64,
    pub driver_daily: f64,
    pub driver_total: f64,
    pub total: f64,
}

impl Quote {
    pub fn new(car_price: f64, start: DateTime<Utc>, end: DateTime<Utc>, needs_driver: bool) -> Self {
        let days = rental_days(start, end);
        let driver_daily = if needs_driver { DRIVER_DAILY_RATE } else { 0.0 };
        Self {
            days,
            car_daily: car_price,
            driver_daily,
            driver_total: driver_daily * days as f64,
            total: (daily_rate(car_price, needs_driver) * days as f64).round(),
        }
    }
}

pub fn total_price(car_price: f64, start: DateTime<Utc>, end: DateTime<Utc>, needs_driver: bool) -> f64 {
    Quote::new(car_price, start, end, needs_driver).total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_three_days_with_driver() {
        assert_eq!(total_price(1000.0, at(1, 10), at(4, 10), true), 6000.0);
        assert_eq!(total_price(1000.0, at(1, 10), at(4, 10), false), 3000.0);
    }

    #[test]
    fn test_partial_days_round_up() {
        assert_eq!(rental_days(at(1, 10), at(1, 11)), 1);
        assert_eq!(rental_days(at(1, 10), at(3, 11)), 3);
        assert_eq!(rental_days(at(1, 10), at(1, 10) + Duration::days(2)), 2);
    }

    #[test]
    fn test_non_positive_span_is_free() {
        assert_eq!(rental_days(at(4, 10), at(1, 10)), 0);
        assert_eq!(total_price(2500.0, at(1, 10), at(1, 10), true), 0.0);
    }

    #[test]
    fn test_formula_holds_across_inputs() {
        for price in [0.0, 999.5, 2500.0, 4000.0] {
            for days in 1..=10 {
                for needs_driver in [false, true] {
                    let start = at(1, 9);
                    let end = start + Duration::days(days);
                    let expected = ((price + if needs_driver { 1000.0 } else { 0.0 }) * days as f64).round();
                    assert_eq!(total_price(price, start, end, needs_driver), expected);
                }
            }
        }
    }

    #[test]
    fn test_quote_itemises_driver() {
        let quote = Quote::new(3000.0, at(1, 10), at(3, 10), true);
        assert_eq!(quote.days, 2);
        assert_eq!(quote.driver_total, 2000.0);
        assert_eq!(quote.total, 8000.0);
    }
}
