use serde::Deserialize;

use super::booking::Booking;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingStats {
    pub pending: u64,
    pub completed: u64,
    pub cancelled: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_cars: u64,
    pub total_bookings: u64,
    pub total_revenue: f64,
    pub booking_stats: BookingStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub recent_bookings: Vec<Booking>,
    /// Older servers put the list here instead.
    pub bookings: Vec<Booking>,
}

impl DashboardData {
    pub fn recent(&self) -> &[Booking] {
        if self.recent_bookings.is_empty() {
            &self.bookings
        } else {
            &self.recent_bookings
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_stats_default_to_zero() {
        let data: DashboardData = serde_json::from_value(serde_json::json!({
            "stats": { "totalUsers": 4, "bookingStats": { "pending": 2 } }
        }))
        .unwrap();

        assert_eq!(data.stats.total_users, 4);
        assert_eq!(data.stats.total_cars, 0);
        assert_eq!(data.stats.booking_stats.pending, 2);
        assert_eq!(data.stats.booking_stats.cancelled, 0);
        assert!(data.recent().is_empty());
    }
}
