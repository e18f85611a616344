use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Coordinates the map picker can produce. `0,0` is what an unset
    /// picker reports, so it counts as missing.
    pub fn is_set(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && self.lat != 0.0 && self.lng != 0.0
    }

    /// Fallback address text, e.g. `Location at 27.7154, 85.3123`.
    pub fn describe(&self, prefix: &str) -> String {
        format!("{} at {:.4}, {:.4}", prefix, self.lat, self.lng)
    }
}

/// Rental office; default pickup point and origin of directions.
pub const OFFICE_LOCATION: LatLng = LatLng::new(27.7615, 85.3365);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub id: u32,
    pub name: &'static str,
    pub coords: LatLng,
}

pub const LANDMARKS: &[Landmark] = &[
    Landmark { id: 1, name: "Thamel", coords: LatLng::new(27.7154, 85.3123) },
    Landmark { id: 2, name: "New Road", coords: LatLng::new(27.7041, 85.3131) },
    Landmark { id: 3, name: "Durbar Marg", coords: LatLng::new(27.7127, 85.3197) },
    Landmark { id: 4, name: "Sundhara", coords: LatLng::new(27.7016, 85.3139) },
    Landmark { id: 5, name: "Putalisadak", coords: LatLng::new(27.7041, 85.3237) },
    Landmark { id: 6, name: "Koteshwor", coords: LatLng::new(27.6795, 85.3495) },
    Landmark { id: 7, name: "Balaju", coords: LatLng::new(27.7359, 85.3005) },
    Landmark { id: 8, name: "Chabahil", coords: LatLng::new(27.7197, 85.3464) },
    Landmark { id: 9, name: "Pashupatinath Temple", coords: LatLng::new(27.7105, 85.3498) },
    Landmark { id: 10, name: "Swayambhunath Temple", coords: LatLng::new(27.7147, 85.2904) },
    Landmark { id: 11, name: "Boudhanath Stupa", coords: LatLng::new(27.7214, 85.3613) },
    Landmark { id: 12, name: "Patan Durbar Square", coords: LatLng::new(27.6719, 85.3271) },
    Landmark { id: 13, name: "Bhaktapur Durbar Square", coords: LatLng::new(27.6724, 85.4283) },
    Landmark { id: 14, name: "Tribhuvan Airport", coords: LatLng::new(27.6980, 85.3592) },
    Landmark { id: 15, name: "New Bus Park", coords: LatLng::new(27.7372, 85.3124) },
    Landmark { id: 16, name: "Kalanki", coords: LatLng::new(27.6936, 85.2805) },
    Landmark { id: 17, name: "Sinamangal", coords: LatLng::new(27.6983, 85.3505) },
    Landmark { id: 18, name: "Bishalnagar", coords: LatLng::new(27.7230, 85.3320) },
    Landmark { id: 19, name: "Gaushala", coords: LatLng::new(27.7075, 85.3453) },
    Landmark { id: 20, name: "Baneshwor", coords: LatLng::new(27.6906, 85.3380) },
];

pub fn find_landmark(name: &str) -> Option<&'static Landmark> {
    LANDMARKS.iter().find(|l| l.name.eq_ignore_ascii_case(name.trim()))
}

/// Calculate distance between two coordinates using Haversine formula
/// Returns distance in kilometers
pub fn haversine_distance(a: LatLng, b: LatLng) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// How close a picked point must be to a landmark to take its name.
pub const LANDMARK_SNAP_KM: f64 = 0.25;

/// Closest preset landmark within [`LANDMARK_SNAP_KM`] of `point`.
pub fn nearest_landmark(point: LatLng) -> Option<&'static Landmark> {
    LANDMARKS
        .iter()
        .map(|l| (l, haversine_distance(point, l.coords)))
        .filter(|(_, km)| *km <= LANDMARK_SNAP_KM)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(l, _)| l)
}

/// Point and label for a map pick. A pick next to a landmark snaps to
/// it; anything else keeps its coordinates and reads `<prefix> at ...`.
pub fn label_point(point: LatLng, prefix: &str) -> (LatLng, String) {
    match nearest_landmark(point) {
        Some(landmark) => (landmark.coords, landmark.name.to_string()),
        None => (point, point.describe(prefix)),
    }
}

/// Google Maps driving directions from the office to `destination`.
pub fn directions_url(destination: LatLng) -> String {
    format!(
        "https://www.google.com/maps/dir/?api=1&origin={},{}&destination={},{}&travelmode=driving",
        OFFICE_LOCATION.lat, OFFICE_LOCATION.lng, destination.lat, destination.lng
    )
}
