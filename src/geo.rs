//! Great-circle distance and coordinate formatting.

use crate::model::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates, in kilometers.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    // Rounding can push `h` past 1 for near-antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Human-readable distance: metres below 1 km, megametres above 1000 km.
pub fn format_distance(distance_km: f64) -> String {
    if distance_km < 1.0 {
        format!("{:.0} m", distance_km * 1000.0)
    } else if distance_km > 1000.0 {
        format!("{:.1} Mm", distance_km / 1000.0)
    } else {
        format!("{:.0} km", distance_km)
    }
}

/// Format coordinates as "34.0754°N, 84.2941°W".
pub fn format_coords(c: Coordinate) -> String {
    let ns = if c.latitude >= 0.0 { 'N' } else { 'S' };
    let ew = if c.longitude >= 0.0 { 'E' } else { 'W' };
    format!(
        "{:.4}\u{00B0}{}, {:.4}\u{00B0}{}",
        c.latitude.abs(),
        ns,
        c.longitude.abs(),
        ew
    )
}
