use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::data::models::GeoPostalCode;
use crate::data::repo::postal_codes::{find_in_bounds, find_postal_code};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers, by the spherical law of cosines.
pub fn geo_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (lat1, lng1) = (lat1.to_radians(), lng1.to_radians());
    let (lat2, lng2) = (lat2.to_radians(), lng2.to_radians());

    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lng2 - lng1).cos();
    // Rounding can push the cosine of identical points above 1
    cos_angle.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_KM
}

/// Distance between two stored postal codes, `None` if either is unknown.
pub fn distance_by_postal_code(
    conn: &mut SqliteConnection,
    origin: (&str, &str),
    destination: (&str, &str)
) -> QueryResult<Option<f64>> {
    let from = find_postal_code(conn, origin.0, origin.1)?;
    let to = find_postal_code(conn, destination.0, destination.1)?;

    Ok(match (from, to) {
        (Some(from), Some(to)) => Some(geo_distance(from.lat, from.lng, to.lat, to.lng)),
        _ => None,
    })
}

/// Stored postal codes within `radius_km` of `origin`, closest first, or
/// `None` if the origin is unknown.
pub fn find_within_radius(
    conn: &mut SqliteConnection,
    origin: (&str, &str),
    radius_km: f64
) -> QueryResult<Option<Vec<(GeoPostalCode, f64)>>> {
    let center = match find_postal_code(conn, origin.0, origin.1)? {
        Some(center) => center,
        None => return Ok(None),
    };
    let radius_km = radius_km.max(0.0);
    let (lat_range, lng_range) = bounding_box(center.lat, center.lng, radius_km);

    let mut nearby = find_in_bounds(conn, lat_range, lng_range)?
        .into_iter()
        .map(|p| {
            let distance = geo_distance(center.lat, center.lng, p.lat, p.lng);
            (p, distance)
        })
        .filter(|(_, distance)| *distance <= radius_km)
        .collect::<Vec<(GeoPostalCode, f64)>>();
    nearby.sort_by(|a, b| a.1.total_cmp(&b.1));

    Ok(Some(nearby))
}

/// Latitude and longitude ranges (degrees) enclosing every point within
/// `radius_km`. The longitude range is `None` when the circle reaches a
/// pole or crosses the antimeridian.
fn bounding_box(lat: f64, lng: f64, radius_km: f64) -> ((f64, f64), Option<(f64, f64)>) {
    let angular_radius = radius_km / EARTH_RADIUS_KM;
    let lat_delta = angular_radius.to_degrees();
    let min_lat = lat - lat_delta;
    let max_lat = lat + lat_delta;

    if min_lat <= -90.0 || max_lat >= 90.0 {
        return ((min_lat.max(-90.0), max_lat.min(90.0)), None);
    }

    let lng_delta = (angular_radius.sin() / lat.to_radians().cos()).asin().to_degrees();
    let (min_lng, max_lng) = (lng - lng_delta, lng + lng_delta);
    if lng_delta.is_nan() || min_lng < -180.0 || max_lng > 180.0 {
        return ((min_lat, max_lat), None);
    }
    ((min_lat, max_lat), Some((min_lng, max_lng)))
}
