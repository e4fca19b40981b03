use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::data::models::{GeoPostalCode, NewGeoPostalCode};

pub fn insert_postal_codes(
    conn: &mut SqliteConnection,
    new_postal_codes: &[NewGeoPostalCode]
) -> QueryResult<usize> {
    use crate::data::schema::geo_postal_code::dsl::*;

    if new_postal_codes.is_empty() {
        return Ok(0);
    }

    diesel::insert_into(geo_postal_code)
        .values(new_postal_codes)
        .execute(conn)
}

pub fn delete_by_countries(
    conn: &mut SqliteConnection,
    countries: &[String]
) -> QueryResult<usize> {
    use crate::data::schema::geo_postal_code::dsl::*;

    diesel::delete(geo_postal_code.filter(country.eq_any(countries)))
        .execute(conn)
}

pub fn delete_all(conn: &mut SqliteConnection) -> QueryResult<usize> {
    use crate::data::schema::geo_postal_code::dsl::*;

    diesel::delete(geo_postal_code).execute(conn)
}

pub fn count_all(conn: &mut SqliteConnection) -> QueryResult<i64> {
    use crate::data::schema::geo_postal_code::dsl::*;

    geo_postal_code.count().get_result(conn)
}

pub fn count_by_country(conn: &mut SqliteConnection, ccode: &str) -> QueryResult<i64> {
    use crate::data::schema::geo_postal_code::dsl::*;

    geo_postal_code
        .filter(country.eq(ccode))
        .count()
        .get_result(conn)
}

pub fn find_by_country(
    conn: &mut SqliteConnection,
    ccode: &str
) -> QueryResult<Vec<GeoPostalCode>> {
    use crate::data::schema::geo_postal_code::dsl::*;

    geo_postal_code
        .filter(country.eq(ccode))
        .order((postal_code.asc(), id.asc()))
        .load(conn)
}

/// Storage does not enforce uniqueness, so the first row inserted wins.
pub fn find_postal_code(
    conn: &mut SqliteConnection,
    ccode: &str,
    pcode: &str
) -> QueryResult<Option<GeoPostalCode>> {
    use crate::data::schema::geo_postal_code::dsl::*;

    geo_postal_code
        .filter(country.eq(ccode))
        .filter(postal_code.eq(pcode))
        .order(id.asc())
        .first(conn)
        .optional()
}

/// Postal codes inside a latitude/longitude box. A `None` longitude range
/// means the box spans every longitude.
pub fn find_in_bounds(
    conn: &mut SqliteConnection,
    lat_range: (f64, f64),
    lng_range: Option<(f64, f64)>
) -> QueryResult<Vec<GeoPostalCode>> {
    use crate::data::schema::geo_postal_code::dsl::*;

    let mut query = geo_postal_code
        .filter(lat.between(lat_range.0, lat_range.1))
        .into_boxed();
    if let Some((min_lng, max_lng)) = lng_range {
        query = query.filter(lng.between(min_lng, max_lng));
    }

    query
        .order((country.asc(), postal_code.asc()))
        .load(conn)
}
