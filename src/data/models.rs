use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::data::schema::{geo_postal_code, import_states};

/// A postal code as read from a data source, before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PostalCodeRecord {
    pub country: String,
    pub postal_code: String,
    pub lat: f64,
    pub lng: f64
}

#[derive(Queryable, Debug, Clone, PartialEq)]
pub struct GeoPostalCode {
    pub id: i32,
    pub country: String,
    pub postal_code: String,
    pub lat: f64,
    pub lng: f64
}

#[derive(Insertable, Debug)]
#[diesel(table_name = geo_postal_code)]
pub struct NewGeoPostalCode<'a> {
    pub country: &'a str,
    pub postal_code: &'a str,
    pub lat: f64,
    pub lng: f64
}

impl<'a> From<&'a PostalCodeRecord> for NewGeoPostalCode<'a> {
    fn from(record: &'a PostalCodeRecord) -> Self {
        NewGeoPostalCode {
            country: record.country.as_str(),
            postal_code: record.postal_code.as_str(),
            lat: record.lat,
            lng: record.lng
        }
    }
}

#[derive(Queryable, Debug)]
pub struct ImportState {
    pub id: i32,
    pub fixture: String,
    pub scope: String,
    pub record_count: i32,
    pub imported_at: NaiveDateTime
}

#[derive(Insertable, Debug)]
#[diesel(table_name = import_states)]
pub struct NewImportState<'a> {
    pub fixture: &'a str,
    pub scope: &'a str,
    pub record_count: i32,
    pub imported_at: NaiveDateTime
}
