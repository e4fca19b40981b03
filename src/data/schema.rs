diesel::table! {
    geo_postal_code (id) {
        id -> Integer,
        country -> Text,
        postal_code -> Text,
        lat -> Double,
        lng -> Double,
    }
}

diesel::table! {
    import_states (id) {
        id -> Integer,
        fixture -> Text,
        scope -> Text,
        record_count -> Integer,
        imported_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    geo_postal_code,
    import_states,
);
