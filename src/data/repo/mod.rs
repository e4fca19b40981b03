pub mod import_states;
pub mod postal_codes;
