pub mod fee_model;
pub mod types;
