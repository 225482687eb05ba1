pub mod fitness;
pub mod parameters;
pub mod types;
