pub mod scheduled;
pub mod tracking;
