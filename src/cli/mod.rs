pub mod calculate;
pub mod rate;
pub mod setup;
pub mod ui;
