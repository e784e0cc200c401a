mod orders;
mod units;

pub use orders::OrderSystem;
pub use units::UnitSystem;
