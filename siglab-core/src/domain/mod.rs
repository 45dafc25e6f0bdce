//! Domain types for siglab

pub mod bar;
pub mod clock;
pub mod direction;
pub mod series;

pub use bar::{DailyBar, IntradayBar, Resolution};
pub use direction::Direction;
pub use series::{DailySeries, IntradaySeries};
