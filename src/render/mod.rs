//! Time-series chart of em dash usage per subreddit.

pub mod chart;
pub mod series;

pub use chart::{draw_chart, ChartStyle};
pub use series::prepare_chart;
