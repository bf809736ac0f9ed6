pub mod chart_log;

pub use chart_log::{ChartKind, ChartLog, ChartPoint};
