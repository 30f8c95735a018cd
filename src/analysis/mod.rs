/// Статистика и разведочный анализ таблицы регионов
pub mod eda;
pub mod stats;

pub use eda::{EdaReport, OverviewSummary, Section};
pub use stats::{ColumnSummary, LinearFit};
