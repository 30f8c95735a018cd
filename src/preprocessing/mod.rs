/// Модуль предобработки данных

pub mod cleaning;
pub mod feature_engineering;
pub mod labeling;
pub mod normalization;

pub use cleaning::{Cleaned, CleaningStats};
pub use feature_engineering::FeatureEngineer;
pub use labeling::LabelDeriver;
pub use normalization::{normalize_region_name, normalize_region_names};
