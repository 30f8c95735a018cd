//! Feature engineering: плотности на км² и log1p

use ndarray::{Array1, Array2};

use crate::types::{DensityFeatures, DerivedFeatureRow, LabelRow, LogFeatures, RegionFact, MODEL_FEATURES};

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// ln(1 + x); ноль остаётся нулём. Нечисловой результат - пропуск.
    pub fn log1p(value: f64) -> Option<f64> {
        let result = value.ln_1p();
        result.is_finite().then_some(result)
    }

    /// log1p каждой из пяти базовых колонок
    pub fn log_features(fact: &RegionFact) -> LogFeatures {
        LogFeatures {
            school_count: (fact.school_count as f64).ln_1p(),
            green_space_percent: fact.green_space_percent.and_then(Self::log1p),
            area_km2: fact.area_km2.and_then(Self::log1p),
            daily_waste_ton: fact.daily_waste_ton.and_then(Self::log1p),
            annual_waste_ton: fact.annual_waste_ton.and_then(Self::log1p),
        }
    }

    /// Плотности для региона с площадью `area_km2` > 0
    pub fn density_features(fact: &RegionFact, area_km2: f64) -> DensityFeatures {
        let school_per_km2 = fact.school_count as f64 / area_km2;
        let daily_waste_per_km2 = fact.daily_waste_ton.map(|v| v / area_km2);
        let annual_waste_per_km2 = fact.annual_waste_ton.map(|v| v / area_km2);

        DensityFeatures {
            school_per_km2,
            daily_waste_per_km2,
            annual_waste_per_km2,
            log_school_per_km2: school_per_km2.ln_1p(),
            log_daily_waste_per_km2: daily_waste_per_km2.and_then(Self::log1p),
            log_annual_waste_per_km2: annual_waste_per_km2.and_then(Self::log1p),
        }
    }

    /// Признаки для регионов с известной положительной площадью.
    /// Остальные регионы исключаются: плотность для них не определена.
    pub fn derive(facts: &[RegionFact]) -> Vec<DerivedFeatureRow> {
        let rows: Vec<DerivedFeatureRow> = facts
            .iter()
            .filter_map(|fact| {
                let area_km2 = fact.area_km2.filter(|a| *a > 0.0)?;
                Some(DerivedFeatureRow {
                    fact: fact.clone(),
                    area_km2,
                    density: Self::density_features(fact, area_km2),
                    logs: Self::log_features(fact),
                })
            })
            .collect();

        let excluded = facts.len() - rows.len();
        if excluded > 0 {
            tracing::warn!("{} regions without positive area excluded from density features", excluded);
        }

        rows
    }

    /// Матрица признаков классификатора в порядке `MODEL_FEATURES`.
    /// Пропуски кодируются NaN.
    pub fn extract_model_features(rows: &[DerivedFeatureRow]) -> Array2<f64> {
        let mut features = Array2::from_elem((rows.len(), MODEL_FEATURES.len()), f64::NAN);

        for (i, row) in rows.iter().enumerate() {
            for (j, name) in MODEL_FEATURES.iter().enumerate() {
                if let Some(value) = row.feature(name) {
                    features[[i, j]] = value;
                }
            }
        }

        features
    }

    /// Признаки и эталонные метки для оценки модели
    pub fn extract_labelled(rows: &[LabelRow]) -> (Array2<f64>, Array1<u8>) {
        let features: Vec<DerivedFeatureRow> = rows.iter().map(|r| r.features.clone()).collect();
        let targets = rows.iter().map(|r| r.misaligned).collect();
        (Self::extract_model_features(&features), targets)
    }
}
