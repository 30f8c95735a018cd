//! Эталонная метка несоответствия (только для оценки модели).
//!
//! Пороги - медианы текущего набора строк, поэтому метки зависят от того,
//! какие регионы загружены: другой файл или фильтр меняет медианы.

use crate::analysis::stats::median;
use crate::error::{PipelineError, Result};
use crate::types::{DerivedFeatureRow, LabelRow, LabelSet, LabelThresholds};

pub struct LabelDeriver;

impl LabelDeriver {
    /// Метки для строк с известными IKA и IKU
    pub fn derive(rows: &[DerivedFeatureRow]) -> Result<LabelSet> {
        let population: Vec<(&DerivedFeatureRow, f64, f64)> = rows
            .iter()
            .filter_map(|row| Some((row, row.fact.water_index?, row.fact.air_index?)))
            .collect();
        let excluded = rows.len() - population.len();

        let school: Vec<f64> = population.iter().map(|(r, _, _)| r.density.log_school_per_km2).collect();
        let water: Vec<f64> = population.iter().map(|(_, w, _)| *w).collect();
        let air: Vec<f64> = population.iter().map(|(_, _, a)| *a).collect();

        let (Some(school_median), Some(water_median), Some(air_median)) =
            (median(&school), median(&water), median(&air))
        else {
            return Err(PipelineError::EmptyDataset(
                "no region has both water and air quality indices".to_string(),
            ));
        };

        let thresholds = LabelThresholds {
            log_school_density_median: school_median,
            water_index_median: water_median,
            air_index_median: air_median,
        };

        let labelled: Vec<LabelRow> = population
            .into_iter()
            .map(|(row, water, air)| {
                let high_density_schools = row.density.log_school_per_km2 >= school_median;
                let low_environment = water < water_median || air < air_median;
                LabelRow {
                    features: row.clone(),
                    high_density_schools,
                    low_environment,
                    misaligned: u8::from(high_density_schools && low_environment),
                }
            })
            .collect();

        tracing::info!(
            "Labels derived on {} regions ({} without quality indices excluded), {} misaligned",
            labelled.len(),
            excluded,
            labelled.iter().filter(|r| r.misaligned == 1).count()
        );

        Ok(LabelSet {
            reference_population: labelled.len(),
            rows: labelled,
            thresholds,
            excluded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::normalization::normalize_region_name;
    use crate::preprocessing::FeatureEngineer;
    use crate::types::RegionFact;

    fn row(name: &str, schools: u32, water: Option<f64>, air: Option<f64>) -> DerivedFeatureRow {
        let fact = RegionFact {
            region: normalize_region_name(name),
            school_count: schools,
            green_space_percent: None,
            area_km2: Some(1.0),
            daily_waste_ton: None,
            annual_waste_ton: None,
            province: None,
            water_index: water,
            air_index: air,
        };
        FeatureEngineer::derive(&[fact]).remove(0)
    }

    fn sample() -> Vec<DerivedFeatureRow> {
        vec![
            row("A", 1, Some(50.0), Some(80.0)),
            row("B", 2, Some(40.0), Some(90.0)),
            row("C", 3, Some(60.0), Some(70.0)),
            row("D", 4, Some(45.0), Some(85.0)),
        ]
    }

    fn targets(set: &LabelSet) -> Vec<(String, u8)> {
        set.rows
            .iter()
            .map(|r| (r.features.fact.region.to_string(), r.misaligned))
            .collect()
    }

    #[test]
    fn labels_follow_median_rule() {
        let set = LabelDeriver::derive(&sample()).unwrap();

        // медиана школ между B и C, IKA 47.5, IKU 82.5
        assert_eq!(set.reference_population, 4);
        assert_eq!(set.thresholds.water_index_median, 47.5);
        assert_eq!(set.thresholds.air_index_median, 82.5);
        assert_eq!(
            targets(&set),
            vec![
                ("Kab. A".to_string(), 0),
                ("Kab. B".to_string(), 0),
                ("Kab. C".to_string(), 1),
                ("Kab. D".to_string(), 1),
            ]
        );
    }

    #[test]
    fn labels_are_deterministic_for_fixed_input() {
        let first = LabelDeriver::derive(&sample()).unwrap();
        let second = LabelDeriver::derive(&sample()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn subset_changes_labels_because_medians_move() {
        let full = LabelDeriver::derive(&sample()).unwrap();
        let subset: Vec<DerivedFeatureRow> = sample().into_iter().skip(2).collect();
        let partial = LabelDeriver::derive(&subset).unwrap();

        let c_full = full.rows.iter().find(|r| r.features.fact.region.as_str() == "Kab. C").unwrap();
        let c_partial = partial.rows.iter().find(|r| r.features.fact.region.as_str() == "Kab. C").unwrap();

        assert_eq!(c_full.misaligned, 1);
        assert_eq!(c_partial.misaligned, 0);
        assert_eq!(partial.reference_population, 2);
    }

    #[test]
    fn rows_without_quality_are_excluded_from_population() {
        let mut rows = sample();
        rows.push(row("E", 9, None, Some(10.0)));
        let set = LabelDeriver::derive(&rows).unwrap();
        assert_eq!(set.reference_population, 4);
        assert_eq!(set.excluded, 1);
    }

    #[test]
    fn no_quality_data_is_an_error() {
        let err = LabelDeriver::derive(&[row("A", 1, None, None)]).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset(_)));
    }
}
