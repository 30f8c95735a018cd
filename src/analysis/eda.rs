//! Разведочный анализ итоговой таблицы регионов

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::stats::{self, ColumnSummary, LinearFit};
use crate::preprocessing::FeatureEngineer;
use crate::types::{
    DerivedFeatureRow, RegionFact, LOG_ADIWIYATA_PER_KM2, LOG_SAMPAH_HARIAN_PER_KM2,
    LOG_SAMPAH_TAHUNAN_PER_KM2, NUMERICAL_COLUMNS,
};

const LOG_CORRELATION_COLUMNS: [&str; 4] = [
    "LOG_JUMLAH_SEKOLAH_ADIWIYATA",
    "LOG_PERSEN_RTH",
    "LOG_SAMPAH_HARIAN_TON",
    "LOG_SAMPAH_TAHUNAN_TON",
];

const DENSITY_COLUMNS: [&str; 3] = [
    LOG_ADIWIYATA_PER_KM2,
    LOG_SAMPAH_HARIAN_PER_KM2,
    LOG_SAMPAH_TAHUNAN_PER_KM2,
];

const DOSE_LABELS: [&str; 5] = ["Sangat Rendah", "Rendah", "Menengah", "Tinggi", "Sangat Tinggi"];
const INTENSITY_LABELS: [&str; 4] = ["Rendah", "Menengah", "Tinggi", "Sangat Tinggi"];
const WASTE_GROUP_LABELS: [&str; 2] = ["Sampah Relatif Rendah", "Sampah Relatif Tinggi"];

/// Сводка по таблице регионов (показатели обзора)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewSummary {
    pub total_regions: usize,
    pub total_schools: u64,
    pub mean_green_space_percent: Option<f64>,
    pub total_daily_waste_ton: f64,
    /// Пропуски по колонкам: пустое соединение видно здесь
    pub missing_by_column: BTreeMap<String, usize>,
}

impl OverviewSummary {
    pub fn from_facts(facts: &[RegionFact]) -> Self {
        let green: Vec<f64> = facts.iter().filter_map(|f| f.green_space_percent).collect();

        let mut missing_by_column = BTreeMap::new();
        for column in NUMERICAL_COLUMNS {
            let missing = facts.iter().filter(|f| f.numeric(column).is_none()).count();
            missing_by_column.insert(column.to_string(), missing);
        }
        missing_by_column.insert(
            "PROVINSI".to_string(),
            facts.iter().filter(|f| f.province.is_none()).count(),
        );
        missing_by_column.insert("IKA".to_string(), facts.iter().filter(|f| f.water_index.is_none()).count());
        missing_by_column.insert("IKU".to_string(), facts.iter().filter(|f| f.air_index.is_none()).count());

        Self {
            total_regions: facts.len(),
            total_schools: facts.iter().map(|f| f.school_count as u64).sum(),
            mean_green_space_percent: stats::mean(&green),
            total_daily_waste_ton: facts.iter().filter_map(|f| f.daily_waste_ton).sum(),
            missing_by_column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    fn build<F>(columns: &[&str], data: &[Vec<Option<f64>>], method: F) -> Self
    where
        F: Fn(&[Option<f64>], &[Option<f64>]) -> Option<f64>,
    {
        let values = data
            .iter()
            .map(|x| data.iter().map(|y| method(x, y)).collect())
            .collect();
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlations {
    pub pearson: CorrelationMatrix,
    pub spearman: CorrelationMatrix,
}

impl Correlations {
    fn compute(columns: &[&str], data: &[Vec<Option<f64>>]) -> Self {
        Self {
            pearson: CorrelationMatrix::build(columns, data, stats::pearson),
            spearman: CorrelationMatrix::build(columns, data, stats::spearman),
        }
    }
}

/// Раздел отчёта, который может быть недоступен на малых или однородных данных
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Section<T> {
    Available(T),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseResponseBin {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub median: Option<f64>,
    pub q25: Option<f64>,
    pub q75: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub label: String,
    pub count: usize,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFit {
    pub group: String,
    pub count: usize,
    pub fit: Option<LinearFit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendLines {
    pub daily_waste: Option<LinearFit>,
    pub annual_waste: Option<LinearFit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaReport {
    pub overview: OverviewSummary,
    pub descriptive: Vec<ColumnSummary>,
    pub log_descriptive: Vec<ColumnSummary>,
    pub log_correlations: Correlations,
    /// Регионы с положительной площадью, на которых считаются плотности
    pub density_rows: usize,
    pub density_descriptive: Vec<ColumnSummary>,
    pub density_correlations: Correlations,
    pub dose_response: Section<Vec<DoseResponseBin>>,
    pub intensity_boxes: Section<Vec<BoxStats>>,
    pub trends: TrendLines,
    pub waste_segments: Section<Vec<SegmentFit>>,
}

impl EdaReport {
    pub fn build(facts: &[RegionFact], derived: &[DerivedFeatureRow]) -> Self {
        let descriptive = NUMERICAL_COLUMNS
            .iter()
            .map(|column| {
                let values: Vec<Option<f64>> = facts.iter().map(|f| f.numeric(column)).collect();
                stats::describe(column, &values)
            })
            .collect();

        let logs: Vec<_> = facts.iter().map(FeatureEngineer::log_features).collect();
        let log_column = |name: &str| -> Vec<Option<f64>> { logs.iter().map(|l| l.get(name)).collect() };

        let log_descriptive = NUMERICAL_COLUMNS
            .iter()
            .map(|column| {
                let name = format!("LOG_{column}");
                stats::describe(&name, &log_column(&name))
            })
            .collect();

        let log_data: Vec<Vec<Option<f64>>> = LOG_CORRELATION_COLUMNS.iter().map(|c| log_column(*c)).collect();

        let density_column =
            |name: &str| -> Vec<Option<f64>> { derived.iter().map(|r| r.feature(name)).collect() };
        let density_data: Vec<Vec<Option<f64>>> = DENSITY_COLUMNS.iter().map(|c| density_column(*c)).collect();

        let school_density = density_column(LOG_ADIWIYATA_PER_KM2);
        let daily_density = density_column(LOG_SAMPAH_HARIAN_PER_KM2);
        let annual_density = density_column(LOG_SAMPAH_TAHUNAN_PER_KM2);

        tracing::info!("EDA on {} regions ({} with positive area)", facts.len(), derived.len());

        Self {
            overview: OverviewSummary::from_facts(facts),
            descriptive,
            log_descriptive,
            log_correlations: Correlations::compute(&LOG_CORRELATION_COLUMNS, &log_data),
            density_rows: derived.len(),
            density_descriptive: DENSITY_COLUMNS
                .iter()
                .zip(&density_data)
                .map(|(c, values)| stats::describe(c, values))
                .collect(),
            density_correlations: Correlations::compute(&DENSITY_COLUMNS, &density_data),
            dose_response: dose_response(&school_density, &daily_density),
            intensity_boxes: intensity_boxes(&school_density, &daily_density),
            trends: TrendLines {
                daily_waste: stats::linear_fit(&school_density, &daily_density),
                annual_waste: stats::linear_fit(&school_density, &annual_density),
            },
            waste_segments: waste_segments(&school_density, &daily_density),
        }
    }
}

/// Разбиение `key` на квантильные корзины с подписями; значения `target`
/// группируются по корзине. Совпадающие границы сокращают число корзин,
/// и тогда раздел недоступен.
fn quantile_groups(
    key: &[Option<f64>],
    target: &[Option<f64>],
    labels: &[&str],
) -> Result<Vec<(String, f64, f64, Vec<Option<f64>>)>, String> {
    let present: Vec<f64> = key.iter().flatten().copied().collect();
    let edges = stats::quantile_edges(&present, labels.len());
    if edges.len() != labels.len() + 1 {
        return Err(format!(
            "cannot split {} values into {} quantile bins: data too sparse or uniform",
            present.len(),
            labels.len()
        ));
    }

    let mut groups: Vec<(String, f64, f64, Vec<Option<f64>>)> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.to_string(), edges[i], edges[i + 1], Vec::new()))
        .collect();

    for (k, t) in key.iter().zip(target) {
        if let Some(bin) = k.and_then(|k| stats::bin_index(&edges, k)) {
            groups[bin].3.push(*t);
        }
    }

    Ok(groups)
}

fn dose_response(school: &[Option<f64>], waste: &[Option<f64>]) -> Section<Vec<DoseResponseBin>> {
    match quantile_groups(school, waste, &DOSE_LABELS) {
        Ok(groups) => Section::Available(
            groups
                .into_iter()
                .map(|(label, lower, upper, values)| {
                    let present: Vec<f64> = values.iter().flatten().copied().collect();
                    DoseResponseBin {
                        label,
                        lower,
                        upper,
                        count: values.len(),
                        median: stats::median(&present),
                        q25: stats::quantile(&present, 0.25),
                        q75: stats::quantile(&present, 0.75),
                    }
                })
                .collect(),
        ),
        Err(reason) => {
            tracing::warn!("Dose-response unavailable: {}", reason);
            Section::Unavailable(reason)
        }
    }
}

fn intensity_boxes(school: &[Option<f64>], waste: &[Option<f64>]) -> Section<Vec<BoxStats>> {
    match quantile_groups(school, waste, &INTENSITY_LABELS) {
        Ok(groups) => Section::Available(
            groups
                .into_iter()
                .map(|(label, _, _, values)| {
                    let present: Vec<f64> = values.iter().flatten().copied().collect();
                    BoxStats {
                        label,
                        count: present.len(),
                        min: stats::quantile(&present, 0.0),
                        q1: stats::quantile(&present, 0.25),
                        median: stats::median(&present),
                        q3: stats::quantile(&present, 0.75),
                        max: stats::quantile(&present, 1.0),
                    }
                })
                .collect(),
        ),
        Err(reason) => Section::Unavailable(reason),
    }
}

/// Регрессия школ на отходы отдельно для регионов с низкими и высокими отходами
fn waste_segments(school: &[Option<f64>], waste: &[Option<f64>]) -> Section<Vec<SegmentFit>> {
    let present: Vec<f64> = waste.iter().flatten().copied().collect();
    let edges = stats::quantile_edges(&present, WASTE_GROUP_LABELS.len());
    if edges.len() != WASTE_GROUP_LABELS.len() + 1 {
        return Section::Unavailable("waste density has no spread to split into groups".to_string());
    }

    let segments = WASTE_GROUP_LABELS
        .iter()
        .enumerate()
        .map(|(bin, label)| {
            let (x, y): (Vec<Option<f64>>, Vec<Option<f64>>) = school
                .iter()
                .zip(waste)
                .filter(|(_, w)| w.and_then(|w| stats::bin_index(&edges, w)) == Some(bin))
                .map(|(s, w)| (*s, *w))
                .unzip();
            SegmentFit {
                group: label.to_string(),
                count: x.len(),
                fit: stats::linear_fit(&x, &y),
            }
        })
        .collect();

    Section::Available(segments)
}
