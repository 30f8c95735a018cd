/// Типы данных для конвейера регионов

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const KABKOT_STD: &str = "KABKOT_STD";
pub const JUMLAH_SEKOLAH_ADIWIYATA: &str = "JUMLAH_SEKOLAH_ADIWIYATA";
pub const PERSEN_RTH: &str = "PERSEN_RTH";
pub const LUAS_WILAYAH: &str = "LUAS_WILAYAH";
pub const SAMPAH_HARIAN_TON: &str = "SAMPAH_HARIAN_TON";
pub const SAMPAH_TAHUNAN_TON: &str = "SAMPAH_TAHUNAN_TON";

pub const LOG_ADIWIYATA_PER_KM2: &str = "LOG_ADIWIYATA_PER_KM2";
pub const LOG_SAMPAH_HARIAN_PER_KM2: &str = "LOG_SAMPAH_HARIAN_PER_KM2";
pub const LOG_SAMPAH_TAHUNAN_PER_KM2: &str = "LOG_SAMPAH_TAHUNAN_PER_KM2";

/// Пять базовых числовых колонок таблицы регионов, в порядке отчётов
pub const NUMERICAL_COLUMNS: [&str; 5] = [
    JUMLAH_SEKOLAH_ADIWIYATA,
    PERSEN_RTH,
    LUAS_WILAYAH,
    SAMPAH_HARIAN_TON,
    SAMPAH_TAHUNAN_TON,
];

/// Признаки классификатора в том порядке, в котором модель обучалась
pub const MODEL_FEATURES: [&str; 5] = [
    LOG_ADIWIYATA_PER_KM2,
    LOG_SAMPAH_HARIAN_PER_KM2,
    LOG_SAMPAH_TAHUNAN_PER_KM2,
    PERSEN_RTH,
    LUAS_WILAYAH,
];

/// Значение ключа для нераспознанных названий
pub const UNKNOWN_REGION: &str = "Tidak Diketahui";

/// Канонический ключ региона: "Kab. <Name>" или "Kota <Name>".
///
/// Создаётся только нормализатором названий
/// (`preprocessing::normalization::normalize_region_name`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionKey(String);

impl RegionKey {
    pub(crate) fn from_canonical(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_REGION
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Строка итоговой таблицы: один регион
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFact {
    #[serde(rename = "KABKOT_STD")]
    pub region: RegionKey,
    #[serde(rename = "JUMLAH_SEKOLAH_ADIWIYATA")]
    pub school_count: u32,
    #[serde(rename = "PERSEN_RTH")]
    pub green_space_percent: Option<f64>,
    #[serde(rename = "LUAS_WILAYAH")]
    pub area_km2: Option<f64>,
    #[serde(rename = "SAMPAH_HARIAN_TON")]
    pub daily_waste_ton: Option<f64>,
    #[serde(rename = "SAMPAH_TAHUNAN_TON")]
    pub annual_waste_ton: Option<f64>,
    #[serde(rename = "PROVINSI")]
    pub province: Option<String>,
    #[serde(rename = "IKA")]
    pub water_index: Option<f64>,
    #[serde(rename = "IKU")]
    pub air_index: Option<f64>,
}

impl RegionFact {
    /// Значение базовой числовой колонки по её каноническому имени
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            JUMLAH_SEKOLAH_ADIWIYATA => Some(self.school_count as f64),
            PERSEN_RTH => self.green_space_percent,
            LUAS_WILAYAH => self.area_km2,
            SAMPAH_HARIAN_TON => self.daily_waste_ton,
            SAMPAH_TAHUNAN_TON => self.annual_waste_ton,
            _ => None,
        }
    }
}

/// log1p базовых колонок (для распределений и корреляций)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFeatures {
    #[serde(rename = "LOG_JUMLAH_SEKOLAH_ADIWIYATA")]
    pub school_count: f64,
    #[serde(rename = "LOG_PERSEN_RTH")]
    pub green_space_percent: Option<f64>,
    #[serde(rename = "LOG_LUAS_WILAYAH")]
    pub area_km2: Option<f64>,
    #[serde(rename = "LOG_SAMPAH_HARIAN_TON")]
    pub daily_waste_ton: Option<f64>,
    #[serde(rename = "LOG_SAMPAH_TAHUNAN_TON")]
    pub annual_waste_ton: Option<f64>,
}

impl LogFeatures {
    pub fn get(&self, column: &str) -> Option<f64> {
        match column {
            "LOG_JUMLAH_SEKOLAH_ADIWIYATA" => Some(self.school_count),
            "LOG_PERSEN_RTH" => self.green_space_percent,
            "LOG_LUAS_WILAYAH" => self.area_km2,
            "LOG_SAMPAH_HARIAN_TON" => self.daily_waste_ton,
            "LOG_SAMPAH_TAHUNAN_TON" => self.annual_waste_ton,
            _ => None,
        }
    }
}

/// Плотности на км² и их log1p
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityFeatures {
    #[serde(rename = "ADIWIYATA_PER_KM2")]
    pub school_per_km2: f64,
    #[serde(rename = "SAMPAH_HARIAN_PER_KM2")]
    pub daily_waste_per_km2: Option<f64>,
    #[serde(rename = "SAMPAH_TAHUNAN_PER_KM2")]
    pub annual_waste_per_km2: Option<f64>,
    #[serde(rename = "LOG_ADIWIYATA_PER_KM2")]
    pub log_school_per_km2: f64,
    #[serde(rename = "LOG_SAMPAH_HARIAN_PER_KM2")]
    pub log_daily_waste_per_km2: Option<f64>,
    #[serde(rename = "LOG_SAMPAH_TAHUNAN_PER_KM2")]
    pub log_annual_waste_per_km2: Option<f64>,
}

/// Регион с площадью > 0 и вычисленными признаками
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeatureRow {
    #[serde(flatten)]
    pub fact: RegionFact,
    /// Площадь, гарантированно > 0
    #[serde(skip)]
    pub area_km2: f64,
    #[serde(flatten)]
    pub density: DensityFeatures,
    #[serde(flatten)]
    pub logs: LogFeatures,
}

impl DerivedFeatureRow {
    /// Значение признака по имени колонки (базовые, log1p и плотности)
    pub fn feature(&self, column: &str) -> Option<f64> {
        match column {
            LOG_ADIWIYATA_PER_KM2 => Some(self.density.log_school_per_km2),
            LOG_SAMPAH_HARIAN_PER_KM2 => self.density.log_daily_waste_per_km2,
            LOG_SAMPAH_TAHUNAN_PER_KM2 => self.density.log_annual_waste_per_km2,
            "ADIWIYATA_PER_KM2" => Some(self.density.school_per_km2),
            "SAMPAH_HARIAN_PER_KM2" => self.density.daily_waste_per_km2,
            "SAMPAH_TAHUNAN_PER_KM2" => self.density.annual_waste_per_km2,
            LUAS_WILAYAH => Some(self.area_km2),
            other if other.starts_with("LOG_") => self.logs.get(other),
            other => self.fact.numeric(other),
        }
    }
}

/// Строка с эталонной меткой несоответствия (только для оценки).
/// IKA и IKU у таких строк всегда заполнены.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRow {
    #[serde(flatten)]
    pub features: DerivedFeatureRow,
    #[serde(rename = "ADIWIYATA_TINGGI")]
    pub high_density_schools: bool,
    #[serde(rename = "LINGKUNGAN_RENDAH")]
    pub low_environment: bool,
    #[serde(rename = "KETIDAKSESUAIAN")]
    pub misaligned: u8,
}

/// Медианные пороги, по которым построены метки
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelThresholds {
    pub log_school_density_median: f64,
    pub water_index_median: f64,
    pub air_index_median: f64,
}

/// Набор меток вместе с популяцией, на которой считались медианы
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSet {
    pub rows: Vec<LabelRow>,
    pub thresholds: LabelThresholds,
    /// Число строк, по которым считались медианы
    pub reference_population: usize,
    /// Строки без IKA/IKU, исключённые до расчёта медиан
    pub excluded: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: u8,
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

/// Матрица ошибок: строки - факт, столбцы - прогноз
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix(pub [[usize; 2]; 2]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: u8,
    pub description: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPrediction {
    pub region: RegionKey,
    pub actual: u8,
    pub predicted: u8,
    pub probability: f64,
}

/// Результат этапа моделирования
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResults {
    pub accuracy: f64,
    pub report: ClassificationReport,
    pub confusion_matrix: ConfusionMatrix,
    pub feature_names: Vec<String>,
    /// По убыванию важности
    pub feature_importances: Vec<FeatureImportance>,
    pub predicted_distribution: Vec<LabelCount>,
    pub actual_distribution: Vec<LabelCount>,
    pub predictions: Vec<RegionPrediction>,
    pub thresholds: LabelThresholds,
    pub reference_population: usize,
    pub generated_at: DateTime<Utc>,
}
