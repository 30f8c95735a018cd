/// Источники данных: загрузка таблиц и их схемы

pub mod loader;
pub mod schema;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;

pub use loader::load_table;
pub use schema::{FieldKind, FieldSpec, ResolvedSchema, SourceSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Schools,
    GreenSpace,
    Waste,
    WaterQuality,
    AirQuality,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Schools,
        SourceKind::GreenSpace,
        SourceKind::Waste,
        SourceKind::WaterQuality,
        SourceKind::AirQuality,
    ];

    /// Подпись источника в интерфейсе
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Schools => "Sekolah",
            SourceKind::GreenSpace => "RTH",
            SourceKind::Waste => "Sampah",
            SourceKind::WaterQuality => "Kualitas Air",
            SourceKind::AirQuality => "Kualitas Udara",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Наличие файла источника на диске
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub source: SourceKind,
    pub label: String,
    pub path: PathBuf,
    pub exists: bool,
    pub modified: Option<DateTime<Utc>>,
}

impl SourceStatus {
    pub fn probe(source: SourceKind, path: &Path) -> Self {
        let metadata = std::fs::metadata(path).ok().filter(|m| m.is_file());
        let modified = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        Self {
            source,
            label: source.label().to_string(),
            path: path.to_path_buf(),
            exists: metadata.is_some(),
            modified,
        }
    }
}

/// Статус всех пяти источников
pub fn check_sources(config: &Config) -> Vec<SourceStatus> {
    SourceKind::ALL
        .iter()
        .map(|&source| SourceStatus::probe(source, &config.source_path(source)))
        .collect()
}

/// Значение ячейки до приведения типов
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Text(String),
    Number(f64),
}

impl RawValue {
    /// Текстовое представление; пустая ячейка - `None`
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Empty => None,
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Number(_) => false,
        }
    }
}

/// Нетипизированная таблица: заголовки и строки в порядке загрузки
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Ячейка по индексу колонки; короткие строки дополняются пустыми
    pub fn cell(&self, row: usize, column: usize) -> &RawValue {
        static EMPTY: RawValue = RawValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
