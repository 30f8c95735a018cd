//! Очистка источников: приведение чисел, отбор строк, удаление дублей

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::normalization::{normalize_province, normalize_region_name};
use crate::error::Result;
use crate::sources::schema::{IKA, IKU, KABKOT, NAMA_SEKOLAH, PROVINSI, TAHUN};
use crate::sources::{FieldKind, RawTable, RawValue, ResolvedSchema, SourceKind, SourceSchema};
use crate::types::{RegionKey, LUAS_WILAYAH, PERSEN_RTH, SAMPAH_HARIAN_TON, SAMPAH_TAHUNAN_TON};

/// Число из ячейки: запятая как десятичный разделитель, "-" - пропуск.
/// Нечисловое значение даёт `None`, а не ошибку.
pub fn coerce_number(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Empty => None,
        RawValue::Number(n) => n.is_finite().then_some(*n),
        RawValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() || s == "-" {
                return None;
            }
            s.replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
        }
    }
}

/// Статистика очистки одного источника
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub source: Option<SourceKind>,
    pub input_rows: usize,
    /// Строки без площади (или другого ключевого поля)
    pub dropped_rows: usize,
    pub duplicates_removed: usize,
    /// Непустые ячейки, которые не удалось разобрать как число
    pub invalid_numbers: BTreeMap<String, usize>,
}

/// Очищенная таблица источника: не более одной строки на ключ
#[derive(Debug, Clone, PartialEq)]
pub struct Cleaned<T> {
    pub rows: Vec<T>,
    pub stats: CleaningStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreenSpaceRow {
    pub region: RegionKey,
    pub year: Option<f64>,
    pub province: Option<String>,
    pub area_km2: f64,
    pub green_space_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteRow {
    pub region: RegionKey,
    pub year: Option<f64>,
    pub daily_waste_ton: Option<f64>,
    pub annual_waste_ton: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityRow {
    pub province: String,
    pub year: Option<f64>,
    pub index: Option<f64>,
}

/// Строка с ключом и годом для правила "побеждает последний год"
pub trait Keyed {
    type Key: Ord;

    fn key(&self) -> &Self::Key;
    fn year(&self) -> Option<f64>;
}

impl Keyed for GreenSpaceRow {
    type Key = RegionKey;

    fn key(&self) -> &RegionKey {
        &self.region
    }

    fn year(&self) -> Option<f64> {
        self.year
    }
}

impl Keyed for WasteRow {
    type Key = RegionKey;

    fn key(&self) -> &RegionKey {
        &self.region
    }

    fn year(&self) -> Option<f64> {
        self.year
    }
}

impl Keyed for QualityRow {
    type Key = String;

    fn key(&self) -> &String {
        &self.province
    }

    fn year(&self) -> Option<f64> {
        self.year
    }
}

/// Одна строка на ключ.
///
/// С колонкой года: сортировка (ключ по возрастанию, год по убыванию,
/// пропущенный год в конце) и первая строка каждого ключа. Без года
/// побеждает первая встреченная строка. Результат упорядочен по ключу.
pub fn latest_per_key<T: Keyed>(mut rows: Vec<T>, has_year: bool) -> Vec<T> {
    if has_year {
        // sort_by стабильна: равные (ключ, год) сохраняют порядок загрузки
        rows.sort_by(|a, b| {
            a.key()
                .cmp(b.key())
                .then_with(|| compare_year_desc(a.year(), b.year()))
        });
    } else {
        rows.sort_by(|a, b| a.key().cmp(b.key()));
    }

    // dedup_by оставляет первую строку из серии равных ключей
    rows.dedup_by(|later, first| later.key() == first.key());
    rows
}

fn compare_year_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Доступ к ячейкам по полям схемы с подсчётом ошибок разбора
struct FieldReader<'a> {
    table: &'a RawTable,
    schema: ResolvedSchema,
    stats: CleaningStats,
}

impl<'a> FieldReader<'a> {
    fn new(source: SourceKind, table: &'a RawTable) -> Result<Self> {
        let declared = SourceSchema::for_source(source);
        let schema = declared.resolve(table)?;
        Ok(Self {
            table,
            schema,
            stats: CleaningStats {
                source: Some(source),
                input_rows: table.len(),
                ..CleaningStats::default()
            },
        })
    }

    fn text(&self, row: usize, field: &str) -> Option<String> {
        let column = self.schema.column(field)?;
        self.table.cell(row, column).as_text()
    }

    fn number(&mut self, row: usize, field: &str) -> Option<f64> {
        debug_assert!(
            self.schema.kind(field).map_or(true, |kind| kind == FieldKind::Number),
            "{field} is not declared numeric"
        );
        let column = self.schema.column(field)?;
        let cell = self.table.cell(row, column);
        let value = coerce_number(cell);
        if value.is_none() && !is_missing_marker(cell) {
            *self.stats.invalid_numbers.entry(field.to_string()).or_default() += 1;
        }
        value
    }

    fn has(&self, field: &str) -> bool {
        self.schema.has(field)
    }

    fn finish(self) -> CleaningStats {
        for (field, count) in &self.stats.invalid_numbers {
            tracing::warn!(
                "{}: {} cells in {} are not numbers, treated as missing",
                self.schema.source,
                count,
                field
            );
        }
        self.stats
    }
}

fn is_missing_marker(cell: &RawValue) -> bool {
    match cell {
        RawValue::Text(s) => s.trim() == "-",
        other => other.is_empty(),
    }
}

/// Число школ по региону (непустые названия школ)
pub fn aggregate_schools(table: &RawTable) -> Result<Cleaned<(RegionKey, u32)>> {
    let reader = FieldReader::new(SourceKind::Schools, table)?;
    let mut counts: BTreeMap<RegionKey, u32> = BTreeMap::new();

    for row in 0..table.len() {
        let region = normalize_region_name(&reader.text(row, KABKOT).unwrap_or_default());
        let count = counts.entry(region).or_insert(0);
        if reader.text(row, NAMA_SEKOLAH).is_some() {
            *count += 1;
        }
    }

    let stats = reader.finish();
    tracing::info!("Schools: {} rows -> {} regions", stats.input_rows, counts.len());

    Ok(Cleaned {
        rows: counts.into_iter().collect(),
        stats,
    })
}

/// Таблица RTH: площадь и доля зелёных зон, последний год на регион
pub fn clean_green_space(table: &RawTable) -> Result<Cleaned<GreenSpaceRow>> {
    let mut reader = FieldReader::new(SourceKind::GreenSpace, table)?;
    let has_year = reader.has(TAHUN);
    let mut rows = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let area = reader.number(row, LUAS_WILAYAH);
        let green_space_percent = reader.number(row, PERSEN_RTH);
        let year = reader.number(row, TAHUN);

        // Без площади регион нельзя нормировать
        let Some(area_km2) = area else {
            reader.stats.dropped_rows += 1;
            continue;
        };

        rows.push(GreenSpaceRow {
            region: normalize_region_name(&reader.text(row, KABKOT).unwrap_or_default()),
            year,
            province: reader.text(row, PROVINSI).as_deref().and_then(normalize_province),
            area_km2,
            green_space_percent,
        });
    }

    finish_deduplicated(reader, rows, has_year)
}

/// Таблица отходов: суточный и годовой объём, последний год на регион
pub fn clean_waste(table: &RawTable) -> Result<Cleaned<WasteRow>> {
    let mut reader = FieldReader::new(SourceKind::Waste, table)?;
    let has_year = reader.has(TAHUN);
    let mut rows = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let daily_waste_ton = reader.number(row, SAMPAH_HARIAN_TON);
        let annual_waste_ton = reader.number(row, SAMPAH_TAHUNAN_TON);
        let year = reader.number(row, TAHUN);

        rows.push(WasteRow {
            region: normalize_region_name(&reader.text(row, KABKOT).unwrap_or_default()),
            year,
            daily_waste_ton,
            annual_waste_ton,
        });
    }

    finish_deduplicated(reader, rows, has_year)
}

/// Индекс качества воды или воздуха по провинциям
pub fn clean_quality(source: SourceKind, table: &RawTable) -> Result<Cleaned<QualityRow>> {
    let index_field = match source {
        SourceKind::WaterQuality => IKA,
        _ => IKU,
    };
    let mut reader = FieldReader::new(source, table)?;
    let has_year = reader.has(TAHUN);
    let mut rows = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let index = reader.number(row, index_field);
        let year = reader.number(row, TAHUN);
        let Some(province) = reader.text(row, PROVINSI).as_deref().and_then(normalize_province) else {
            reader.stats.dropped_rows += 1;
            continue;
        };
        rows.push(QualityRow {
            province,
            year,
            index,
        });
    }

    finish_deduplicated(reader, rows, has_year)
}

fn finish_deduplicated<T: Keyed>(
    reader: FieldReader<'_>,
    rows: Vec<T>,
    has_year: bool,
) -> Result<Cleaned<T>> {
    let before = rows.len();
    let rows = latest_per_key(rows, has_year);

    let mut stats = reader.finish();
    stats.duplicates_removed = before - rows.len();

    tracing::info!(
        "{}: {} rows, {} dropped, {} duplicates removed -> {} keys",
        stats.source.map(|s| s.label()).unwrap_or_default(),
        stats.input_rows,
        stats.dropped_rows,
        stats.duplicates_removed,
        rows.len()
    );

    Ok(Cleaned { rows, stats })
}

/// Провинция региона по первой встреченной строке RTH.
/// Порядок загрузки, до удаления строк без площади; согласованность не проверяется.
pub fn first_seen_provinces(table: &RawTable) -> Result<BTreeMap<RegionKey, Option<String>>> {
    let schema = SourceSchema::for_source(SourceKind::GreenSpace).resolve(table)?;
    let mut provinces = BTreeMap::new();

    let (Some(region_col), province_col) = (schema.column(KABKOT), schema.column(PROVINSI)) else {
        return Ok(provinces);
    };

    for row in 0..table.len() {
        let region = normalize_region_name(&table.cell(row, region_col).as_text().unwrap_or_default());
        provinces.entry(region).or_insert_with(|| {
            province_col
                .and_then(|col| table.cell(row, col).as_text())
                .as_deref()
                .and_then(normalize_province)
        });
    }

    Ok(provinces)
}
