//! Объявленные схемы источников.
//!
//! Для каждого логического поля задан упорядоченный список точных
//! псевдонимов заголовка и запасное ключевое слово. Схема разрешается
//! один раз сразу после загрузки; все отсутствующие обязательные поля
//! возвращаются одной ошибкой.

use std::collections::HashMap;

use super::{RawTable, SourceKind};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Точные заголовки (без учёта регистра), проверяются по порядку
    pub aliases: &'static [&'static str],
    /// Подстрока, если ни один псевдоним не совпал
    pub keyword: Option<&'static str>,
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn required(
        name: &'static str,
        aliases: &'static [&'static str],
        keyword: &'static str,
        kind: FieldKind,
    ) -> Self {
        Self {
            name,
            aliases,
            keyword: Some(keyword),
            required: true,
            kind,
        }
    }

    const fn optional(
        name: &'static str,
        aliases: &'static [&'static str],
        keyword: &'static str,
        kind: FieldKind,
    ) -> Self {
        Self {
            name,
            aliases,
            keyword: Some(keyword),
            required: false,
            kind,
        }
    }
}

pub const KABKOT: &str = "KABKOT";
pub const NAMA_SEKOLAH: &str = "NAMA_SEKOLAH";
pub const TAHUN: &str = "TAHUN";
pub const PROVINSI: &str = "PROVINSI";
pub const IKA: &str = "IKA";
pub const IKU: &str = "IKU";

const REGION: FieldSpec =
    FieldSpec::required(KABKOT, &["Kabupaten/Kota", "Kab/Kota", "KABKOT_STD"], "Kabupaten", FieldKind::Text);
// Без ключевого слова: "Tahun" входит в "Timbulan Sampah Tahunan(ton)"
const YEAR: FieldSpec = FieldSpec {
    name: TAHUN,
    aliases: &["Tahun", "Year"],
    keyword: None,
    required: false,
    kind: FieldKind::Number,
};

const SCHOOL_FIELDS: &[FieldSpec] = &[
    REGION,
    FieldSpec::required(NAMA_SEKOLAH, &["Nama Sekolah"], "Nama Sekolah", FieldKind::Text),
];

const GREEN_SPACE_FIELDS: &[FieldSpec] = &[
    REGION,
    YEAR,
    FieldSpec::optional(PROVINSI, &["Provinsi"], "Provinsi", FieldKind::Text),
    FieldSpec::required(
        crate::types::LUAS_WILAYAH,
        &["Luas Wilayah (km2)(A)", "LUAS_WILAYAH", "LUAS_WILAYAH_KM2"],
        "Luas Wilayah",
        FieldKind::Number,
    ),
    FieldSpec::required(
        crate::types::PERSEN_RTH,
        &["% RTH(B/A)", "PERSEN_RTH", "RTH_PERSEN", "% RTH"],
        "% RTH",
        FieldKind::Number,
    ),
];

const WASTE_FIELDS: &[FieldSpec] = &[
    REGION,
    YEAR,
    FieldSpec::required(
        crate::types::SAMPAH_HARIAN_TON,
        &["Timbulan Sampah Harian(ton)", "SAMPAH_HARIAN_TON", "TIMBULAN_SAMPAH_HARIAN"],
        "Harian",
        FieldKind::Number,
    ),
    FieldSpec::required(
        crate::types::SAMPAH_TAHUNAN_TON,
        &["Timbulan Sampah Tahunan(ton)", "SAMPAH_TAHUNAN_TON", "TIMBULAN_SAMPAH_TAHUNAN"],
        "Tahunan",
        FieldKind::Number,
    ),
];

const WATER_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(PROVINSI, &["Provinsi"], "Provinsi", FieldKind::Text),
    YEAR,
    FieldSpec::required(IKA, &["Indeks Kualitas Air", "IKA"], "Kualitas Air", FieldKind::Number),
];

const AIR_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(PROVINSI, &["Provinsi"], "Provinsi", FieldKind::Text),
    YEAR,
    FieldSpec::required(IKU, &["Indeks Kualitas Udara", "IKU"], "Kualitas Udara", FieldKind::Number),
];

/// Схема одного источника
#[derive(Debug, Clone, Copy)]
pub struct SourceSchema {
    pub source: SourceKind,
    pub fields: &'static [FieldSpec],
}

impl SourceSchema {
    pub fn for_source(source: SourceKind) -> Self {
        let fields = match source {
            SourceKind::Schools => SCHOOL_FIELDS,
            SourceKind::GreenSpace => GREEN_SPACE_FIELDS,
            SourceKind::Waste => WASTE_FIELDS,
            SourceKind::WaterQuality => WATER_FIELDS,
            SourceKind::AirQuality => AIR_FIELDS,
        };
        Self { source, fields }
    }

    /// Сопоставление полей схемы с колонками таблицы
    pub fn resolve(&self, table: &RawTable) -> Result<ResolvedSchema> {
        let mut columns = HashMap::new();
        let mut missing = Vec::new();

        for field in self.fields {
            match self.find_column(field, &table.headers)? {
                Some(index) => {
                    columns.insert(field.name, (index, field.kind));
                }
                None if field.required => missing.push(field.name.to_string()),
                None => {
                    tracing::debug!("{}: optional column {} not present", self.source, field.name)
                }
            }
        }

        if !missing.is_empty() {
            return Err(PipelineError::SchemaMismatch {
                source_kind: self.source,
                missing,
                headers: table.headers.clone(),
            });
        }

        Ok(ResolvedSchema {
            source: self.source,
            columns,
        })
    }

    fn find_column(&self, field: &FieldSpec, headers: &[String]) -> Result<Option<usize>> {
        for alias in field.aliases {
            if let Some(index) = headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(alias))
            {
                return Ok(Some(index));
            }
        }

        let Some(keyword) = field.keyword else {
            return Ok(None);
        };
        let keyword = keyword.to_lowercase();
        let candidates: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.to_lowercase().contains(&keyword))
            .map(|(i, _)| i)
            .collect();

        match candidates.as_slice() {
            [] => Ok(None),
            [index] => Ok(Some(*index)),
            _ => Err(PipelineError::AmbiguousHeader {
                source_kind: self.source,
                field: field.name.to_string(),
                candidates: candidates.iter().map(|&i| headers[i].clone()).collect(),
            }),
        }
    }
}

/// Результат разрешения схемы: поле -> индекс колонки
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    pub source: SourceKind,
    columns: HashMap<&'static str, (usize, FieldKind)>,
}

impl ResolvedSchema {
    pub fn column(&self, field: &str) -> Option<usize> {
        self.columns.get(field).map(|(index, _)| *index)
    }

    pub fn kind(&self, field: &str) -> Option<FieldKind> {
        self.columns.get(field).map(|(_, kind)| *kind)
    }

    pub fn has(&self, field: &str) -> bool {
        self.columns.contains_key(field)
    }
}
