//! Конвейер: источники -> очистка -> таблица регионов -> EDA / модель

pub mod builder;
pub mod cache;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{EdaReport, OverviewSummary};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::models::{evaluate, BinaryClassifier, GradientBoostedTrees};
use crate::preprocessing::cleaning::{self, CleaningStats};
use crate::preprocessing::{FeatureEngineer, LabelDeriver};
use crate::sources::{check_sources, load_table, RawTable, SourceKind, SourceStatus};
use crate::types::{LabelSet, ModelResults, RegionFact};

pub use builder::build_region_table;
pub use cache::{PipelineCache, SourceFingerprint};

/// Сырые таблицы пяти источников
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub schools: RawTable,
    pub green_space: RawTable,
    pub waste: RawTable,
    pub water_quality: RawTable,
    pub air_quality: RawTable,
}

impl SourceTables {
    pub fn load(config: &Config) -> Result<Self> {
        let load = |source| load_table(source, &config.source_path(source));
        Ok(Self {
            schools: load(SourceKind::Schools)?,
            green_space: load(SourceKind::GreenSpace)?,
            waste: load(SourceKind::Waste)?,
            water_quality: load(SourceKind::WaterQuality)?,
            air_quality: load(SourceKind::AirQuality)?,
        })
    }
}

/// Очистка всех источников и сборка таблицы регионов
pub fn prepare_tables(tables: &SourceTables) -> Result<(Vec<RegionFact>, Vec<CleaningStats>)> {
    let schools = cleaning::aggregate_schools(&tables.schools)?;
    let green = cleaning::clean_green_space(&tables.green_space)?;
    let provinces = cleaning::first_seen_provinces(&tables.green_space)?;
    let waste = cleaning::clean_waste(&tables.waste)?;
    let water = cleaning::clean_quality(SourceKind::WaterQuality, &tables.water_quality)?;
    let air = cleaning::clean_quality(SourceKind::AirQuality, &tables.air_quality)?;

    let facts = build_region_table(
        &schools.rows,
        &green.rows,
        &waste.rows,
        &provinces,
        &water.rows,
        &air.rows,
    );

    let stats = vec![schools.stats, green.stats, waste.stats, water.stats, air.stats];
    Ok((facts, stats))
}

/// Подготовленная таблица регионов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedData {
    pub fingerprint: SourceFingerprint,
    pub prepared_at: DateTime<Utc>,
    pub regions: Vec<RegionFact>,
    pub cleaning: Vec<CleaningStats>,
}

/// Ответ этапа подготовки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareSummary {
    pub fingerprint: SourceFingerprint,
    pub prepared_at: DateTime<Utc>,
    /// true, если таблица взята из кеша без пересчёта
    pub reused: bool,
    pub overview: OverviewSummary,
    pub cleaning: Vec<CleaningStats>,
}

impl PrepareSummary {
    fn new(data: &PreparedData, reused: bool) -> Self {
        Self {
            fingerprint: data.fingerprint.clone(),
            prepared_at: data.prepared_at,
            reused,
            overview: OverviewSummary::from_facts(&data.regions),
            cleaning: data.cleaning.clone(),
        }
    }
}

pub struct Pipeline {
    config: Config,
    cache: PipelineCache,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cache: PipelineCache::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sources(&self) -> Vec<SourceStatus> {
        check_sources(&self.config)
    }

    fn source_paths(&self) -> Vec<PathBuf> {
        SourceKind::ALL.iter().map(|&s| self.config.source_path(s)).collect()
    }

    /// Этап подготовки. Блокируется, пока нет хотя бы одного файла;
    /// при неизменном отпечатке файлов таблица берётся из кеша.
    pub fn prepare(&mut self) -> Result<PrepareSummary> {
        let missing: Vec<SourceStatus> = self.sources().into_iter().filter(|s| !s.exists).collect();
        if !missing.is_empty() {
            for status in &missing {
                tracing::warn!("Source {} not found at {}", status.source, status.path.display());
            }
            return Err(PipelineError::MissingSources(missing));
        }

        let fingerprint = SourceFingerprint::compute(&self.source_paths());
        if let Some(cached) = self.cache.lookup(&fingerprint) {
            tracing::info!("Sources unchanged ({}), reusing prepared table", fingerprint);
            return Ok(PrepareSummary::new(&cached, true));
        }

        tracing::info!("Preparing region table from {}", self.config.data_dir.display());
        let tables = SourceTables::load(&self.config)?;
        let (regions, cleaning) = prepare_tables(&tables)?;

        let data = self.cache.store_prepared(PreparedData {
            fingerprint,
            prepared_at: Utc::now(),
            regions,
            cleaning,
        });
        Ok(PrepareSummary::new(&data, false))
    }

    pub fn prepared(&self) -> Result<Arc<PreparedData>> {
        self.cache.prepared().ok_or(PipelineError::NotPrepared)
    }

    pub fn eda(&self) -> Result<EdaReport> {
        let data = self.prepared()?;
        let derived = FeatureEngineer::derive(&data.regions);
        Ok(EdaReport::build(&data.regions, &derived))
    }

    pub fn labels(&self) -> Result<LabelSet> {
        let data = self.prepared()?;
        LabelDeriver::derive(&FeatureEngineer::derive(&data.regions))
    }

    /// Этап моделирования с моделью из `config.model_path`
    pub fn run_model(&mut self) -> Result<Arc<ModelResults>> {
        // таблица нужна раньше модели: без неё ошибка загрузки модели вторична
        self.prepared()?;
        let classifier = GradientBoostedTrees::load(self.config.model_path())?;
        self.run_model_with(&classifier)
    }

    pub fn run_model_with(&mut self, classifier: &dyn BinaryClassifier) -> Result<Arc<ModelResults>> {
        let labels = self.labels()?;
        let results = evaluate(classifier, &labels)?;
        Ok(self.cache.store_results(results))
    }

    pub fn results(&self) -> Result<Arc<ModelResults>> {
        self.cache.results().ok_or(PipelineError::NoResults)
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::RawValue;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        let mut table = RawTable::new(headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.rows.push(
                row.iter()
                    .map(|c| if c.is_empty() { RawValue::Empty } else { RawValue::Text(c.to_string()) })
                    .collect(),
            );
        }
        table
    }

    fn tables() -> SourceTables {
        SourceTables {
            schools: table(
                &["Kabupaten/Kota", "Nama Sekolah"],
                &[
                    &["KOTA BANDUNG", "SMA 1"],
                    &["Kota  Bandung", "SMA 2"],
                    &["KABUPATEN BOGOR", "SD 3"],
                ],
            ),
            green_space: table(
                &["Kabupaten/Kota", "Tahun", "Provinsi", "Luas Wilayah (km2)(A)", "% RTH(B/A)"],
                &[
                    &["Kota Bandung", "2020", "Jawa Barat", "167,3", "12"],
                    &["Kota Bandung", "2022", "Jawa Barat", "167,7", "13,5"],
                    &["Kab. Bogor", "2022", "Jawa Barat", "-", "30"],
                ],
            ),
            waste: table(
                &["Kabupaten/Kota", "Tahun", "Timbulan Sampah Harian(ton)", "Timbulan Sampah Tahunan(ton)"],
                &[&["Kab Bogor", "2022", "2500", "912500"], &["Kab. Garut", "2022", "800", "292000"]],
            ),
            water_quality: table(&["Provinsi", "Indeks Kualitas Air"], &[&["JAWA BARAT", "51,2"]]),
            air_quality: table(&["Provinsi", "Indeks Kualitas Udara"], &[&["Jawa Barat", "80"]]),
        }
    }

    #[test]
    fn prepares_region_table_from_raw_tables() {
        let (facts, stats) = prepare_tables(&tables()).unwrap();

        assert_eq!(facts.len(), 2);
        let bogor = &facts[0];
        assert_eq!(bogor.region.as_str(), "Kab. Bogor");
        assert_eq!(bogor.school_count, 1);
        assert_eq!(bogor.area_km2, None);
        assert_eq!(bogor.daily_waste_ton, Some(2500.0));
        // провинция берётся из RTH до отбрасывания строк без площади
        assert_eq!(bogor.water_index, Some(51.2));

        let bandung = &facts[1];
        assert_eq!(bandung.school_count, 2);
        assert_eq!(bandung.area_km2, Some(167.7));
        assert_eq!(bandung.green_space_percent, Some(13.5));
        assert_eq!(bandung.daily_waste_ton, None);
        assert_eq!(bandung.air_index, Some(80.0));

        assert_eq!(stats.len(), 5);
        assert_eq!(stats[1].dropped_rows, 1);
        assert_eq!(stats[1].duplicates_removed, 1);
    }

    #[test]
    fn prepare_is_blocked_while_sources_are_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(Config::with_data_dir(dir.path()));

        match pipeline.prepare().unwrap_err() {
            PipelineError::MissingSources(missing) => assert_eq!(missing.len(), 5),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(pipeline.eda(), Err(PipelineError::NotPrepared)));
        assert!(matches!(pipeline.results(), Err(PipelineError::NoResults)));
    }
}
