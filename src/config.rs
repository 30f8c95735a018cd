//! Конфигурация: пути к источникам, модели и адрес сервера

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sources::SourceKind;

pub const CONFIG_ENV: &str = "ADIWIYATA_CONFIG";
pub const DATA_DIR_ENV: &str = "ADIWIYATA_DATA_DIR";
pub const MODEL_PATH_ENV: &str = "ADIWIYATA_MODEL_PATH";
pub const BIND_ENV: &str = "ADIWIYATA_BIND";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFiles {
    pub schools: String,
    pub green_space: String,
    pub waste: String,
    pub water_quality: String,
    pub air_quality: String,
}

impl Default for SourceFiles {
    fn default() -> Self {
        Self {
            schools: "sekolah adiwiyata - sekolah adiwiyata.csv".to_string(),
            green_space: "Data_RTH.xlsx".to_string(),
            waste: "Data_Timbulan_Sampah.xlsx".to_string(),
            water_quality: "Indeks_Kualitas_Air.csv".to_string(),
            air_quality: "indeks_kualitas_udara.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub files: SourceFiles,
    pub model_path: PathBuf,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("Dataset_DS"),
            files: SourceFiles::default(),
            model_path: PathBuf::from("model_lgbm_adiwiyata.json"),
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

impl Config {
    /// Конфигурация с данными в указанной директории
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// TOML из `ADIWIYATA_CONFIG` (если задан), затем переменные окружения
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };

        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(model) = std::env::var_os(MODEL_PATH_ENV) {
            config.model_path = PathBuf::from(model);
        }
        if let Ok(bind) = std::env::var(BIND_ENV) {
            config.bind_addr = bind;
        }

        Ok(config)
    }

    pub fn source_path(&self, source: SourceKind) -> PathBuf {
        let file = match source {
            SourceKind::Schools => &self.files.schools,
            SourceKind::GreenSpace => &self.files.green_space,
            SourceKind::Waste => &self.files.waste,
            SourceKind::WaterQuality => &self.files.water_quality,
            SourceKind::AirQuality => &self.files.air_quality,
        };
        self.data_dir.join(file)
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}
