//! Общие фикстуры: пять источников в temp-директории

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use adiwiyata_ml::types::MODEL_FEATURES;
use adiwiyata_ml::Config;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

pub const SCHOOLS_CSV: &str = "\
No,Nama Sekolah,Kabupaten/Kota
1,SDN 1 Bandung,Kota Bandung
2,SDN 2 Bandung,KOTA BANDUNG
3,SMPN 1 Bandung,Kota  Bandung
4,SMAN 3 Bandung,kota bandung
5,SDN 1 Cibinong,KAB. BOGOR
6,SDN 2 Cibinong,Kabupaten Bogor
7,SMPN 1 Cibinong,Kab Bogor
8,SDN 1 Garut,Kabupaten Garut
9,SDN 1 Denpasar,KOTA DENPASAR
10,SDN 2 Denpasar,Kota Denpasar
11,SDN 3 Denpasar,Kota Denpasar
12,SDN 4 Denpasar,Kota Denpasar
13,SDN 5 Denpasar,Kota Denpasar
14,SDN 1 Kuta,Kab Badung
15,SDN 2 Kuta,Kab. Badung
16,SDN 1 Ubud,Kab. Gianyar
";

pub const WATER_CSV: &str = "\
Provinsi;Tahun;Indeks Kualitas Air
JAWA BARAT;2021;40
JAWA BARAT;2022;48,5
BALI;2022;61,2
";

pub const AIR_CSV: &str = "\
Provinsi,Indeks Kualitas Udara
Jawa Barat,85
Bali,70
";

/// Модель: LOG_ADIWIYATA_PER_KM2 <= 0.01 -> класс 0, иначе класс 1
pub fn model_json(feature_names: &[&str]) -> String {
    serde_json::json!({
        "name": "tree",
        "version": "v4",
        "objective": "binary sigmoid:1",
        "feature_names": feature_names,
        "tree_info": [{
            "tree_index": 0,
            "num_leaves": 2,
            "tree_structure": {
                "split_index": 0,
                "split_feature": 0,
                "split_gain": 10.5,
                "threshold": 0.01,
                "decision_type": "<=",
                "default_left": true,
                "missing_type": "None",
                "internal_value": 0,
                "left_child": { "leaf_index": 0, "leaf_value": -1.0, "leaf_count": 3 },
                "right_child": { "leaf_index": 1, "leaf_value": 1.0, "leaf_count": 2 }
            }
        }],
        "feature_importances": { "LOG_ADIWIYATA_PER_KM2": 1 }
    })
    .to_string()
}

fn write_green_space(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let headers = ["Provinsi", "Kabupaten/Kota", "Tahun", "Luas Wilayah (km2)(A)", "% RTH(B/A)"];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }

    let rows: [(&str, &str, f64, Option<f64>, f64); 7] = [
        ("JAWA BARAT", "Kota Bandung", 2021.0, Some(167.3), 12.0),
        ("Jawa Barat", "KOTA BANDUNG", 2022.0, Some(167.7), 13.5),
        ("Jawa Barat", "Kabupaten Bogor", 2022.0, Some(2986.2), 30.1),
        ("Jawa Barat", "Kab. Garut", 2022.0, Some(3065.2), 45.0),
        ("Bali", "Kota Denpasar", 2022.0, Some(127.8), 8.2),
        ("Bali", "Kab. Badung", 2022.0, Some(418.5), 20.0),
        ("Bali", "Kab. Gianyar", 2022.0, None, 25.0),
    ];
    for (i, (province, region, year, area, green)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *province).unwrap();
        sheet.write_string(row, 1, *region).unwrap();
        sheet.write_number(row, 2, *year).unwrap();
        match area {
            Some(area) => sheet.write_number(row, 3, *area).unwrap(),
            None => sheet.write_string(row, 3, "-").unwrap(),
        };
        sheet.write_number(row, 4, *green).unwrap();
    }

    workbook.save(path).unwrap();
}

fn write_waste(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let headers = ["Kabupaten/Kota", "Tahun", "Timbulan Sampah Harian(ton)", "Timbulan Sampah Tahunan(ton)"];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }

    let rows: [(&str, f64, f64); 6] = [
        ("Kota Bandung", 1594.2, 581883.0),
        ("Kab. Bogor", 2941.3, 1073574.5),
        ("Kab. Garut", 1017.1, 371241.5),
        ("Kota Denpasar", 920.5, 335982.5),
        ("Kab. Badung", 530.1, 193486.5),
        ("Kab. Sleman", 700.0, 255500.0),
    ];
    for (i, (region, daily, annual)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *region).unwrap();
        sheet.write_number(row, 1, 2022.0).unwrap();
        sheet.write_number(row, 2, *daily).unwrap();
        sheet.write_number(row, 3, *annual).unwrap();
    }

    workbook.save(path).unwrap();
}

pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    /// Все пять источников и модель
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_data_dir(dir.path());
        config.model_path = dir.path().join("model.json");

        let fixture = Self { dir, config };
        fs::write(fixture.path(&fixture.config.files.schools), SCHOOLS_CSV).unwrap();
        write_green_space(&fixture.path(&fixture.config.files.green_space));
        write_waste(&fixture.path(&fixture.config.files.waste));
        fs::write(fixture.path(&fixture.config.files.water_quality), WATER_CSV).unwrap();
        fs::write(fixture.path(&fixture.config.files.air_quality), AIR_CSV).unwrap();
        fs::write(&fixture.config.model_path, model_json(&MODEL_FEATURES)).unwrap();
        fixture
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }
}
