//! Сборка таблицы регионов из очищенных источников

use std::collections::BTreeMap;

use crate::preprocessing::cleaning::{GreenSpaceRow, QualityRow, WasteRow};
use crate::types::{RegionFact, RegionKey};

/// Левое соединение от агрегата школ: регион попадает в таблицу,
/// только если он есть в реестре школ. Отсутствующие справа значения
/// остаются пропусками. Провинция берётся из первой строки RTH,
/// IKA/IKU присоединяются по провинции.
pub fn build_region_table(
    schools: &[(RegionKey, u32)],
    green_space: &[GreenSpaceRow],
    waste: &[WasteRow],
    provinces: &BTreeMap<RegionKey, Option<String>>,
    water: &[QualityRow],
    air: &[QualityRow],
) -> Vec<RegionFact> {
    let green: BTreeMap<&RegionKey, &GreenSpaceRow> = green_space.iter().map(|r| (&r.region, r)).collect();
    let waste: BTreeMap<&RegionKey, &WasteRow> = waste.iter().map(|r| (&r.region, r)).collect();
    let water: BTreeMap<&str, Option<f64>> = water.iter().map(|r| (r.province.as_str(), r.index)).collect();
    let air: BTreeMap<&str, Option<f64>> = air.iter().map(|r| (r.province.as_str(), r.index)).collect();

    let mut facts: Vec<RegionFact> = schools
        .iter()
        .map(|(region, school_count)| {
            let green = green.get(region);
            let waste = waste.get(region);
            let province = provinces.get(region).cloned().flatten();
            let by_province = |table: &BTreeMap<&str, Option<f64>>| {
                province.as_deref().and_then(|p| table.get(p).copied().flatten())
            };

            RegionFact {
                region: region.clone(),
                school_count: *school_count,
                green_space_percent: green.and_then(|g| g.green_space_percent),
                area_km2: green.map(|g| g.area_km2),
                daily_waste_ton: waste.and_then(|w| w.daily_waste_ton),
                annual_waste_ton: waste.and_then(|w| w.annual_waste_ton),
                water_index: by_province(&water),
                air_index: by_province(&air),
                province,
            }
        })
        .collect();

    facts.sort_by(|a, b| a.region.cmp(&b.region));

    let without_area = facts.iter().filter(|f| f.area_km2.is_none()).count();
    let without_waste = facts.iter().filter(|f| f.daily_waste_ton.is_none()).count();
    tracing::info!(
        "Region table: {} regions ({} without area, {} without waste)",
        facts.len(),
        without_area,
        without_waste
    );

    facts
}
