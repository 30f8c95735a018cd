//! Нормализация названий кабупатенов и кот

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{RegionKey, UNKNOWN_REGION};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static KOTA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^KOTA\b").unwrap());
// Префикс вместе со всеми точками и пробелами после него
static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:KABUPATEN|KAB|KOTA)\b[\s.]*").unwrap());

/// Канонический ключ региона из произвольного написания.
///
/// "kab. Bogor", "KABUPATEN   BOGOR" и "Kab Bogor" дают "Kab. Bogor";
/// "KOTA Bandung" даёт "Kota Bandung". Пустое или прочерковое
/// название ("Kab. -") даёт "Tidak Diketahui".
pub fn normalize_region_name(raw: &str) -> RegionKey {
    let cleaned = raw.replace('\u{a0}', " ");
    let cleaned = WHITESPACE_RE.replace_all(&cleaned, " ");
    let upper = cleaned.trim().to_uppercase();

    let is_kota = KOTA_RE.is_match(&upper);

    let core = PREFIX_RE.replace(&upper, "");
    let core = title_case(core.trim().trim_start_matches('.').trim());

    let rebuilt = if is_kota {
        format!("Kota {core}")
    } else {
        format!("Kab. {core}")
    };

    if core.is_empty() || rebuilt == "Kab. -" || rebuilt == "Kota -" {
        return RegionKey::from_canonical(UNKNOWN_REGION.to_string());
    }

    RegionKey::from_canonical(rebuilt)
}

/// Нормализация последовательности названий; длина сохраняется
pub fn normalize_region_names<'a, I>(names: I) -> Vec<RegionKey>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().map(normalize_region_name).collect()
}

/// Название провинции для соединения: верхний регистр без краевых пробелов
pub fn normalize_province(raw: &str) -> Option<String> {
    let cleaned = raw.replace('\u{a0}', " ");
    let cleaned = WHITESPACE_RE.replace_all(cleaned.trim(), " ").to_uppercase();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Заглавная буква в начале каждого слова, остальные строчные.
/// Словом считается любая последовательность букв ("Toli-Toli").
fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut prev_is_letter = false;

    for ch in value.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                result.extend(ch.to_lowercase());
            } else {
                result.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            result.push(ch);
            prev_is_letter = false;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> String {
        normalize_region_name(raw).as_str().to_string()
    }

    #[test]
    fn regency_spellings_collapse_to_one_key() {
        for raw in ["kab. Bogor", "KABUPATEN   BOGOR", "Kab Bogor", " KAB.BOGOR ", "Kabupaten\u{a0}Bogor", "KAB . BOGOR"] {
            assert_eq!(key(raw), "Kab. Bogor", "input {raw:?}");
        }
    }

    #[test]
    fn city_prefix_is_detected() {
        assert_eq!(key("KOTA Bandung"), "Kota Bandung");
        assert_eq!(key("kota   bandung"), "Kota Bandung");
        assert_eq!(key("Kota. Bandung"), "Kota Bandung");
    }

    #[test]
    fn prefix_dot_does_not_leak_into_name() {
        assert_eq!(key("KAB.. SIAK"), "Kab. Siak");
        assert_eq!(key("KOTA .BATAM"), "Kota Batam");
    }

    #[test]
    fn bare_name_is_treated_as_regency() {
        assert_eq!(key("BANDUNG BARAT"), "Kab. Bandung Barat");
    }

    #[test]
    fn prefix_inside_word_is_kept() {
        assert_eq!(key("KOTAMOBAGU"), "Kab. Kotamobagu");
        assert_eq!(key("KOTA KOTAMOBAGU"), "Kota Kotamobagu");
    }

    #[test]
    fn dash_placeholder_maps_to_unknown() {
        assert_eq!(key("Kab. -"), UNKNOWN_REGION);
        assert_eq!(key("KOTA -"), UNKNOWN_REGION);
        assert_eq!(key("-"), UNKNOWN_REGION);
        assert_eq!(key(""), UNKNOWN_REGION);
        assert!(normalize_region_name("KAB").is_unknown());
    }

    #[test]
    fn hyphenated_names_capitalise_each_part() {
        assert_eq!(key("KAB. TOLI-TOLI"), "Kab. Toli-Toli");
        assert_eq!(key("KABUPATEN PANGKAJENE DAN KEPULAUAN"), "Kab. Pangkajene Dan Kepulauan");
    }

    #[test]
    fn sequence_keeps_length_and_order() {
        let keys = normalize_region_names(["KOTA SURABAYA", "kab sleman", "-"]);
        let keys: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["Kota Surabaya", "Kab. Sleman", UNKNOWN_REGION]);
    }

    #[test]
    fn province_is_upper_cased_and_trimmed() {
        assert_eq!(normalize_province("  Jawa  Barat ").as_deref(), Some("JAWA BARAT"));
        assert_eq!(normalize_province("   "), None);
    }
}
