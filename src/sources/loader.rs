//! Загрузка таблиц из CSV и книг Excel

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use super::{RawTable, RawValue, SourceKind};
use crate::error::{PipelineError, Result};

/// Загрузка таблицы источника; формат определяется по расширению
pub fn load_table(source: SourceKind, path: &Path) -> Result<RawTable> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let load_error = |message: String| PipelineError::Load {
        source_kind: source,
        path: path.to_path_buf(),
        message,
    };

    let table = match extension.as_str() {
        "csv" | "tsv" | "txt" => {
            let bytes = std::fs::read(path).map_err(|e| load_error(e.to_string()))?;
            let content = String::from_utf8_lossy(&bytes);
            parse_delimited(&content).map_err(load_error)?
        }
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path).map_err(load_error)?,
        other => return Err(load_error(format!("unsupported file extension '{other}'"))),
    };

    tracing::debug!(
        "Loaded {} from {}: {} rows, headers {:?}",
        source,
        path.display(),
        table.len(),
        table.headers
    );

    Ok(table)
}

/// Разбор CSV/TSV из строки; первая запись - заголовки
pub fn parse_delimited(content: &str) -> std::result::Result<RawTable, String> {
    let content = content.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let headers = match records.next() {
        Some(record) => record
            .map_err(|e| e.to_string())?
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
        None => return Err("file is empty".to_string()),
    };

    let mut table = RawTable::new(headers);
    for record in records {
        let record = record.map_err(|e| e.to_string())?;
        let row: Vec<RawValue> = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    RawValue::Empty
                } else {
                    RawValue::Text(field.to_string())
                }
            })
            .collect();
        push_row(&mut table, row);
    }

    Ok(table)
}

/// Разделитель, дающий одинаковое число полей (>1) в первых строках
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b',', b';', b'\t', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0usize;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count();
        let score = consistent * target;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Первый лист книги; первая строка - заголовки
fn read_workbook(path: &Path) -> std::result::Result<RawTable, String> {
    let mut workbook = open_workbook_auto(path).map_err(|e| e.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no sheets".to_string())?
        .map_err(|e| e.to_string())?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(cells) => cells
            .iter()
            .map(|cell| cell_value(cell).as_text().unwrap_or_default().trim().to_string())
            .collect(),
        None => return Err("sheet is empty".to_string()),
    };

    let mut table = RawTable::new(headers);
    for cells in rows {
        let row = cells.iter().map(cell_value).collect();
        push_row(&mut table, row);
    }

    Ok(table)
}

fn cell_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::String(s) if s.trim().is_empty() => RawValue::Empty,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Float(n) => RawValue::Number(*n),
        Data::Int(n) => RawValue::Number(*n as f64),
        Data::Bool(b) => RawValue::Text(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => RawValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawValue::Text(s.clone()),
    }
}

// Полностью пустые строки не несут данных
fn push_row(table: &mut RawTable, row: Vec<RawValue>) {
    if row.iter().any(|v| !v.is_empty()) {
        table.rows.push(row);
    }
}
