// ==========================================
// 工厂设备维护管理 - 传感器读数导入器
// ==========================================
// 流程: 解析 → 列识别 → 行转换 → 落库（单事务）
// 固定列: timestamp, asset_id, asset_type, location, latitude, longitude
// 参数列: 其余非空值全部可解析为数值的列；空单元格视为缺测
// 红线: 单行错误只拒绝该行，不中断整批
// ==========================================

use crate::domain::sensor::SensorReading;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawTable, UniversalFileParser};
use crate::repository::sensor_repo::SensorReadingRepository;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const COL_TIMESTAMP: &str = "timestamp";
const COL_ASSET_ID: &str = "asset_id";
const COL_ASSET_TYPE: &str = "asset_type";
const COL_LOCATION: &str = "location";
const COL_LATITUDE: &str = "latitude";
const COL_LONGITUDE: &str = "longitude";

const FIXED_COLUMNS: [&str; 6] = [
    COL_TIMESTAMP,
    COL_ASSET_ID,
    COL_ASSET_TYPE,
    COL_LOCATION,
    COL_LATITUDE,
    COL_LONGITUDE,
];

const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

/// 被拒绝的行（行号从 1 开始，不含表头）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRejection {
    pub row: usize,
    pub message: String,
}

/// 导入结果汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub file_name: String,
    pub rows_read: usize,
    pub rows_imported: usize,
    pub parameters: Vec<String>,
    pub rejections: Vec<RowRejection>,
    pub elapsed_ms: u64,
}

/// 转换结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertedReadings {
    pub readings: Vec<SensorReading>,
    pub parameters: Vec<String>,
    pub rejections: Vec<RowRejection>,
}

/// 解析时间戳
///
/// 支持常见文本格式、纯日期，以及 Excel 序列日（1899-12-30 起的天数）
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }

    // Excel 序列日
    let serial: f64 = raw.parse().ok()?;
    if !serial.is_finite() || serial <= 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 识别参数列: 非固定列，且所有非空值均为数值
pub fn detect_parameter_columns(table: &RawTable) -> Vec<String> {
    table
        .headers
        .iter()
        .filter(|h| !h.is_empty() && !FIXED_COLUMNS.contains(&h.as_str()))
        .filter(|h| {
            let numeric = table.rows.iter().all(|row| {
                row.get(h.as_str())
                    .map(|v| v.is_empty() || parse_number(v).is_some())
                    .unwrap_or(true)
            });
            if !numeric {
                warn!(column = %h, "列含非数值内容，不作为监测参数");
            }
            numeric
        })
        .cloned()
        .collect()
}

/// 原始表格 → 读数
///
/// # 错误
/// - MissingColumn: 缺少 timestamp 或 asset_id 列
pub fn convert_table(table: &RawTable) -> ImportResult<ConvertedReadings> {
    for required in [COL_TIMESTAMP, COL_ASSET_ID] {
        if !table.headers.iter().any(|h| h == required) {
            return Err(ImportError::MissingColumn(required.to_string()));
        }
    }

    let parameters = detect_parameter_columns(table);
    let mut out = ConvertedReadings {
        parameters: parameters.clone(),
        ..Default::default()
    };

    for (idx, row) in table.rows.iter().enumerate() {
        match convert_row(row, &parameters) {
            Ok(reading) => out.readings.push(reading),
            Err(message) => out.rejections.push(RowRejection {
                row: idx + 1,
                message,
            }),
        }
    }
    Ok(out)
}

fn text<'a>(row: &'a HashMap<String, String>, col: &str) -> &'a str {
    row.get(col).map(String::as_str).unwrap_or("")
}

fn convert_row(row: &HashMap<String, String>, parameters: &[String]) -> Result<SensorReading, String> {
    let raw_ts = text(row, COL_TIMESTAMP);
    let timestamp =
        parse_timestamp(raw_ts).ok_or_else(|| format!("时间格式无法识别: {:?}", raw_ts))?;

    let asset_id = text(row, COL_ASSET_ID);
    if asset_id.is_empty() {
        return Err("asset_id 为空".to_string());
    }

    let values: BTreeMap<String, f64> = parameters
        .iter()
        .filter_map(|p| parse_number(text(row, p)).map(|v| (p.clone(), v)))
        .collect();

    Ok(SensorReading {
        timestamp,
        asset_id: asset_id.to_string(),
        asset_type: text(row, COL_ASSET_TYPE).to_string(),
        location: text(row, COL_LOCATION).to_string(),
        latitude: parse_number(text(row, COL_LATITUDE)),
        longitude: parse_number(text(row, COL_LONGITUDE)),
        values,
    })
}

// ==========================================
// ReadingImporter - 读数导入服务
// ==========================================
pub struct ReadingImporter {
    sensor_repo: Arc<SensorReadingRepository>,
    parser: UniversalFileParser,
}

impl ReadingImporter {
    pub fn new(sensor_repo: Arc<SensorReadingRepository>) -> Self {
        Self {
            sensor_repo,
            parser: UniversalFileParser,
        }
    }

    /// 导入读数文件（CSV/Excel）
    #[instrument(skip(self, file_path), fields(batch_id))]
    pub fn import_file<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<ImportSummary> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let path = file_path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        info!(batch_id = %batch_id, file = %path.display(), "开始导入传感器读数");

        let table = self.parser.parse(path)?;
        let rows_read = table.rows.len();
        let converted = convert_table(&table)?;
        for r in &converted.rejections {
            warn!(batch_id = %batch_id, row = r.row, reason = %r.message, "读数行被拒绝");
        }

        let rows_imported = self.sensor_repo.append_batch(&converted.readings)?;
        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            batch_id = %batch_id,
            rows_read,
            rows_imported,
            rejected = converted.rejections.len(),
            elapsed_ms,
            "传感器读数导入完成"
        );

        Ok(ImportSummary {
            batch_id,
            file_name,
            rows_read,
            rows_imported,
            parameters: converted.parameters,
            rejections: converted.rejections,
            elapsed_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|cells| {
                headers
                    .iter()
                    .cloned()
                    .zip(cells.iter().map(|c| c.to_string()))
                    .collect()
            })
            .collect();
        RawTable { headers, rows }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-15 08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("15/01/2024 08:30:00"), Some(expected));
        // 45306 = 2024-01-15，0.3541666.. ≈ 08:30
        assert_eq!(parse_timestamp("45306.3541666667"), Some(expected));
        assert_eq!(parse_timestamp("ontem"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_convert_detects_parameters_and_blank_cells() {
        let t = table(
            &["timestamp", "asset_id", "asset_type", "location", "temperatura", "vibracao", "operador"],
            &[
                &["2024-01-01 00:00:00", "M1", "Fresadora", "Setor A", "95.5", "", "Joao"],
                &["2024-01-01 01:00:00", "M1", "Fresadora", "Setor A", "", "4.2", "Maria"],
            ],
        );
        let out = convert_table(&t).unwrap();
        assert_eq!(out.parameters, vec!["temperatura", "vibracao"]);
        assert_eq!(out.readings.len(), 2);
        assert_eq!(out.readings[0].values.len(), 1);
        assert_eq!(out.readings[0].value("temperatura"), Some(95.5));
        assert_eq!(out.readings[1].value("temperatura"), None);
        assert_eq!(out.readings[1].value("vibracao"), Some(4.2));
        assert!(out.readings[0].latitude.is_none());
    }

    #[test]
    fn test_convert_rejects_bad_rows_only() {
        let t = table(
            &["timestamp", "asset_id", "pressao"],
            &[
                &["2024-01-01 00:00:00", "PH-01", "150"],
                &["quando?", "PH-01", "151"],
                &["2024-01-01 02:00:00", "", "152"],
            ],
        );
        let out = convert_table(&t).unwrap();
        assert_eq!(out.readings.len(), 1);
        let rejected: Vec<usize> = out.rejections.iter().map(|r| r.row).collect();
        assert_eq!(rejected, vec![2, 3]);
    }

    #[test]
    fn test_convert_requires_key_columns() {
        let t = table(&["asset_id", "pressao"], &[&["PH-01", "150"]]);
        assert!(matches!(
            convert_table(&t),
            Err(ImportError::MissingColumn(c)) if c == "timestamp"
        ));
    }
}
