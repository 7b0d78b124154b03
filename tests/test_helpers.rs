// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use plant_maintenance::db::open_and_migrate;
use plant_maintenance::domain::access::RequestContext;
use plant_maintenance::domain::inventory::Part;
use plant_maintenance::domain::sensor::SensorReading;
use plant_maintenance::logging;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    logging::init_test();
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();

    open_and_migrate(&db_path)?;

    Ok((temp_file, db_path))
}

/// 打开一个独立会话（已建表的共享连接句柄）
pub fn open_session(db_path: &str) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(open_and_migrate(db_path).unwrap()))
}

pub fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

/// 构造传感器读数
pub fn reading(
    asset_id: &str,
    asset_type: &str,
    at: NaiveDateTime,
    values: &[(&str, f64)],
) -> SensorReading {
    SensorReading {
        timestamp: at,
        asset_id: asset_id.to_string(),
        asset_type: asset_type.to_string(),
        location: "Setor A-Linha 1".to_string(),
        latitude: Some(-23.55),
        longitude: Some(-46.63),
        values: values
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>(),
    }
}

pub fn part(part_id: &str, stock: i64, min_level: i64, unit_cost: f64) -> Part {
    Part {
        part_id: part_id.to_string(),
        description: format!("Peça {}", part_id),
        stock_quantity: stock,
        min_stock_level: min_level,
        unit_cost,
    }
}

pub fn admin_ctx() -> RequestContext {
    RequestContext::new("u-admin", "Administrador", "admin")
}

pub fn viewer_ctx() -> RequestContext {
    RequestContext::new("u-viewer", "Visitante", "viewer")
}
