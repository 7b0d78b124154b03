// ==========================================
// 工厂设备维护管理 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少多会话并发写入时的 busy 错误
// - 建库脚本内置（活动工单唯一索引在此定义）
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 数据库日期时间格式（小数秒按需输出）
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// 数据库日期格式
pub const DATE_FMT: &str = "%Y-%m-%d";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开连接并确保 schema 存在
pub fn open_and_migrate(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// 说明：
/// - uq_service_order_active 是去重不变量的存储层兜底：
///   同一 (asset_id, reason) 只允许一张 Aberta/Em Andamento 工单
/// - part.stock_quantity 带 CHECK 约束，库存永不为负
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS role_permission (
            role_name TEXT PRIMARY KEY,
            pages_json TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS asset (
            asset_id TEXT PRIMARY KEY,
            asset_type TEXT NOT NULL,
            location TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            install_date TEXT
        );

        CREATE TABLE IF NOT EXISTS sensor_reading (
            reading_id INTEGER PRIMARY KEY AUTOINCREMENT,
            ts TEXT NOT NULL,
            asset_id TEXT NOT NULL,
            asset_type TEXT NOT NULL,
            location TEXT NOT NULL DEFAULT '',
            latitude REAL,
            longitude REAL,
            values_json TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sensor_reading_asset_ts
            ON sensor_reading (asset_id, ts);

        CREATE TABLE IF NOT EXISTS resolved_alert (
            asset_id TEXT NOT NULL,
            reason TEXT NOT NULL,
            resolved_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (asset_id, reason)
        );

        CREATE TABLE IF NOT EXISTS service_order (
            os_id TEXT PRIMARY KEY,
            asset_id TEXT NOT NULL,
            asset_type TEXT NOT NULL,
            creation_date TEXT NOT NULL,
            reason TEXT NOT NULL,
            priority TEXT NOT NULL,
            status TEXT NOT NULL,
            class TEXT NOT NULL,
            recurrence TEXT NOT NULL,
            assigned_to TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            estimated_cost REAL NOT NULL DEFAULT 0,
            actual_cost REAL NOT NULL DEFAULT 0,
            root_cause TEXT,
            files_attached TEXT NOT NULL DEFAULT '[]',
            completion_date TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_service_order_asset
            ON service_order (asset_id);
        CREATE UNIQUE INDEX IF NOT EXISTS uq_service_order_active
            ON service_order (asset_id, reason)
            WHERE status IN ('Aberta', 'Em Andamento');

        CREATE TABLE IF NOT EXISTS part (
            part_id TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            stock_quantity INTEGER NOT NULL CHECK (stock_quantity >= 0),
            min_stock_level INTEGER NOT NULL DEFAULT 5,
            unit_cost REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS parts_usage (
            usage_id INTEGER PRIMARY KEY AUTOINCREMENT,
            os_id TEXT NOT NULL REFERENCES service_order(os_id),
            part_id TEXT NOT NULL REFERENCES part(part_id),
            quantity_used INTEGER NOT NULL CHECK (quantity_used > 0),
            used_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_parts_usage_os
            ON parts_usage (os_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    // 默认角色（仅首次）
    for role in crate::domain::access::default_roles() {
        let pages_json = serde_json::to_string(&role.pages)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        conn.execute(
            "INSERT OR IGNORE INTO role_permission (role_name, pages_json) VALUES (?1, ?2)",
            rusqlite::params![role.role_name, pages_json],
        )?;
    }

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

// ==========================================
// 日期时间编解码
// ==========================================

/// 格式化为数据库字符串
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

/// 解析数据库/导入文件中的日期时间
///
/// 兼容: "2024-01-15 10:00:00[.fff]"、"2024-01-15T10:00:00[.fff]"、"2024-01-15"
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, DATE_FMT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// 将解析失败转换为 rusqlite 行映射错误
pub(crate) fn datetime_column(idx: usize, raw: String) -> rusqlite::Result<NaiveDateTime> {
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("无法解析日期时间: {}", raw).into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));

        let roles: i64 = conn
            .query_row("SELECT COUNT(*) FROM role_permission", [], |r| r.get(0))
            .unwrap();
        assert_eq!(roles, 2);
    }

    #[test]
    fn test_datetime_round_trip() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_milli_opt(10, 30, 0, 250)
            .unwrap();
        assert_eq!(parse_datetime(&format_datetime(&dt)), Some(dt));

        let whole = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(format_datetime(&whole), "2024-01-15 10:30:00");
        assert_eq!(parse_datetime("2024-01-15T10:30:00"), Some(whole));
        assert_eq!(
            parse_datetime("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_datetime("15/01/2024"), None);
    }
}
