// ==========================================
// 工厂设备维护管理 - 传感器读数仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 存储: sensor_reading 表，参数值以 JSON 对象存储（参数集合随资产类型变化）
// ==========================================

use crate::db::{datetime_column, format_datetime, open_sqlite_connection};
use crate::domain::sensor::SensorReading;
use crate::repository::error::{lock_conn, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

const SELECT_COLUMNS: &str =
    "ts, asset_id, asset_type, location, latitude, longitude, values_json";

/// 传感器读数仓储
/// 职责: 批量追加、全量读取、单参数历史查询
pub struct SensorReadingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SensorReadingRepository {
    /// 打开独立连接创建仓储
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 批量追加读数（单事务）
    ///
    /// 非有限数值（NaN/±inf）按缺测处理，不写入 values_json
    ///
    /// # 返回
    /// 写入行数
    pub fn append_batch(&self, rows: &[SensorReading]) -> RepositoryResult<usize> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO sensor_reading (
                    ts, asset_id, asset_type, location, latitude, longitude, values_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for r in rows {
                let finite: BTreeMap<&str, f64> = r
                    .values
                    .iter()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(k, v)| (k.as_str(), *v))
                    .collect();
                if finite.len() != r.values.len() {
                    warn!(
                        asset_id = %r.asset_id,
                        ts = %r.timestamp,
                        dropped = r.values.len() - finite.len(),
                        "读数含非有限数值，按缺测处理"
                    );
                }
                let values_json = serde_json::to_string(&finite)?;
                stmt.execute(params![
                    format_datetime(&r.timestamp),
                    r.asset_id,
                    r.asset_type,
                    r.location,
                    r.latitude,
                    r.longitude,
                    values_json,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// 全量读取（按时间升序）
    pub fn all(&self) -> RepositoryResult<Vec<SensorReading>> {
        let conn = lock_conn(&self.conn)?;
        let sql = format!(
            "SELECT {} FROM sensor_reading ORDER BY ts ASC, reading_id ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_reading_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 读数总行数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = lock_conn(&self.conn)?;
        let n = conn.query_row("SELECT COUNT(*) FROM sensor_reading", [], |row| row.get(0))?;
        Ok(n)
    }

    /// 查询单资产单参数的最近历史
    ///
    /// # 参数
    /// - `asset_id`: 资产ID
    /// - `param`: 参数名
    /// - `limit`: 最多返回条数（取最近的 limit 条）
    ///
    /// # 返回
    /// 按时间升序的 (时间, 数值) 序列，缺测行被跳过
    pub fn history(
        &self,
        asset_id: &str,
        param: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<(NaiveDateTime, f64)>> {
        let conn = lock_conn(&self.conn)?;
        let path = json_path(param);
        let mut stmt = conn.prepare(
            r#"
            SELECT ts, json_extract(values_json, ?2) AS v
            FROM sensor_reading
            WHERE asset_id = ?1 AND json_extract(values_json, ?2) IS NOT NULL
            ORDER BY ts DESC, reading_id DESC
            LIMIT ?3
            "#,
        )?;

        let mut points = stmt
            .query_map(params![asset_id, path, limit as i64], |row| {
                Ok((datetime_column(0, row.get(0)?)?, row.get::<_, f64>(1)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        points.reverse();
        Ok(points)
    }
}

/// 构造 JSON 路径（参数名加引号，兼容下划线/特殊字符）
fn json_path(param: &str) -> String {
    format!("$.\"{}\"", param.replace('"', "\\\""))
}

fn map_reading_row(row: &Row<'_>) -> SqliteResult<SensorReading> {
    let values_json: String = row.get(6)?;
    // null 视为缺测
    let raw: BTreeMap<String, Option<f64>> = serde_json::from_str(&values_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let values = raw
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect();

    Ok(SensorReading {
        timestamp: datetime_column(0, row.get(0)?)?,
        asset_id: row.get(1)?,
        asset_type: row.get(2)?,
        location: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        values,
    })
}
