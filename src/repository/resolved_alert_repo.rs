// ==========================================
// 工厂设备维护管理 - 已处理告警仓储
// ==========================================
// 红线: 只增不删，(asset_id, reason) 重复写入为空操作
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::error::{lock_conn, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// 已处理告警仓储
pub struct ResolvedAlertRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ResolvedAlertRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 是否已登记
    pub fn contains(&self, asset_id: &str, reason: &str) -> RepositoryResult<bool> {
        let conn = lock_conn(&self.conn)?;
        let found = conn
            .query_row(
                "SELECT 1 FROM resolved_alert WHERE asset_id = ?1 AND reason = ?2",
                params![asset_id, reason],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    /// 登记已处理告警（幂等）
    ///
    /// # 返回
    /// - true: 新写入
    /// - false: 已存在
    pub fn insert(&self, asset_id: &str, reason: &str) -> RepositoryResult<bool> {
        let conn = lock_conn(&self.conn)?;
        Ok(insert_resolved(&conn, asset_id, reason)?)
    }

    /// 全量读取为集合
    pub fn all(&self) -> RepositoryResult<HashSet<(String, String)>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare("SELECT asset_id, reason FROM resolved_alert")?;
        let set = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<SqliteResult<HashSet<_>>>()?;
        Ok(set)
    }
}

/// 在给定连接/事务上写入（供工单完工事务复用）
pub(crate) fn insert_resolved(conn: &Connection, asset_id: &str, reason: &str) -> SqliteResult<bool> {
    let n = conn.execute(
        "INSERT OR IGNORE INTO resolved_alert (asset_id, reason) VALUES (?1, ?2)",
        params![asset_id, reason],
    )?;
    Ok(n > 0)
}
