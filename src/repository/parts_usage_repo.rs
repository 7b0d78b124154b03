// ==========================================
// 工厂设备维护管理 - 备件领用记录仓储
// ==========================================
// 红线: 只追加，不修改不删除
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::inventory::{PartUsageDetail, PartsUsageRecord};
use crate::repository::error::{lock_conn, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct PartsUsageRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PartsUsageRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 追加领用记录（不扣减库存）
    ///
    /// # 返回
    /// 新记录ID
    pub fn append(&self, record: &PartsUsageRecord) -> RepositoryResult<i64> {
        let conn = lock_conn(&self.conn)?;
        Ok(insert_usage(
            &conn,
            &record.os_id,
            &record.part_id,
            record.quantity_used,
        )?)
    }

    /// 工单的领用记录（按写入顺序）
    pub fn find_by_order(&self, os_id: &str) -> RepositoryResult<Vec<PartsUsageRecord>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(
            r#"
            SELECT usage_id, os_id, part_id, quantity_used
            FROM parts_usage
            WHERE os_id = ?1
            ORDER BY usage_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![os_id], |row| {
                Ok(PartsUsageRecord {
                    usage_id: row.get(0)?,
                    os_id: row.get(1)?,
                    part_id: row.get(2)?,
                    quantity_used: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 工单的领用明细（关联备件描述与单价）
    pub fn find_by_order_with_parts(&self, os_id: &str) -> RepositoryResult<Vec<PartUsageDetail>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(
            r#"
            SELECT u.part_id, p.description, u.quantity_used, p.unit_cost
            FROM parts_usage u
            JOIN part p ON p.part_id = u.part_id
            WHERE u.os_id = ?1
            ORDER BY u.usage_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![os_id], |row| {
                Ok(PartUsageDetail {
                    part_id: row.get(0)?,
                    description: row.get(1)?,
                    quantity_used: row.get(2)?,
                    unit_cost: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

/// 写入领用记录（调用方负责事务）
pub(crate) fn insert_usage(
    conn: &Connection,
    os_id: &str,
    part_id: &str,
    quantity: i64,
) -> SqliteResult<i64> {
    conn.execute(
        "INSERT INTO parts_usage (os_id, part_id, quantity_used) VALUES (?1, ?2, ?3)",
        params![os_id, part_id, quantity],
    )?;
    Ok(conn.last_insert_rowid())
}
