// ==========================================
// 工厂设备维护管理 - 备件库存仓储
// ==========================================
// 红线: 库存永不为负（条件 UPDATE + 表级 CHECK 双重保证）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::inventory::Part;
use crate::repository::error::{lock_conn, RepositoryError, RepositoryResult};
use crate::repository::parts_usage_repo::insert_usage;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, TransactionBehavior};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "part_id, description, stock_quantity, min_stock_level, unit_cost";

// ==========================================
// PartRepository - 备件仓储
// ==========================================
pub struct PartRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PartRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn get(&self, part_id: &str) -> RepositoryResult<Option<Part>> {
        let conn = lock_conn(&self.conn)?;
        Ok(find_part(&conn, part_id)?)
    }

    /// 全部备件（按编号排序）
    pub fn list(&self) -> RepositoryResult<Vec<Part>> {
        let conn = lock_conn(&self.conn)?;
        let sql = format!("SELECT {} FROM part ORDER BY part_id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_part_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 低库存备件（stock_quantity <= min_stock_level）
    pub fn low_stock(&self) -> RepositoryResult<Vec<Part>> {
        let conn = lock_conn(&self.conn)?;
        let sql = format!(
            "SELECT {} FROM part WHERE stock_quantity <= min_stock_level ORDER BY part_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_part_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 新建备件（编号重复 → UniqueConstraintViolation）
    pub fn create(&self, part: &Part) -> RepositoryResult<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO part (part_id, description, stock_quantity, min_stock_level, unit_cost)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                part.part_id,
                part.description,
                part.stock_quantity,
                part.min_stock_level,
                part.unit_cost,
            ],
        )?;
        Ok(())
    }

    /// 新建或覆盖备件主数据
    pub fn upsert(&self, part: &Part) -> RepositoryResult<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO part (part_id, description, stock_quantity, min_stock_level, unit_cost)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(part_id) DO UPDATE SET
                description = excluded.description,
                stock_quantity = excluded.stock_quantity,
                min_stock_level = excluded.min_stock_level,
                unit_cost = excluded.unit_cost
            "#,
            params![
                part.part_id,
                part.description,
                part.stock_quantity,
                part.min_stock_level,
                part.unit_cost,
            ],
        )?;
        Ok(())
    }

    /// 入库
    ///
    /// # 返回
    /// 入库后的库存
    pub fn restock(&self, part_id: &str, quantity: i64) -> RepositoryResult<i64> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let affected = tx.execute(
            "UPDATE part SET stock_quantity = stock_quantity + ?1 WHERE part_id = ?2",
            params![quantity, part_id],
        )?;
        if affected == 0 {
            return Err(part_not_found(part_id));
        }
        let level: i64 = tx.query_row(
            "SELECT stock_quantity FROM part WHERE part_id = ?1",
            params![part_id],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(level)
    }

    /// 出库（单事务条件扣减）
    ///
    /// # 返回
    /// 出库后的库存
    ///
    /// # 错误
    /// - NotFound: 备件不存在
    /// - InsufficientStock: 库存不足，库存不变
    pub fn consume_stock(&self, part_id: &str, quantity: i64) -> RepositoryResult<i64> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let level = consume_in_tx(&tx, part_id, quantity)?;
        tx.commit()?;
        Ok(level)
    }

    /// 工单领用备件（扣减库存 + 写领用记录，同一事务）
    ///
    /// # 返回
    /// (领用后的库存, 领用记录ID)
    ///
    /// # 错误
    /// - NotFound: 工单或备件不存在
    /// - InsufficientStock: 库存不足，库存与领用记录均不变
    pub fn consume_for_order(
        &self,
        os_id: &str,
        part_id: &str,
        quantity: i64,
    ) -> RepositoryResult<(i64, i64)> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let order_exists = tx
            .query_row(
                "SELECT 1 FROM service_order WHERE os_id = ?1",
                params![os_id],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !order_exists {
            return Err(RepositoryError::NotFound {
                entity: "ServiceOrder".to_string(),
                id: os_id.to_string(),
            });
        }

        let level = consume_in_tx(&tx, part_id, quantity)?;
        let usage_id = insert_usage(&tx, os_id, part_id, quantity)?;
        tx.commit()?;
        Ok((level, usage_id))
    }
}

// ==========================================
// 事务内辅助函数
// ==========================================

fn part_not_found(part_id: &str) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "Part".to_string(),
        id: part_id.to_string(),
    }
}

fn find_part(conn: &Connection, part_id: &str) -> SqliteResult<Option<Part>> {
    let sql = format!("SELECT {} FROM part WHERE part_id = ?1", SELECT_COLUMNS);
    conn.query_row(&sql, params![part_id], map_part_row).optional()
}

/// 条件扣减库存（调用方负责事务）
pub(crate) fn consume_in_tx(conn: &Connection, part_id: &str, quantity: i64) -> RepositoryResult<i64> {
    let affected = conn.execute(
        "UPDATE part SET stock_quantity = stock_quantity - ?1 \
         WHERE part_id = ?2 AND stock_quantity >= ?1",
        params![quantity, part_id],
    )?;

    let current = find_part(conn, part_id)?.ok_or_else(|| part_not_found(part_id))?;

    if affected == 0 {
        return Err(RepositoryError::InsufficientStock {
            part_id: part_id.to_string(),
            available: current.stock_quantity,
            requested: quantity,
        });
    }
    Ok(current.stock_quantity)
}

fn map_part_row(row: &Row<'_>) -> SqliteResult<Part> {
    Ok(Part {
        part_id: row.get(0)?,
        description: row.get(1)?,
        stock_quantity: row.get(2)?,
        min_stock_level: row.get(3)?,
        unit_cost: row.get(4)?,
    })
}
