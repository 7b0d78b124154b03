// ==========================================
// 工厂设备维护管理 - 工单仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 工单永不删除
// 并发: 创建走 BEGIN IMMEDIATE + 活动唯一索引；状态更新为 CAS（按旧状态条件更新）
// ==========================================

use crate::db::{datetime_column, format_datetime, open_sqlite_connection};
use crate::domain::service_order::ServiceOrder;
use crate::domain::types::{OrderClass, OrderStatus, Priority, Recurrence};
use crate::repository::error::{lock_conn, RepositoryError, RepositoryResult};
use crate::repository::resolved_alert_repo::insert_resolved;
use rusqlite::{
    params, Connection, OptionalExtension, Result as SqliteResult, Row, TransactionBehavior,
};
use std::sync::{Arc, Mutex};
use tracing::debug;

const SELECT_COLUMNS: &str = r#"
    os_id, asset_id, asset_type, creation_date, reason, priority, status, class,
    recurrence, assigned_to, notes, estimated_cost, actual_cost, root_cause,
    files_attached, completion_date
"#;

// ==========================================
// ServiceOrderRepository - 工单仓储
// ==========================================
pub struct ServiceOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ServiceOrderRepository {
    /// 打开独立连接创建仓储（多会话场景每个会话一个连接）
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

    // ==========================================
    // 写入
    // ==========================================

    /// 直接插入工单
    ///
    /// 活动工单重复时由唯一索引拒绝（UniqueConstraintViolation）
    pub fn insert(&self, order: &ServiceOrder) -> RepositoryResult<()> {
        let conn = lock_conn(&self.conn)?;
        insert_row(&conn, order)?;
        Ok(())
    }

    /// 不存在活动工单时插入
    ///
    /// 检查与插入处于同一 IMMEDIATE 事务内；并发会话撞到唯一索引同样视为"已存在"
    ///
    /// # 返回
    /// - true: 已插入
    /// - false: 同一 (asset_id, reason) 已有活动工单，跳过
    pub fn insert_if_no_active(&self, order: &ServiceOrder) -> RepositoryResult<bool> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if active_exists(&tx, &order.asset_id, &order.reason)? {
            debug!(asset_id = %order.asset_id, reason = %order.reason, "活动工单已存在，跳过插入");
            return Ok(false);
        }

        match insert_row(&tx, order) {
            Ok(()) => {}
            Err(e) => match RepositoryError::from(e) {
                RepositoryError::UniqueConstraintViolation(_) => return Ok(false),
                other => return Err(other),
            },
        }

        tx.commit()?;
        Ok(true)
    }

    /// 更新工单（CAS: 仅当库内状态仍为 expected 时生效）
    ///
    /// # 错误
    /// - NotFound: 工单不存在
    /// - StaleState: 工单状态已被其他会话修改
    pub fn update(&self, order: &ServiceOrder, expected: OrderStatus) -> RepositoryResult<()> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        update_row_cas(&tx, order, expected)?;
        tx.commit()?;
        Ok(())
    }

    /// 完工（CAS 更新 + 可选登记已处理告警，同一事务）
    ///
    /// # 参数
    /// - `order`: 已填好完工信息的工单
    /// - `expected`: 读取时的状态
    /// - `resolve_alert`: 是否同时登记 (asset_id, reason) 为已处理
    pub fn complete(
        &self,
        order: &ServiceOrder,
        expected: OrderStatus,
        resolve_alert: bool,
    ) -> RepositoryResult<()> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        update_row_cas(&tx, order, expected)?;
        if resolve_alert {
            insert_resolved(&tx, &order.asset_id, &order.reason)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// 追加附件文件名（有序集合语义）
    ///
    /// # 返回
    /// - true: 已追加
    /// - false: 文件名已存在
    pub fn append_attachment(&self, os_id: &str, filename: &str) -> RepositoryResult<bool> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let raw: Option<String> = tx
            .query_row(
                "SELECT files_attached FROM service_order WHERE os_id = ?1",
                params![os_id],
                |row| row.get(0),
            )
            .optional()?;
        let raw = raw.ok_or_else(|| RepositoryError::NotFound {
            entity: "ServiceOrder".to_string(),
            id: os_id.to_string(),
        })?;

        let mut files: Vec<String> = serde_json::from_str(&raw)?;
        if files.iter().any(|f| f == filename) {
            return Ok(false);
        }
        files.push(filename.to_string());

        tx.execute(
            "UPDATE service_order SET files_attached = ?1 WHERE os_id = ?2",
            params![serde_json::to_string(&files)?, os_id],
        )?;
        tx.commit()?;
        Ok(true)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_id(&self, os_id: &str) -> RepositoryResult<Option<ServiceOrder>> {
        let conn = lock_conn(&self.conn)?;
        let sql = format!("SELECT {} FROM service_order WHERE os_id = ?1", SELECT_COLUMNS);
        let order = conn
            .query_row(&sql, params![os_id], map_order_row)
            .optional()?;
        Ok(order)
    }

    /// 全部工单（按创建时间升序）
    pub fn all(&self) -> RepositoryResult<Vec<ServiceOrder>> {
        self.query_list("ORDER BY creation_date ASC, os_id ASC", params![])
    }

    /// 查询 (asset_id, reason) 的活动工单
    pub fn find_active_by_asset_reason(
        &self,
        asset_id: &str,
        reason: &str,
    ) -> RepositoryResult<Option<ServiceOrder>> {
        let conn = lock_conn(&self.conn)?;
        let sql = format!(
            "SELECT {} FROM service_order \
             WHERE asset_id = ?1 AND reason = ?2 AND status IN ('Aberta', 'Em Andamento')",
            SELECT_COLUMNS
        );
        let order = conn
            .query_row(&sql, params![asset_id, reason], map_order_row)
            .optional()?;
        Ok(order)
    }

    /// 资产的全部工单（最新在前）
    pub fn find_by_asset(&self, asset_id: &str) -> RepositoryResult<Vec<ServiceOrder>> {
        self.query_list(
            "WHERE asset_id = ?1 ORDER BY creation_date DESC, os_id DESC",
            params![asset_id],
        )
    }

    /// 全部活动工单（按创建时间升序）
    pub fn find_active(&self) -> RepositoryResult<Vec<ServiceOrder>> {
        self.query_list(
            "WHERE status IN ('Aberta', 'Em Andamento') ORDER BY creation_date ASC, os_id ASC",
            params![],
        )
    }

    fn query_list(
        &self,
        tail: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Vec<ServiceOrder>> {
        let conn = lock_conn(&self.conn)?;
        let sql = format!("SELECT {} FROM service_order {}", SELECT_COLUMNS, tail);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(args, map_order_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

// ==========================================
// 行级辅助函数（事务内复用）
// ==========================================

fn active_exists(conn: &Connection, asset_id: &str, reason: &str) -> SqliteResult<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM service_order \
             WHERE asset_id = ?1 AND reason = ?2 AND status IN ('Aberta', 'Em Andamento') LIMIT 1",
            params![asset_id, reason],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false))
}

fn insert_row(conn: &Connection, order: &ServiceOrder) -> SqliteResult<()> {
    let files = serde_json::to_string(&order.files_attached)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        r#"
        INSERT INTO service_order (
            os_id, asset_id, asset_type, creation_date, reason, priority, status, class,
            recurrence, assigned_to, notes, estimated_cost, actual_cost, root_cause,
            files_attached, completion_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
        params![
            order.os_id,
            order.asset_id,
            order.asset_type,
            format_datetime(&order.creation_date),
            order.reason,
            order.priority.to_db_str(),
            order.status.to_db_str(),
            order.class.to_db_str(),
            order.recurrence.to_db_str(),
            order.assigned_to,
            order.notes,
            order.estimated_cost,
            order.actual_cost,
            order.root_cause,
            files,
            order.completion_date.as_ref().map(format_datetime),
        ],
    )?;
    Ok(())
}

/// 条件更新可变字段；0 行受影响时区分不存在与状态过期
fn update_row_cas(
    conn: &Connection,
    order: &ServiceOrder,
    expected: OrderStatus,
) -> RepositoryResult<()> {
    let affected = conn.execute(
        r#"
        UPDATE service_order
        SET status = ?1, notes = ?2, actual_cost = ?3, root_cause = ?4,
            completion_date = ?5, assigned_to = ?6
        WHERE os_id = ?7 AND status = ?8
        "#,
        params![
            order.status.to_db_str(),
            order.notes,
            order.actual_cost,
            order.root_cause,
            order.completion_date.as_ref().map(format_datetime),
            order.assigned_to,
            order.os_id,
            expected.to_db_str(),
        ],
    )?;

    if affected == 1 {
        return Ok(());
    }

    let exists = conn
        .query_row(
            "SELECT 1 FROM service_order WHERE os_id = ?1",
            params![order.os_id],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if exists {
        Err(RepositoryError::StaleState {
            entity: "ServiceOrder".to_string(),
            id: order.os_id.clone(),
            expected: expected.to_db_str().to_string(),
        })
    } else {
        Err(RepositoryError::NotFound {
            entity: "ServiceOrder".to_string(),
            id: order.os_id.clone(),
        })
    }
}

fn enum_column<T>(idx: usize, raw: String, parse: fn(&str) -> Option<T>) -> SqliteResult<T> {
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("未知枚举值: {}", raw).into(),
        )
    })
}

fn map_order_row(row: &Row<'_>) -> SqliteResult<ServiceOrder> {
    let files_raw: String = row.get(14)?;
    let files_attached: Vec<String> = serde_json::from_str(&files_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(14, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(ServiceOrder {
        os_id: row.get(0)?,
        asset_id: row.get(1)?,
        asset_type: row.get(2)?,
        creation_date: datetime_column(3, row.get(3)?)?,
        reason: row.get(4)?,
        priority: enum_column(5, row.get(5)?, Priority::from_str)?,
        status: enum_column(6, row.get(6)?, OrderStatus::from_str)?,
        class: enum_column(7, row.get(7)?, OrderClass::from_str)?,
        recurrence: Recurrence::from_str(&row.get::<_, String>(8)?),
        assigned_to: row.get(9)?,
        notes: row.get(10)?,
        estimated_cost: row.get(11)?,
        actual_cost: row.get(12)?,
        root_cause: row.get(13)?,
        files_attached,
        completion_date: row
            .get::<_, Option<String>>(15)?
            .map(|s| datetime_column(15, s))
            .transpose()?,
    })
}
