// ==========================================
// 工厂设备维护管理 - 角色权限仓储
// ==========================================
// 存储: role_permission 表，页面列表以 JSON 数组存储
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::access::RolePermission;
use crate::repository::error::{lock_conn, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct RoleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RoleRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn get(&self, role_name: &str) -> RepositoryResult<Option<RolePermission>> {
        let conn = lock_conn(&self.conn)?;
        let role = conn
            .query_row(
                "SELECT role_name, pages_json FROM role_permission WHERE role_name = ?1",
                params![role_name],
                map_role_row,
            )
            .optional()?;
        Ok(role)
    }

    /// 新建或覆盖角色的页面列表
    pub fn upsert(&self, role: &RolePermission) -> RepositoryResult<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO role_permission (role_name, pages_json) VALUES (?1, ?2)
            ON CONFLICT(role_name) DO UPDATE SET pages_json = excluded.pages_json
            "#,
            params![role.role_name, serde_json::to_string(&role.pages)?],
        )?;
        Ok(())
    }

    pub fn list(&self) -> RepositoryResult<Vec<RolePermission>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt =
            conn.prepare("SELECT role_name, pages_json FROM role_permission ORDER BY role_name")?;
        let rows = stmt
            .query_map([], map_role_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 以角色名为键的权限表（供访问控制判定）
    pub fn permission_map(&self) -> RepositoryResult<HashMap<String, RolePermission>> {
        Ok(self
            .list()?
            .into_iter()
            .map(|r| (r.role_name.clone(), r))
            .collect())
    }
}

fn map_role_row(row: &Row<'_>) -> SqliteResult<RolePermission> {
    let raw: String = row.get(1)?;
    let pages: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(RolePermission {
        role_name: row.get(0)?,
        pages,
    })
}
