// ==========================================
// 工厂设备维护管理 - 资产主数据仓储
// ==========================================

use crate::db::{open_sqlite_connection, DATE_FMT};
use crate::domain::asset::Asset;
use crate::repository::error::{lock_conn, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct AssetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssetRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 登记资产（编号重复 → UniqueConstraintViolation）
    pub fn create(&self, asset: &Asset) -> RepositoryResult<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO asset (asset_id, asset_type, location, description, install_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                asset.asset_id,
                asset.asset_type,
                asset.location,
                asset.description,
                asset.install_date.map(|d| d.format(DATE_FMT).to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, asset_id: &str) -> RepositoryResult<Option<Asset>> {
        let conn = lock_conn(&self.conn)?;
        let asset = conn
            .query_row(
                "SELECT asset_id, asset_type, location, description, install_date \
                 FROM asset WHERE asset_id = ?1",
                params![asset_id],
                map_asset_row,
            )
            .optional()?;
        Ok(asset)
    }

    pub fn list(&self) -> RepositoryResult<Vec<Asset>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT asset_id, asset_type, location, description, install_date \
             FROM asset ORDER BY asset_id",
        )?;
        let rows = stmt
            .query_map([], map_asset_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

fn map_asset_row(row: &Row<'_>) -> SqliteResult<Asset> {
    Ok(Asset {
        asset_id: row.get(0)?,
        asset_type: row.get(1)?,
        location: row.get(2)?,
        description: row.get(3)?,
        install_date: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| NaiveDate::parse_from_str(&s, DATE_FMT).ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::RepositoryError;

    #[test]
    fn test_create_get_list() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        let repo = AssetRepository::from_connection(Arc::new(Mutex::new(conn)));

        let asset = Asset {
            asset_id: "MOTOR-001".to_string(),
            asset_type: "Motor Elétrico".to_string(),
            location: "Setor A-Linha 2".to_string(),
            description: String::new(),
            install_date: NaiveDate::from_ymd_opt(2019, 6, 1),
        };
        repo.create(&asset).unwrap();
        assert_eq!(repo.get("MOTOR-001").unwrap(), Some(asset.clone()));
        assert_eq!(repo.list().unwrap(), vec![asset.clone()]);

        let err = repo.create(&asset).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }
}
