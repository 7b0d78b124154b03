// ==========================================
// 工厂设备维护管理 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::asset_profiles::ProfileRegistry;
use crate::config::maintenance_config_trait::{ConfigResult, MaintenanceConfigReader};
use crate::db::open_sqlite_connection;
use crate::domain::types::ClassificationPolicy;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, "配置已更新");
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置；格式错误时告警并回落默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: std::str::FromStr + ToString + Copy,
    {
        let value = self.get_config_or_default(key, &default.to_string())?;
        Ok(value.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %value, "配置格式错误，使用默认值");
            default
        }))
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 评估结果摘要中记录当时生效的配置
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

// ==========================================
// MaintenanceConfigReader Trait 实现
// ==========================================
#[async_trait]
impl MaintenanceConfigReader for ConfigManager {
    async fn get_classification_policy(&self) -> ConfigResult<ClassificationPolicy> {
        let value = self.get_config_or_default(
            config_keys::CLASSIFICATION_POLICY,
            ClassificationPolicy::default().as_str(),
        )?;
        Ok(ClassificationPolicy::from_str(&value))
    }

    async fn get_profile_registry(&self) -> ConfigResult<ProfileRegistry> {
        match self.get_global_config_value(config_keys::ASSET_PROFILES)? {
            Some(raw) if !raw.trim().is_empty() => Ok(ProfileRegistry::from_json(&raw)?),
            _ => Ok(ProfileRegistry::builtin()),
        }
    }

    async fn get_upload_dir(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::UPLOAD_DIR, "uploads")
    }

    async fn get_forecast_horizon_hours(&self) -> ConfigResult<i64> {
        self.get_parsed_or_default(config_keys::FORECAST_HORIZON_HOURS, 24)
    }

    async fn get_forecast_min_history(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(config_keys::FORECAST_MIN_HISTORY, 20)
    }

    async fn get_forecast_history_limit(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(config_keys::FORECAST_HISTORY_LIMIT, 200)
    }

    async fn get_overview_window_hours(&self) -> ConfigResult<i64> {
        self.get_parsed_or_default(config_keys::OVERVIEW_WINDOW_HOURS, 24)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 告警分类
    pub const CLASSIFICATION_POLICY: &str = "classification_policy";
    pub const ASSET_PROFILES: &str = "asset_profiles"; // 画像注册表 (JSON)

    // 附件
    pub const UPLOAD_DIR: &str = "upload_dir";

    // 故障预测
    pub const FORECAST_HORIZON_HOURS: &str = "forecast_horizon_hours";
    pub const FORECAST_MIN_HISTORY: &str = "forecast_min_history";
    pub const FORECAST_HISTORY_LIMIT: &str = "forecast_history_limit";

    // 总览
    pub const OVERVIEW_WINDOW_HOURS: &str = "overview_window_hours";
}
