// ==========================================
// 工厂设备维护管理 - 配置层
// ==========================================
// 职责: 系统配置管理（告警策略、画像注册表、预测参数）
// 存储: config_kv 表
// ==========================================

pub mod asset_profiles;
pub mod config_manager;
pub mod maintenance_config_trait;

// 重导出核心配置管理器
pub use asset_profiles::ProfileRegistry;
pub use config_manager::{config_keys, ConfigManager};
pub use maintenance_config_trait::{ConfigResult, MaintenanceConfigReader};
