// ==========================================
// 工厂设备维护管理 - 维护配置读取 Trait
// ==========================================
// 职责: 定义评估流程/分析视图所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::asset_profiles::ProfileRegistry;
use crate::domain::types::ClassificationPolicy;
use async_trait::async_trait;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// MaintenanceConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait MaintenanceConfigReader: Send + Sync {
    // ===== 告警分类 =====

    /// 多参数告警归并策略
    ///
    /// # 默认值
    /// - last_non_normal_wins
    async fn get_classification_policy(&self) -> ConfigResult<ClassificationPolicy>;

    /// 资产类型画像注册表
    ///
    /// # 默认值
    /// - 内置注册表（未配置 asset_profiles 时）
    async fn get_profile_registry(&self) -> ConfigResult<ProfileRegistry>;

    // ===== 附件 =====

    /// 附件上传目录
    ///
    /// # 默认值
    /// - uploads
    async fn get_upload_dir(&self) -> ConfigResult<String>;

    // ===== 故障预测 =====

    /// 预测时长（小时），默认 24
    async fn get_forecast_horizon_hours(&self) -> ConfigResult<i64>;

    /// 参与预测所需的最少历史点数（严格大于），默认 20
    async fn get_forecast_min_history(&self) -> ConfigResult<usize>;

    /// 预测使用的最近历史点数上限，默认 200
    async fn get_forecast_history_limit(&self) -> ConfigResult<usize>;

    // ===== 总览 =====

    /// 总览统计窗口（小时），默认 24
    async fn get_overview_window_hours(&self) -> ConfigResult<i64>;
}
