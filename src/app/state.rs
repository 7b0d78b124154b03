// ==========================================
// 工厂设备维护管理 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{
    AccessGuard, AnalyticsApi, AnalyticsDeps, AssetApi, InventoryApi, MaintenanceApi, RoleApi,
};
use crate::config::{ConfigManager, MaintenanceConfigReader, ProfileRegistry};
use crate::db::open_and_migrate;
use crate::engine::{
    AlertClassifier, AlertSuppression, ForecastProvider, InventoryLedger, LinearTrendForecaster,
    RiskTriage, ServiceOrderLifecycle,
};
use crate::importer::ReadingImporter;
use crate::repository::{
    AssetRepository, PartRepository, PartsUsageRepository, ResolvedAlertRepository,
    RoleRepository, SensorReadingRepository, ServiceOrderRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源（同一数据库连接）
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 画像注册表（启动时构建）
    pub registry: Arc<ProfileRegistry>,

    /// 评估流程与工单 API
    pub maintenance_api: Arc<MaintenanceApi>,

    /// 备件库存 API
    pub inventory_api: Arc<InventoryApi>,

    /// 分析 API（总览/历史/KPI/研判）
    pub analytics_api: Arc<AnalyticsApi>,

    /// 资产台账 API
    pub asset_api: Arc<AssetApi>,

    /// 角色权限 API
    pub role_api: Arc<RoleApi>,

    /// 读数导入器
    pub importer: Arc<ReadingImporter>,
}

impl AppState {
    /// 创建新的AppState实例（使用内置线性趋势预测）
    pub async fn new(db_path: String) -> Result<Self, String> {
        Self::with_forecaster(db_path, Arc::new(LinearTrendForecaster::new())).await
    }

    /// 创建AppState实例并注入预测适配器
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表
    /// 2. 读取配置（告警策略、画像注册表）
    /// 3. 初始化所有Repository/Engine/API
    pub async fn with_forecaster(
        db_path: String,
        forecaster: Arc<dyn ForecastProvider>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_and_migrate(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let policy = config_manager
            .get_classification_policy()
            .await
            .map_err(|e| format!("读取告警策略失败: {}", e))?;
        let registry = Arc::new(
            config_manager
                .get_profile_registry()
                .await
                .map_err(|e| format!("读取画像注册表失败: {}", e))?,
        );
        tracing::info!(
            policy = policy.as_str(),
            asset_types = registry.len(),
            "配置已加载"
        );
        let config: Arc<dyn MaintenanceConfigReader> = config_manager.clone();

        // ==========================================
        // Repository 层
        // ==========================================
        let sensor_repo = Arc::new(SensorReadingRepository::from_connection(conn.clone()));
        let resolved_repo = Arc::new(ResolvedAlertRepository::from_connection(conn.clone()));
        let order_repo = Arc::new(ServiceOrderRepository::from_connection(conn.clone()));
        let part_repo = Arc::new(PartRepository::from_connection(conn.clone()));
        let parts_usage_repo = Arc::new(PartsUsageRepository::from_connection(conn.clone()));
        let asset_repo = Arc::new(AssetRepository::from_connection(conn.clone()));
        let role_repo = Arc::new(RoleRepository::from_connection(conn.clone()));

        // ==========================================
        // Engine 层
        // ==========================================
        let classifier = Arc::new(AlertClassifier::new(registry.clone(), policy));
        let suppression = Arc::new(AlertSuppression::new(resolved_repo));
        let lifecycle = Arc::new(ServiceOrderLifecycle::new(
            order_repo,
            part_repo.clone(),
        ));
        let ledger = Arc::new(InventoryLedger::new(part_repo));
        let triage = Arc::new(RiskTriage::new(
            sensor_repo.clone(),
            registry.clone(),
            forecaster,
        ));
        let guard = Arc::new(AccessGuard::new(role_repo.clone()));

        // ==========================================
        // API 层
        // ==========================================
        let maintenance_api = Arc::new(MaintenanceApi::new(
            sensor_repo.clone(),
            classifier.clone(),
            suppression.clone(),
            lifecycle.clone(),
            guard.clone(),
            config.clone(),
        ));
        let inventory_api = Arc::new(InventoryApi::new(ledger.clone(), guard.clone()));
        let analytics_api = Arc::new(AnalyticsApi::new(AnalyticsDeps {
            sensor_repo: sensor_repo.clone(),
            asset_repo: asset_repo.clone(),
            parts_usage_repo,
            classifier,
            suppression,
            lifecycle,
            ledger,
            triage,
            guard: guard.clone(),
            config,
        }));
        let asset_api = Arc::new(AssetApi::new(asset_repo, registry.clone(), guard.clone()));
        let role_api = Arc::new(RoleApi::new(role_repo, guard));
        let importer = Arc::new(ReadingImporter::new(sensor_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            config_manager,
            registry,
            maintenance_api,
            inventory_api,
            analytics_api,
            asset_api,
            role_api,
            importer,
        })
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 PLANT_MAINTENANCE_DB_PATH（非空时）
/// - 否则: 用户数据目录/plant-maintenance/plant_maintenance.db
/// - 取不到用户数据目录时: ./plant_maintenance.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("PLANT_MAINTENANCE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./plant_maintenance.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("plant-maintenance");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("plant_maintenance.db");
        }
    }

    path.to_string_lossy().to_string()
}
