// ==========================================
// 工厂设备维护管理 - API 层
// ==========================================
// 职责: 提供带访问控制的业务 API 接口，供 CLI / 上层界面调用
// ==========================================

pub mod access_guard;
pub mod analytics_api;
pub mod asset_api;
pub mod error;
pub mod inventory_api;
pub mod maintenance_api;
pub mod role_api;

// 重导出核心类型
pub use access_guard::AccessGuard;
pub use analytics_api::{AnalyticsApi, AnalyticsDeps, AssetHistory, OrderHistoryEntry};
pub use asset_api::AssetApi;
pub use error::{ApiError, ApiResult};
pub use inventory_api::InventoryApi;
pub use maintenance_api::{EvaluationReport, MaintenanceApi};
pub use role_api::RoleApi;
