// ==========================================
// 工厂设备维护管理 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 多会话写入依赖事务 + 唯一索引 + 条件更新，不依赖进程内锁
// ==========================================

pub mod asset_repo;
pub mod error;
pub mod part_repo;
pub mod parts_usage_repo;
pub mod resolved_alert_repo;
pub mod role_repo;
pub mod sensor_repo;
pub mod service_order_repo;

// 重导出核心仓储
pub use asset_repo::AssetRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use part_repo::PartRepository;
pub use parts_usage_repo::PartsUsageRepository;
pub use resolved_alert_repo::ResolvedAlertRepository;
pub use role_repo::RoleRepository;
pub use sensor_repo::SensorReadingRepository;
pub use service_order_repo::ServiceOrderRepository;
