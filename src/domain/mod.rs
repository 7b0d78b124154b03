// ==========================================
// 工厂设备维护管理 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod access;
pub mod asset;
pub mod inventory;
pub mod profile;
pub mod sensor;
pub mod service_order;
pub mod types;

// 重导出核心类型
pub use access::{is_page_allowed, RequestContext, RolePermission};
pub use asset::Asset;
pub use inventory::{Part, PartUsageDetail, PartsUsageRecord};
pub use profile::{AssetProfile, ParameterEnvelope};
pub use sensor::{ClassifiedReading, SensorReading};
pub use service_order::{NewServiceOrder, OrderTransition, ServiceOrder};
pub use types::{AlertStatus, ClassificationPolicy, OrderClass, OrderStatus, Priority, Recurrence};
