// ==========================================
// 工厂设备维护管理 - 引擎层
// ==========================================
// 职责: 实现维护业务规则（告警分级/抑制/工单/库存/统计/研判）
// 红线: Engine 不拼 SQL，数据访问全部经由 Repository
// ==========================================

pub mod alert_classifier;
pub mod alert_suppression;
pub mod error;
pub mod inventory_ledger;
pub mod kpi;
pub mod order_lifecycle;
pub mod plant_overview;
pub mod risk_triage;

// 重导出核心引擎
pub use alert_classifier::{evaluate_parameter, title_case, AlertClassifier, ParameterVerdict};
pub use alert_suppression::{suppress, AlertSuppression};
pub use error::{EngineError, EngineResult};
pub use inventory_ledger::InventoryLedger;
pub use kpi::{KpiEngine, KpiReport, TimeBucket};
pub use order_lifecycle::{technician_work_list, ServiceOrderLifecycle};
pub use plant_overview::{alert_history, build_overview, AlertEvent, PlantOverview};
pub use risk_triage::{
    FailureRisk, ForecastError, ForecastProvider, LinearTrendForecaster, RiskTriage,
    TriageSettings,
};
