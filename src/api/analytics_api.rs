// ==========================================
// 工厂设备维护管理 - 分析 API
// ==========================================
// 职责: 工厂总览 / 资产历史 / 维护 KPI / 故障风险研判
// 红线: 只读，不触发工单生成
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::api::access_guard::AccessGuard;
use crate::api::error::{ApiError, ApiResult};
use crate::config::MaintenanceConfigReader;
use crate::domain::access::{pages, RequestContext};
use crate::domain::inventory::PartUsageDetail;
use crate::domain::sensor::ClassifiedReading;
use crate::domain::service_order::ServiceOrder;
use crate::engine::alert_classifier::AlertClassifier;
use crate::engine::alert_suppression::AlertSuppression;
use crate::engine::error::EngineError;
use crate::engine::inventory_ledger::InventoryLedger;
use crate::engine::kpi::{KpiEngine, KpiReport, TimeBucket};
use crate::engine::order_lifecycle::ServiceOrderLifecycle;
use crate::engine::plant_overview::{alert_history, build_overview, AlertEvent, PlantOverview};
use crate::engine::risk_triage::{FailureRisk, RiskTriage, TriageSettings};
use crate::repository::asset_repo::AssetRepository;
use crate::repository::parts_usage_repo::PartsUsageRepository;
use crate::repository::sensor_repo::SensorReadingRepository;

// ==========================================
// 资产历史
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHistoryEntry {
    pub order: ServiceOrder,
    pub parts: Vec<PartUsageDetail>,
    pub parts_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetHistory {
    pub asset_id: String,
    pub orders: Vec<OrderHistoryEntry>, // 最新在前
    pub alerts: Vec<AlertEvent>,        // 最新在前
}

/// AnalyticsApi 依赖的组件
pub struct AnalyticsDeps {
    pub sensor_repo: Arc<SensorReadingRepository>,
    pub asset_repo: Arc<AssetRepository>,
    pub parts_usage_repo: Arc<PartsUsageRepository>,
    pub classifier: Arc<AlertClassifier>,
    pub suppression: Arc<AlertSuppression>,
    pub lifecycle: Arc<ServiceOrderLifecycle>,
    pub ledger: Arc<InventoryLedger>,
    pub triage: Arc<RiskTriage>,
    pub guard: Arc<AccessGuard>,
    pub config: Arc<dyn MaintenanceConfigReader>,
}

pub struct AnalyticsApi {
    deps: AnalyticsDeps,
    kpi_engine: KpiEngine,
}

fn config_error(e: Box<dyn std::error::Error + Send + Sync>) -> ApiError {
    ApiError::ConfigError(e.to_string())
}

impl AnalyticsApi {
    pub fn new(deps: AnalyticsDeps) -> Self {
        Self {
            deps,
            kpi_engine: KpiEngine::new(),
        }
    }

    fn classified(&self) -> ApiResult<Vec<ClassifiedReading>> {
        let readings = self.deps.sensor_repo.all()?;
        let classified = self.deps.classifier.classify(readings);
        Ok(self.deps.suppression.apply(classified)?)
    }

    // ==========================================
    // 工厂总览
    // ==========================================

    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn plant_overview(&self, ctx: &RequestContext) -> ApiResult<PlantOverview> {
        self.deps.guard.require(ctx, pages::OVERVIEW)?;
        let window_hours = self
            .deps
            .config
            .get_overview_window_hours()
            .await
            .map_err(config_error)?;

        let classified = self.classified()?;
        let orders = self.deps.lifecycle.all()?;
        let low_stock = self.deps.ledger.low_stock()?;
        Ok(build_overview(&classified, &orders, low_stock, window_hours))
    }

    // ==========================================
    // 资产历史
    // ==========================================

    pub fn asset_history(&self, ctx: &RequestContext, asset_id: &str) -> ApiResult<AssetHistory> {
        self.deps.guard.require(ctx, pages::EQUIPMENT_HISTORY)?;

        let mut orders = Vec::new();
        for order in self.deps.lifecycle.find_by_asset(asset_id)? {
            let parts = self.deps.parts_usage_repo.find_by_order_with_parts(&order.os_id)?;
            let parts_cost = parts.iter().map(PartUsageDetail::total_cost).sum();
            orders.push(OrderHistoryEntry {
                order,
                parts,
                parts_cost,
            });
        }

        let alerts = alert_history(&self.classified()?, asset_id);
        debug!(asset_id, orders = orders.len(), alerts = alerts.len(), "资产历史");
        Ok(AssetHistory {
            asset_id: asset_id.to_string(),
            orders,
            alerts,
        })
    }

    // ==========================================
    // 维护 KPI
    // ==========================================

    /// 维护 KPI
    ///
    /// # 参数
    /// - `start`/`end`: 创建日期范围（含），缺省取全部工单的最早/最晚创建日期
    /// - `bucket`: 趋势粒度
    ///
    /// # 错误
    /// - InvalidInput: start > end
    /// - DataUnavailable: 无工单且未指定范围
    pub fn maintenance_kpis(
        &self,
        ctx: &RequestContext,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        bucket: TimeBucket,
    ) -> ApiResult<KpiReport> {
        self.deps.guard.require(ctx, pages::MAINTENANCE_KPIS)?;
        let orders = self.deps.lifecycle.all()?;

        let (start, end) = match (start, end, self.kpi_engine.default_range(&orders)) {
            (Some(s), Some(e), _) => (s, e),
            (s, e, Some((min, max))) => (s.unwrap_or(min), e.unwrap_or(max)),
            (Some(s), None, None) => (s, s),
            (None, Some(e), None) => (e, e),
            (None, None, None) => {
                return Err(EngineError::DataUnavailable("暂无工单".to_string()).into())
            }
        };
        if start > end {
            return Err(ApiError::InvalidInput(format!(
                "起始日期{}晚于结束日期{}",
                start, end
            )));
        }

        Ok(self.kpi_engine.compute(&orders, start, end, bucket))
    }

    // ==========================================
    // 故障风险研判
    // ==========================================

    pub async fn failure_triage(&self, ctx: &RequestContext) -> ApiResult<Vec<FailureRisk>> {
        self.deps.guard.require(ctx, pages::FAILURE_PREDICTION)?;
        let config = &self.deps.config;
        let settings = TriageSettings {
            horizon_hours: config.get_forecast_horizon_hours().await.map_err(config_error)?,
            min_history: config.get_forecast_min_history().await.map_err(config_error)?,
            history_limit: config.get_forecast_history_limit().await.map_err(config_error)?,
        };

        let assets = self.deps.asset_repo.list()?;
        Ok(self.deps.triage.triage(&assets, settings).await?)
    }
}
