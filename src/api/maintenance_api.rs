// ==========================================
// 工厂设备维护管理 - 维护 API
// ==========================================
// 职责: 评估流程（分级/抑制/工单生成）与工单操作
// 评估顺序: 周期重开 → 读取读数 → 分级 → 抑制 → 严重告警生成工单
// ==========================================

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::access_guard::AccessGuard;
use crate::api::error::{ApiError, ApiResult};
use crate::config::MaintenanceConfigReader;
use crate::domain::access::{pages, RequestContext};
use crate::domain::inventory::PartsUsageRecord;
use crate::domain::sensor::ClassifiedReading;
use crate::domain::service_order::{NewServiceOrder, OrderTransition, ServiceOrder};
use crate::engine::alert_classifier::AlertClassifier;
use crate::engine::alert_suppression::AlertSuppression;
use crate::engine::error::EngineError;
use crate::engine::order_lifecycle::{attachment_file_name, ServiceOrderLifecycle};
use crate::repository::sensor_repo::SensorReadingRepository;

// ==========================================
// EvaluationReport - 单次评估结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub evaluated_at: NaiveDateTime,
    pub readings: usize,
    pub status_counts: BTreeMap<String, usize>,
    pub recurring_created: Vec<String>,
    pub predictive_created: Vec<String>,
    pub classified: Vec<ClassifiedReading>,
}

pub struct MaintenanceApi {
    sensor_repo: Arc<SensorReadingRepository>,
    classifier: Arc<AlertClassifier>,
    suppression: Arc<AlertSuppression>,
    lifecycle: Arc<ServiceOrderLifecycle>,
    guard: Arc<AccessGuard>,
    config: Arc<dyn MaintenanceConfigReader>,
}

impl MaintenanceApi {
    pub fn new(
        sensor_repo: Arc<SensorReadingRepository>,
        classifier: Arc<AlertClassifier>,
        suppression: Arc<AlertSuppression>,
        lifecycle: Arc<ServiceOrderLifecycle>,
        guard: Arc<AccessGuard>,
        config: Arc<dyn MaintenanceConfigReader>,
    ) -> Self {
        Self {
            sensor_repo,
            classifier,
            suppression,
            lifecycle,
            guard,
            config,
        }
    }

    // ==========================================
    // 评估流程
    // ==========================================

    /// 执行一次评估
    ///
    /// # 错误
    /// - DataUnavailable: 读数表为空（此前的周期重开已生效）
    #[instrument(skip(self))]
    pub fn evaluate(&self, now: NaiveDateTime) -> ApiResult<EvaluationReport> {
        let recurring = self.lifecycle.sweep_recurrence(now)?;

        let readings = self.sensor_repo.all()?;
        if readings.is_empty() {
            return Err(EngineError::DataUnavailable("暂无传感器读数".to_string()).into());
        }
        let count = readings.len();

        let classified = self.classifier.classify(readings);
        let classified = self.suppression.apply(classified)?;
        let predictive = self.lifecycle.generate_from_critical(&classified, now)?;

        let mut status_counts = BTreeMap::new();
        for c in &classified {
            *status_counts.entry(c.status.to_string()).or_insert(0) += 1;
        }

        info!(
            readings = count,
            recurring = recurring.len(),
            predictive = predictive.len(),
            "评估完成"
        );

        Ok(EvaluationReport {
            evaluated_at: now,
            readings: count,
            status_counts,
            recurring_created: recurring.into_iter().map(|o| o.os_id).collect(),
            predictive_created: predictive.into_iter().map(|o| o.os_id).collect(),
            classified,
        })
    }

    /// 设备监控页: 执行评估并返回结果
    pub fn equipment_monitoring(
        &self,
        ctx: &RequestContext,
        now: NaiveDateTime,
    ) -> ApiResult<EvaluationReport> {
        self.guard.require(ctx, pages::EQUIPMENT_MONITORING)?;
        self.evaluate(now)
    }

    /// 当前分级结果（只读，不生成工单）
    pub fn classified_readings(&self) -> ApiResult<Vec<ClassifiedReading>> {
        let readings = self.sensor_repo.all()?;
        let classified = self.classifier.classify(readings);
        Ok(self.suppression.apply(classified)?)
    }

    // ==========================================
    // 工单操作
    // ==========================================

    pub fn create_order(
        &self,
        ctx: &RequestContext,
        new_order: NewServiceOrder,
        now: NaiveDateTime,
    ) -> ApiResult<String> {
        self.guard.require(ctx, pages::OS_PLANNING)?;
        let os_id = self.lifecycle.create_manual(new_order, now)?;
        info!(user_id = %ctx.user_id, os_id = %os_id, "人工创建工单");
        Ok(os_id)
    }

    pub fn list_orders(&self, ctx: &RequestContext) -> ApiResult<Vec<ServiceOrder>> {
        self.guard.require(ctx, pages::OS_PLANNING)?;
        Ok(self.lifecycle.all()?)
    }

    pub fn get_order(&self, ctx: &RequestContext, os_id: &str) -> ApiResult<ServiceOrder> {
        self.guard.require(ctx, pages::OS_PLANNING)?;
        Ok(self.lifecycle.get(os_id)?)
    }

    /// 技师更新工单状态
    pub fn update_order(
        &self,
        ctx: &RequestContext,
        os_id: &str,
        transition: OrderTransition,
        now: NaiveDateTime,
    ) -> ApiResult<ServiceOrder> {
        self.guard.require(ctx, pages::TECH_APP)?;
        let updated = self.lifecycle.transition(os_id, transition, now)?;
        info!(user_id = %ctx.user_id, os_id, status = %updated.status, "技师更新工单");
        Ok(updated)
    }

    /// 技师工作清单
    pub fn work_list(&self, ctx: &RequestContext) -> ApiResult<Vec<ServiceOrder>> {
        self.guard.require(ctx, pages::TECH_APP)?;
        Ok(self.lifecycle.work_list(ctx)?)
    }

    /// 工单领用备件
    pub fn consume_part(
        &self,
        ctx: &RequestContext,
        os_id: &str,
        part_id: &str,
        quantity: i64,
    ) -> ApiResult<PartsUsageRecord> {
        self.guard.require(ctx, pages::TECH_APP)?;
        Ok(self.lifecycle.consume_part(os_id, part_id, quantity)?)
    }

    /// 上传附件: 写入上传目录并登记到工单
    ///
    /// # 返回
    /// 存储文件名 {os_id}_{原文件名}
    pub async fn attach_file(
        &self,
        ctx: &RequestContext,
        os_id: &str,
        original_name: &str,
        content: &[u8],
    ) -> ApiResult<String> {
        self.guard.require(ctx, pages::TECH_APP)?;

        // 先确认工单存在，避免留下孤立文件
        self.lifecycle.get(os_id)?;
        let stored = attachment_file_name(os_id, original_name).ok_or_else(|| {
            ApiError::InvalidInput(format!("附件文件名无效: {:?}", original_name))
        })?;

        let upload_dir = self
            .config
            .get_upload_dir()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let dir = PathBuf::from(upload_dir);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ApiError::FileWriteError(format!("{}: {}", dir.display(), e)))?;
        let target = dir.join(&stored);
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| ApiError::FileWriteError(format!("{}: {}", target.display(), e)))?;

        let registered = self.lifecycle.attach_file(os_id, &stored)?;
        info!(user_id = %ctx.user_id, os_id, file = %registered, bytes = content.len(), "附件已上传");
        Ok(registered)
    }
}
