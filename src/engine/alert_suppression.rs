// ==========================================
// 工厂设备维护管理 - 已处理告警抑制
// ==========================================
// 职责: 已登记 (asset_id, reason) 的读数改写为 Normal (Resolvido)
// 红线: 幂等；原因文本保留；登记后永久抑制
// ==========================================

use crate::domain::sensor::ClassifiedReading;
use crate::domain::types::AlertStatus;
use crate::engine::error::EngineResult;
use crate::repository::resolved_alert_repo::ResolvedAlertRepository;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

/// 纯函数抑制
///
/// 仅处理原因非空的读数；已是 Normal (Resolvido) 的读数保持不变
pub fn suppress(
    classified: Vec<ClassifiedReading>,
    resolved: &HashSet<(String, String)>,
) -> Vec<ClassifiedReading> {
    if resolved.is_empty() {
        return classified;
    }

    classified
        .into_iter()
        .map(|mut c| {
            if !c.status_reason.is_empty()
                && resolved.contains(&(c.reading.asset_id.clone(), c.status_reason.clone()))
            {
                c.status = AlertStatus::NormalResolved;
            }
            c
        })
        .collect()
}

// ==========================================
// AlertSuppression - 抑制服务（持有已处理告警仓储）
// ==========================================
pub struct AlertSuppression {
    resolved_repo: Arc<ResolvedAlertRepository>,
}

impl AlertSuppression {
    pub fn new(resolved_repo: Arc<ResolvedAlertRepository>) -> Self {
        Self { resolved_repo }
    }

    /// 读取登记表并抑制
    #[instrument(skip(self, classified), fields(count = classified.len()))]
    pub fn apply(&self, classified: Vec<ClassifiedReading>) -> EngineResult<Vec<ClassifiedReading>> {
        let resolved = self.resolved_repo.all()?;
        Ok(suppress(classified, &resolved))
    }

    /// 登记已处理告警（幂等）
    ///
    /// # 返回
    /// - true: 新登记
    /// - false: 已登记过
    pub fn insert_resolved(&self, asset_id: &str, reason: &str) -> EngineResult<bool> {
        let inserted = self.resolved_repo.insert(asset_id, reason)?;
        if inserted {
            info!(asset_id, reason, "告警已登记为已处理");
        }
        Ok(inserted)
    }
}
