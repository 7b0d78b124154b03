// ==========================================
// 工厂设备维护管理 - 工单领域模型
// ==========================================
// 红线: 工单永不删除，只能通过状态迁移/附件/备件操作变更
// 红线: 同一 (asset_id, reason) 最多一张活动工单
// ==========================================

use crate::domain::types::{OrderClass, OrderStatus, Priority, Recurrence, UNASSIGNED};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// ServiceOrder - 维护工单 (OS)
// ==========================================
// 对齐: service_order 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOrder {
    // ===== 主键 =====
    pub os_id: String,

    // ===== 资产 =====
    pub asset_id: String,
    pub asset_type: String,

    // ===== 工单内容 =====
    pub creation_date: NaiveDateTime,
    pub reason: String,
    pub priority: Priority,
    pub status: OrderStatus,
    pub class: OrderClass,
    pub recurrence: Recurrence,
    pub assigned_to: String,
    pub notes: String,

    // ===== 成本 =====
    pub estimated_cost: f64,
    pub actual_cost: f64,

    // ===== 完工信息 =====
    pub root_cause: Option<String>,
    pub files_attached: Vec<String>, // 有序集合（不重复）
    pub completion_date: Option<NaiveDateTime>,
}

impl ServiceOrder {
    /// 生成全局唯一工单号: OS-<12位十六进制>
    pub fn generate_id() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("OS-{}", &hex[..12])
    }

    /// 是否处于活动状态
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// 维修时长（小时），仅完工工单有值
    pub fn repair_hours(&self) -> Option<f64> {
        self.completion_date
            .map(|done| (done - self.creation_date).num_seconds() as f64 / 3600.0)
    }
}

// ==========================================
// NewServiceOrder - 人工创建工单的输入
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewServiceOrder {
    pub asset_id: String,
    pub asset_type: String,
    pub reason: String,
    pub priority: Priority,
    pub class: OrderClass,
    pub recurrence: Recurrence,
    pub assigned_to: Option<String>,
    pub estimated_cost: f64,
}

impl NewServiceOrder {
    /// 转换为待落库的工单（初始状态恒为 Aberta）
    pub fn into_order(self, now: NaiveDateTime) -> ServiceOrder {
        ServiceOrder {
            os_id: ServiceOrder::generate_id(),
            asset_id: self.asset_id.trim().to_string(),
            asset_type: self.asset_type,
            creation_date: now,
            reason: self.reason.trim().to_string(),
            priority: self.priority,
            status: OrderStatus::Open,
            class: self.class,
            recurrence: self.recurrence,
            assigned_to: self
                .assigned_to
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| UNASSIGNED.to_string()),
            notes: String::new(),
            estimated_cost: self.estimated_cost,
            actual_cost: 0.0,
            root_cause: None,
            files_attached: Vec::new(),
            completion_date: None,
        }
    }
}

// ==========================================
// OrderTransition - 状态迁移请求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTransition {
    pub new_status: OrderStatus,
    pub notes: String,
    pub actual_cost: f64,
    pub root_cause: Option<String>,
}
