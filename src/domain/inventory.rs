// ==========================================
// 工厂设备维护管理 - 备件库存模型
// ==========================================
// 红线: stock_quantity 任何时刻不得为负
// ==========================================

use serde::{Deserialize, Serialize};

/// 默认最低库存
pub const DEFAULT_MIN_STOCK_LEVEL: i64 = 5;

// ==========================================
// Part - 备件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub part_id: String, // SKU
    pub description: String,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    pub unit_cost: f64,
}

impl Part {
    /// 是否低于（含等于）最低库存
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }
}

// ==========================================
// PartsUsageRecord - 备件消耗记录（只追加）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartsUsageRecord {
    pub usage_id: Option<i64>, // 落库后生成
    pub os_id: String,
    pub part_id: String,
    pub quantity_used: i64,
}

// ==========================================
// PartUsageDetail - 工单备件明细（关联备件主数据）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartUsageDetail {
    pub part_id: String,
    pub description: String,
    pub quantity_used: i64,
    pub unit_cost: f64,
}

impl PartUsageDetail {
    pub fn total_cost(&self) -> f64 {
        self.quantity_used as f64 * self.unit_cost
    }
}
