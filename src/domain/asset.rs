// ==========================================
// 工厂设备维护管理 - 资产台账模型
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,   // 如 MOTOR-001
    pub asset_type: String, // 必须存在于 ProfileRegistry
    pub location: String,   // 如 Setor A-Linha 2
    pub description: String,
    pub install_date: Option<NaiveDate>,
}
