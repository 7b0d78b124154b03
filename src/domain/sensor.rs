// ==========================================
// 工厂设备维护管理 - 传感器读数模型
// ==========================================
// 红线: 读数由外部采集写入，核心只读
// 红线: 分级结果不落库，每次评估重新计算
// ==========================================

use crate::domain::types::AlertStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// SensorReading - 单行传感器读数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub timestamp: NaiveDateTime,
    pub asset_id: String,
    pub asset_type: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    // 参数名 → 数值（缺测参数不出现在映射中）
    pub values: BTreeMap<String, f64>,
}

impl SensorReading {
    /// 读取参数值（NaN 视为缺测）
    pub fn value(&self, param: &str) -> Option<f64> {
        self.values.get(param).copied().filter(|v| !v.is_nan())
    }
}

// ==========================================
// ClassifiedReading - 分级后的读数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedReading {
    #[serde(flatten)]
    pub reading: SensorReading,
    pub status: AlertStatus,
    pub status_reason: String, // 空串表示无告警
}

impl ClassifiedReading {
    /// 以 Normal 状态包装读数
    pub fn normal(reading: SensorReading) -> Self {
        Self {
            reading,
            status: AlertStatus::Normal,
            status_reason: String::new(),
        }
    }

    pub fn asset_id(&self) -> &str {
        &self.reading.asset_id
    }
}
