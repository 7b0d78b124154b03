// ==========================================
// 工厂设备维护管理 - 设备运行包络模型
// ==========================================
// 职责: 定义资产类型的监测参数与阈值换算
// 红线: 只描述阈值，不含判定逻辑
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ParameterEnvelope - 单个参数的运行包络
// ==========================================
// 约束: crit_factor >= warn_factor >= 1.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEnvelope {
    pub name: String,     // 参数名（与读数字段一致，如 temperatura）
    pub op_min: f64,      // 运行下限
    pub op_max: f64,      // 运行上限
    pub warn_factor: f64, // 关注系数
    pub crit_factor: f64, // 严重系数
}

impl ParameterEnvelope {
    pub fn new(name: &str, op_min: f64, op_max: f64, warn_factor: f64, crit_factor: f64) -> Self {
        Self {
            name: name.to_string(),
            op_min,
            op_max,
            warn_factor,
            crit_factor,
        }
    }

    pub fn warn_high(&self) -> f64 {
        self.op_max * self.warn_factor
    }

    pub fn crit_high(&self) -> f64 {
        self.op_max * self.crit_factor
    }

    pub fn warn_low(&self) -> f64 {
        self.op_min / self.warn_factor
    }

    pub fn crit_low(&self) -> f64 {
        self.op_min / self.crit_factor
    }

    /// 校验系数约束
    ///
    /// # 返回
    /// - Ok(()): 合法
    /// - Err(String): 违规原因
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("参数名为空".to_string());
        }
        if !(self.warn_factor >= 1.0) {
            return Err(format!(
                "参数{}: warn_factor={} 必须 >= 1.0",
                self.name, self.warn_factor
            ));
        }
        if !(self.crit_factor >= self.warn_factor) {
            return Err(format!(
                "参数{}: crit_factor={} 必须 >= warn_factor={}",
                self.name, self.crit_factor, self.warn_factor
            ));
        }
        if self.op_min > self.op_max {
            return Err(format!(
                "参数{}: op_min={} 大于 op_max={}",
                self.name, self.op_min, self.op_max
            ));
        }
        Ok(())
    }
}

// ==========================================
// AssetProfile - 资产类型的监测参数集合
// ==========================================
// 参数顺序即判定顺序（声明顺序，固定不变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetProfile {
    pub params: Vec<ParameterEnvelope>,
}

impl AssetProfile {
    pub fn new(params: Vec<ParameterEnvelope>) -> Self {
        Self { params }
    }

    /// 按参数名查找包络
    pub fn param(&self, name: &str) -> Option<&ParameterEnvelope> {
        self.params.iter().find(|p| p.name == name)
    }
}
