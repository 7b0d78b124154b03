// ==========================================
// 工厂设备维护管理 - 领域类型定义
// ==========================================
// 持久化字符串沿用现场的葡语词汇（与历史数据库一致）
// ==========================================

use chrono::{Duration, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 根因未定义的哨兵值（完工时不可使用）
pub const ROOT_CAUSE_UNDEFINED: &str = "Não Definida";

/// 未分配技师的默认值
pub const UNASSIGNED: &str = "Não atribuído";

/// 可选根因列表（首项为哨兵值）
pub const ROOT_CAUSES: [&str; 9] = [
    ROOT_CAUSE_UNDEFINED,
    "Desgaste Natural",
    "Falha de Componente Elétrico",
    "Falha de Componente Mecânico",
    "Falta de Lubrificação",
    "Erro de Operação",
    "Sobrecarga",
    "Problema de Software/CLP",
    "Outros",
];

// ==========================================
// 告警状态 (Alert Status)
// ==========================================
// 顺序: Normal < NormalResolved < Attention < Critical（仅用于看板聚合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertStatus {
    #[serde(rename = "Normal")]
    Normal, // 正常
    #[serde(rename = "Normal (Resolvido)")]
    NormalResolved, // 已处理（抑制）
    #[serde(rename = "Atenção")]
    Attention, // 关注
    #[serde(rename = "Crítico")]
    Critical, // 严重
}

impl AlertStatus {
    /// 是否为需要处理的告警（关注/严重）
    pub fn is_actionable(&self) -> bool {
        matches!(self, AlertStatus::Attention | AlertStatus::Critical)
    }

    /// 严重度，用于 MostSevere 策略比较
    pub fn severity(&self) -> u8 {
        match self {
            AlertStatus::Normal | AlertStatus::NormalResolved => 0,
            AlertStatus::Attention => 1,
            AlertStatus::Critical => 2,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            AlertStatus::Normal => "Normal",
            AlertStatus::NormalResolved => "Normal (Resolvido)",
            AlertStatus::Attention => "Atenção",
            AlertStatus::Critical => "Crítico",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 多参数告警归并策略 (Classification Policy)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    /// 按参数声明顺序，最后一个非 Normal 的参数覆盖前者（历史行为）
    #[default]
    LastNonNormalWins,
    /// 取最严重的参数；同级取先出现者
    MostSevere,
}

impl ClassificationPolicy {
    /// 从配置值解析（未知值回落到默认策略）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "most_severe" => ClassificationPolicy::MostSevere,
            _ => ClassificationPolicy::LastNonNormalWins,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationPolicy::LastNonNormalWins => "last_non_normal_wins",
            ClassificationPolicy::MostSevere => "most_severe",
        }
    }
}

// ==========================================
// 工单状态 (Service Order Status)
// ==========================================
// 状态机: Aberta → Em Andamento → Concluída（只进不退）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "Aberta")]
    Open, // 待处理
    #[serde(rename = "Em Andamento")]
    InProgress, // 处理中
    #[serde(rename = "Concluída")]
    Completed, // 已完工（终态）
}

impl OrderStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "Aberta" => Some(OrderStatus::Open),
            "Em Andamento" => Some(OrderStatus::InProgress),
            "Concluída" => Some(OrderStatus::Completed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "Aberta",
            OrderStatus::InProgress => "Em Andamento",
            OrderStatus::Completed => "Concluída",
        }
    }

    /// 是否为活动状态（参与去重约束）
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::InProgress)
    }

    /// 状态迁移是否合法
    ///
    /// 规则:
    /// - 终态不可迁出
    /// - 只允许前进或原地更新（原地更新用于补充备注/成本）
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == OrderStatus::Completed {
            return false;
        }
        next >= *self
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 工单优先级 (Priority)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "Baixa")]
    Low,
    #[serde(rename = "Média")]
    Medium,
    #[serde(rename = "Alta")]
    High,
    #[serde(rename = "Crítica")]
    Critical,
}

impl Priority {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "Baixa" => Some(Priority::Low),
            "Média" => Some(Priority::Medium),
            "Alta" => Some(Priority::High),
            "Crítica" => Some(Priority::Critical),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Priority::Low => "Baixa",
            Priority::Medium => "Média",
            Priority::High => "Alta",
            Priority::Critical => "Crítica",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 工单类别 (Order Class)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderClass {
    #[serde(rename = "Preventiva")]
    Preventive, // 预防性
    #[serde(rename = "Corretiva")]
    Corrective, // 纠正性
    #[serde(rename = "Preditiva")]
    Predictive, // 预测性（由严重告警自动生成）
}

impl OrderClass {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "Preventiva" => Some(OrderClass::Preventive),
            "Corretiva" => Some(OrderClass::Corrective),
            "Preditiva" => Some(OrderClass::Predictive),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderClass::Preventive => "Preventiva",
            OrderClass::Corrective => "Corretiva",
            OrderClass::Predictive => "Preditiva",
        }
    }

    /// 是否计入故障类 KPI（MTTR/MTBF）
    pub fn is_failure(&self) -> bool {
        matches!(self, OrderClass::Corrective | OrderClass::Predictive)
    }
}

impl fmt::Display for OrderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 重复周期 (Recurrence)
// ==========================================
// 月/季/半年/年按日历月计算，周按固定 7 天
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recurrence {
    #[serde(rename = "Não recorrente")]
    None,
    #[serde(rename = "Semanalmente")]
    Weekly,
    #[serde(rename = "Mensalmente")]
    Monthly,
    #[serde(rename = "Trimestralmente")]
    Quarterly,
    #[serde(rename = "Semestralmente")]
    Semiannual,
    #[serde(rename = "Anualmente")]
    Annual,
}

impl Recurrence {
    /// 从字符串解析（未知值按不重复处理）
    pub fn from_str(s: &str) -> Self {
        match s.trim() {
            "Semanalmente" => Recurrence::Weekly,
            "Mensalmente" => Recurrence::Monthly,
            "Trimestralmente" => Recurrence::Quarterly,
            "Semestralmente" => Recurrence::Semiannual,
            "Anualmente" => Recurrence::Annual,
            _ => Recurrence::None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Recurrence::None => "Não recorrente",
            Recurrence::Weekly => "Semanalmente",
            Recurrence::Monthly => "Mensalmente",
            Recurrence::Quarterly => "Trimestralmente",
            Recurrence::Semiannual => "Semestralmente",
            Recurrence::Annual => "Anualmente",
        }
    }

    /// 计算下一次到期时间
    ///
    /// # 返回
    /// - Some(NaiveDateTime): 到期时间
    /// - None: 不重复，或日期溢出
    pub fn next_due(&self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Recurrence::None => None,
            Recurrence::Weekly => from.checked_add_signed(Duration::days(7)),
            Recurrence::Monthly => from.checked_add_months(Months::new(1)),
            Recurrence::Quarterly => from.checked_add_months(Months::new(3)),
            Recurrence::Semiannual => from.checked_add_months(Months::new(6)),
            Recurrence::Annual => from.checked_add_months(Months::new(12)),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_order_status_forward_only() {
        assert!(OrderStatus::Open.can_transition_to(OrderStatus::InProgress));
        assert!(OrderStatus::Open.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::InProgress.can_transition_to(OrderStatus::InProgress));
        assert!(!OrderStatus::InProgress.can_transition_to(OrderStatus::Open));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Open));
    }

    #[test]
    fn test_recurrence_calendar_months() {
        // 1月31日 + 1个日历月 → 2月最后一天
        assert_eq!(
            Recurrence::Monthly.next_due(at(2024, 1, 31)),
            Some(at(2024, 2, 29))
        );
        assert_eq!(
            Recurrence::Quarterly.next_due(at(2024, 1, 15)),
            Some(at(2024, 4, 15))
        );
        assert_eq!(
            Recurrence::Annual.next_due(at(2024, 2, 29)),
            Some(at(2025, 2, 28))
        );
        assert_eq!(
            Recurrence::Weekly.next_due(at(2024, 1, 15)),
            Some(at(2024, 1, 22))
        );
        assert_eq!(Recurrence::None.next_due(at(2024, 1, 15)), None);
    }

    #[test]
    fn test_db_string_round_trip() {
        for s in ["Aberta", "Em Andamento", "Concluída"] {
            assert_eq!(OrderStatus::from_str(s).unwrap().to_db_str(), s);
        }
        assert_eq!(Recurrence::from_str("qualquer"), Recurrence::None);
        assert_eq!(Priority::from_str("Crítica"), Some(Priority::Critical));
        assert_eq!(OrderClass::from_str("Preditiva"), Some(OrderClass::Predictive));
        assert_eq!(
            ClassificationPolicy::from_str(" MOST_SEVERE "),
            ClassificationPolicy::MostSevere
        );
        assert_eq!(
            ClassificationPolicy::from_str("bogus"),
            ClassificationPolicy::LastNonNormalWins
        );
    }
}
