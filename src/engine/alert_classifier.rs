// ==========================================
// 工厂设备维护管理 - 告警分类引擎
// ==========================================
// 职责: 按资产类型画像对读数逐参数判定 Normal / Atenção / Crítico
// 输入: SensorReading 批次
// 输出: ClassifiedReading（状态 + 原因 "{参数} Alta|Baixa"）
// 红线: 纯函数，不访问存储
// ==========================================
// 阈值: warn_high = op_max*warn_factor, crit_high = op_max*crit_factor
//       warn_low  = op_min/warn_factor, crit_low  = op_min/crit_factor
// 比较一律为严格不等
// ==========================================

use crate::config::asset_profiles::ProfileRegistry;
use crate::domain::profile::ParameterEnvelope;
use crate::domain::sensor::{ClassifiedReading, SensorReading};
use crate::domain::types::{AlertStatus, ClassificationPolicy};
use std::sync::Arc;
use tracing::{debug, instrument};

/// 单参数判定结果
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterVerdict {
    pub status: AlertStatus,
    pub reason: String,
}

/// 单参数判定
///
/// 判定顺序: 严重偏高 → 严重偏低 → 关注偏高 → 关注偏低；均不命中返回 None
pub fn evaluate_parameter(envelope: &ParameterEnvelope, value: f64) -> Option<ParameterVerdict> {
    if value.is_nan() {
        return None;
    }

    let (status, direction) = if value > envelope.crit_high() {
        (AlertStatus::Critical, "Alta")
    } else if value < envelope.crit_low() {
        (AlertStatus::Critical, "Baixa")
    } else if value > envelope.warn_high() {
        (AlertStatus::Attention, "Alta")
    } else if value < envelope.warn_low() {
        (AlertStatus::Attention, "Baixa")
    } else {
        return None;
    };

    Some(ParameterVerdict {
        status,
        reason: format!("{} {}", title_case(&envelope.name), direction),
    })
}

/// 参数名标题化: 每段连续字母首字母大写、其余小写
///
/// 例: vazao_oleo → Vazao_Oleo, corrente_eletrica → Corrente_Eletrica
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

// ==========================================
// AlertClassifier - 告警分类器
// ==========================================
pub struct AlertClassifier {
    registry: Arc<ProfileRegistry>,
    policy: ClassificationPolicy,
}

impl AlertClassifier {
    pub fn new(registry: Arc<ProfileRegistry>, policy: ClassificationPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> ClassificationPolicy {
        self.policy
    }

    /// 批量分类
    #[instrument(skip(self, readings), fields(count = readings.len(), policy = self.policy.as_str()))]
    pub fn classify(&self, readings: Vec<SensorReading>) -> Vec<ClassifiedReading> {
        let classified: Vec<ClassifiedReading> =
            readings.into_iter().map(|r| self.classify_one(r)).collect();

        let critical = classified
            .iter()
            .filter(|c| c.status == AlertStatus::Critical)
            .count();
        debug!(critical, "分类完成");
        classified
    }

    /// 单条分类
    ///
    /// 未知资产类型、未监测参数、缺测参数均保持 Normal
    pub fn classify_one(&self, reading: SensorReading) -> ClassifiedReading {
        let profile = match self.registry.get(&reading.asset_type) {
            Some(p) => p,
            None => return ClassifiedReading::normal(reading),
        };

        // 按声明顺序归并
        let verdict = profile
            .params
            .iter()
            .filter_map(|env| reading.value(&env.name).and_then(|v| evaluate_parameter(env, v)))
            .fold(None::<ParameterVerdict>, |acc, next| match (self.policy, acc) {
                (_, None) => Some(next),
                (ClassificationPolicy::LastNonNormalWins, Some(_)) => Some(next),
                (ClassificationPolicy::MostSevere, Some(current)) => {
                    if next.status.severity() > current.status.severity() {
                        Some(next)
                    } else {
                        Some(current)
                    }
                }
            });

        match verdict {
            Some(v) => ClassifiedReading {
                reading,
                status: v.status,
                status_reason: v.reason,
            },
            None => ClassifiedReading::normal(reading),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::AssetProfile;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn registry() -> Arc<ProfileRegistry> {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "Prensa".to_string(),
            AssetProfile::new(vec![
                ParameterEnvelope::new("pressao", 50.0, 100.0, 1.1, 1.2),
                ParameterEnvelope::new("temperatura", 20.0, 80.0, 1.1, 1.2),
            ]),
        );
        Arc::new(ProfileRegistry::new(profiles).unwrap())
    }

    fn reading(values: &[(&str, f64)]) -> SensorReading {
        SensorReading {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            asset_id: "PRENSA-001".to_string(),
            asset_type: "Prensa".to_string(),
            location: "Setor B".to_string(),
            latitude: None,
            longitude: None,
            values: values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("vazao_oleo"), "Vazao_Oleo");
        assert_eq!(title_case("temperatura"), "Temperatura");
        assert_eq!(title_case("CORRENTE_eletrica"), "Corrente_Eletrica");
        assert_eq!(title_case("p2x"), "P2X");
    }

    #[test]
    fn test_pressure_thresholds() {
        let c = AlertClassifier::new(registry(), ClassificationPolicy::LastNonNormalWins);
        let cases = [
            (125.0, AlertStatus::Critical, "Pressao Alta"),
            (115.0, AlertStatus::Attention, "Pressao Alta"),
            (105.0, AlertStatus::Normal, ""),
            (40.0, AlertStatus::Critical, "Pressao Baixa"),
            (43.0, AlertStatus::Attention, "Pressao Baixa"),
        ];
        for (value, status, reason) in cases {
            let out = c.classify_one(reading(&[("pressao", value)]));
            assert_eq!(out.status, status, "value={value}");
            assert_eq!(out.status_reason, reason, "value={value}");
        }
    }

    #[test]
    fn test_exact_boundary_is_not_an_alert() {
        let c = AlertClassifier::new(registry(), ClassificationPolicy::LastNonNormalWins);
        // 恰好等于 crit_high: 仅关注
        let crit_high = 100.0 * 1.2;
        let out = c.classify_one(reading(&[("pressao", crit_high)]));
        assert_eq!(out.status, AlertStatus::Attention);

        let warn_high = 100.0 * 1.1;
        let out = c.classify_one(reading(&[("pressao", warn_high)]));
        assert_eq!(out.status, AlertStatus::Normal);
    }

    #[test]
    fn test_last_non_normal_wins_vs_most_severe() {
        // 压力严重、温度关注：历史策略取后者
        let r = reading(&[("pressao", 130.0), ("temperatura", 90.0)]);

        let legacy = AlertClassifier::new(registry(), ClassificationPolicy::LastNonNormalWins);
        let out = legacy.classify_one(r.clone());
        assert_eq!(out.status, AlertStatus::Attention);
        assert_eq!(out.status_reason, "Temperatura Alta");

        let severe = AlertClassifier::new(registry(), ClassificationPolicy::MostSevere);
        let out = severe.classify_one(r);
        assert_eq!(out.status, AlertStatus::Critical);
        assert_eq!(out.status_reason, "Pressao Alta");
    }

    #[test]
    fn test_normal_parameter_does_not_clear_earlier_alert() {
        let c = AlertClassifier::new(registry(), ClassificationPolicy::LastNonNormalWins);
        let out = c.classify_one(reading(&[("pressao", 130.0), ("temperatura", 50.0)]));
        assert_eq!(out.status, AlertStatus::Critical);
        assert_eq!(out.status_reason, "Pressao Alta");
    }

    #[test]
    fn test_unknown_type_and_missing_values_stay_normal() {
        let c = AlertClassifier::new(registry(), ClassificationPolicy::LastNonNormalWins);

        let mut unknown = reading(&[("pressao", 500.0)]);
        unknown.asset_type = "Outro".to_string();
        assert_eq!(c.classify_one(unknown).status, AlertStatus::Normal);

        let missing = reading(&[("vibracao", 99.0)]);
        assert_eq!(c.classify_one(missing).status, AlertStatus::Normal);

        let nan = reading(&[("pressao", f64::NAN)]);
        assert_eq!(c.classify_one(nan).status, AlertStatus::Normal);

        let batch = c.classify(vec![reading(&[("pressao", 130.0)]), reading(&[])]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].status_reason, "");
    }
}
