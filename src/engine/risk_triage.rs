// ==========================================
// 工厂设备维护管理 - 故障风险研判
// ==========================================
// 职责: 对已登记资产的每个监测参数做趋势预测，找出首次越过严重阈值的时刻
// 说明: 预测能力通过 ForecastProvider trait 注入，内置最小二乘线性趋势
// 红线: 预测不可用的参数直接跳过，不影响其他参数
// ==========================================

use crate::config::asset_profiles::ProfileRegistry;
use crate::domain::asset::Asset;
use crate::domain::profile::ParameterEnvelope;
use crate::engine::error::EngineResult;
use crate::repository::sensor_repo::SensorReadingRepository;
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// 时间序列点
pub type SeriesPoint = (NaiveDateTime, f64);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("历史数据不足: {0} 条")]
    InsufficientHistory(usize),

    #[error("预测不可用: {0}")]
    Unavailable(String),
}

// ==========================================
// ForecastProvider - 预测适配器接口
// ==========================================
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// 按小时步长预测未来 horizon_hours 个点
    ///
    /// # 参数
    /// - `history`: 按时间升序的历史序列
    /// - `horizon_hours`: 预测步数（小时）
    async fn forecast(
        &self,
        history: &[SeriesPoint],
        horizon_hours: i64,
    ) -> Result<Vec<SeriesPoint>, ForecastError>;
}

// ==========================================
// LinearTrendForecaster - 最小二乘线性趋势
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrendForecaster;

impl LinearTrendForecaster {
    pub fn new() -> Self {
        Self
    }

    /// 拟合 y = a + b·x（x 为相对首点的小时数）
    ///
    /// # 返回
    /// (截距, 斜率)
    fn fit(history: &[SeriesPoint]) -> Result<(f64, f64), ForecastError> {
        if history.len() < 2 {
            return Err(ForecastError::InsufficientHistory(history.len()));
        }
        let origin = history[0].0;
        let xs: Vec<f64> = history.iter().map(|(ts, _)| hours_between(origin, *ts)).collect();
        let n = history.len() as f64;
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = history.iter().map(|(_, v)| v).sum::<f64>() / n;

        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for (x, (_, y)) in xs.iter().zip(history) {
            sxy += (x - mean_x) * (y - mean_y);
            sxx += (x - mean_x) * (x - mean_x);
        }
        if sxx <= f64::EPSILON {
            return Err(ForecastError::Unavailable(
                "历史时间戳无跨度".to_string(),
            ));
        }
        let slope = sxy / sxx;
        Ok((mean_y - slope * mean_x, slope))
    }
}

#[async_trait]
impl ForecastProvider for LinearTrendForecaster {
    async fn forecast(
        &self,
        history: &[SeriesPoint],
        horizon_hours: i64,
    ) -> Result<Vec<SeriesPoint>, ForecastError> {
        let (intercept, slope) = Self::fit(history)?;
        let origin = history[0].0;
        let last = history[history.len() - 1].0;

        Ok((1..=horizon_hours.max(0))
            .map(|h| {
                let ts = last + Duration::hours(h);
                (ts, intercept + slope * hours_between(origin, ts))
            })
            .collect())
    }
}

fn hours_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}

// ==========================================
// 研判结果
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachSide {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRisk {
    pub asset_id: String,
    pub asset_type: String,
    pub parameter: String,
    pub side: BreachSide,
    pub threshold: f64,
    pub predicted_value: f64,
    pub predicted_breach: NaiveDateTime,
    pub hours_to_failure: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriageSettings {
    pub horizon_hours: i64,
    pub min_history: usize,
    pub history_limit: usize,
}

/// 找出预测序列中首个越过严重阈值的点（严格大于 crit_high 或严格小于 crit_low）
pub fn first_breach(
    envelope: &ParameterEnvelope,
    forecast: &[SeriesPoint],
) -> Option<(NaiveDateTime, f64, BreachSide, f64)> {
    let high = envelope.crit_high();
    let low = envelope.crit_low();
    forecast.iter().find_map(|(ts, v)| {
        if *v > high {
            Some((*ts, *v, BreachSide::High, high))
        } else if *v < low {
            Some((*ts, *v, BreachSide::Low, low))
        } else {
            None
        }
    })
}

// ==========================================
// RiskTriage - 风险研判服务
// ==========================================
pub struct RiskTriage {
    sensor_repo: Arc<SensorReadingRepository>,
    registry: Arc<ProfileRegistry>,
    provider: Arc<dyn ForecastProvider>,
}

impl RiskTriage {
    pub fn new(
        sensor_repo: Arc<SensorReadingRepository>,
        registry: Arc<ProfileRegistry>,
        provider: Arc<dyn ForecastProvider>,
    ) -> Self {
        Self {
            sensor_repo,
            registry,
            provider,
        }
    }

    /// 对资产清单做风险研判
    ///
    /// # 返回
    /// 预计越限的 (资产, 参数)，按 hours_to_failure 升序
    #[instrument(skip(self, assets), fields(assets = assets.len()))]
    pub async fn triage(
        &self,
        assets: &[Asset],
        settings: TriageSettings,
    ) -> EngineResult<Vec<FailureRisk>> {
        // 先同步取历史，再并发预测
        let mut candidates = Vec::new();
        for asset in assets {
            let Some(profile) = self.registry.get(&asset.asset_type) else {
                debug!(asset_id = %asset.asset_id, asset_type = %asset.asset_type, "资产类型无画像，跳过");
                continue;
            };
            for envelope in &profile.params {
                let history =
                    self.sensor_repo
                        .history(&asset.asset_id, &envelope.name, settings.history_limit)?;
                if history.len() <= settings.min_history {
                    continue;
                }
                candidates.push((asset, envelope, history));
            }
        }

        let forecasts = join_all(candidates.iter().map(|(_, _, history)| {
            self.provider.forecast(history, settings.horizon_hours)
        }))
        .await;

        let mut risks = Vec::new();
        for ((asset, envelope, history), forecast) in candidates.iter().zip(forecasts) {
            let forecast = match forecast {
                Ok(f) => f,
                Err(e) => {
                    debug!(asset_id = %asset.asset_id, param = %envelope.name, error = %e, "预测不可用，跳过");
                    continue;
                }
            };
            let Some((ts, value, side, threshold)) = first_breach(envelope, &forecast) else {
                continue;
            };
            let last_ts = history[history.len() - 1].0;
            risks.push(FailureRisk {
                asset_id: asset.asset_id.clone(),
                asset_type: asset.asset_type.clone(),
                parameter: envelope.name.clone(),
                side,
                threshold,
                predicted_value: value,
                predicted_breach: ts,
                hours_to_failure: (ts - last_ts).num_hours(),
            });
        }

        risks.sort_by(|a, b| {
            a.hours_to_failure
                .cmp(&b.hours_to_failure)
                .then_with(|| a.asset_id.cmp(&b.asset_id))
                .then_with(|| a.parameter.cmp(&b.parameter))
        });
        info!(risks = risks.len(), "风险研判完成");
        Ok(risks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }

    #[tokio::test]
    async fn test_linear_trend_extrapolates_hourly() {
        let history: Vec<SeriesPoint> = (0..10).map(|h| (at(h), 50.0 + 2.0 * h as f64)).collect();
        let forecast = LinearTrendForecaster::new().forecast(&history, 3).await.unwrap();
        assert_eq!(forecast.len(), 3);
        assert_eq!(forecast[0].0, at(10));
        assert!((forecast[0].1 - 70.0).abs() < 1e-9);
        assert!((forecast[2].1 - 74.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_linear_trend_needs_spread() {
        let f = LinearTrendForecaster::new();
        assert_eq!(
            f.forecast(&[(at(0), 1.0)], 5).await,
            Err(ForecastError::InsufficientHistory(1))
        );
        assert!(matches!(
            f.forecast(&[(at(0), 1.0), (at(0), 2.0)], 5).await,
            Err(ForecastError::Unavailable(_))
        ));
    }

    #[test]
    fn test_first_breach_is_strict() {
        let env = ParameterEnvelope::new("temperatura", 40.0, 100.0, 1.1, 1.2);
        let forecast = vec![(at(1), 119.0), (at(2), 120.0), (at(3), 121.0), (at(4), 130.0)];
        let (ts, value, side, threshold) = first_breach(&env, &forecast).unwrap();
        assert_eq!(ts, at(3));
        assert_eq!(value, 121.0);
        assert_eq!(side, BreachSide::High);
        assert!((threshold - 120.0).abs() < 1e-9);

        let falling = vec![(at(1), 34.0), (at(2), 33.0)];
        assert_eq!(first_breach(&env, &falling).unwrap().2, BreachSide::Low);
        assert!(first_breach(&env, &[(at(1), 80.0)]).is_none());
    }
}
