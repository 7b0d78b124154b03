// ==========================================
// 工厂设备维护管理 - 维护 KPI 引擎
// ==========================================
// 口径:
// - 统计范围: 工单创建日期落在 [start, end]（含两端）
// - 故障: 已完工且有完工时间的 Preditiva/Corretiva 工单
// - MTTR: 故障 (完工 - 创建) 小时数均值
// - MTBF: 同一资产按创建时间排序，本次创建 - 上次完工（仅取正值），按资产类型求均值
// - Pareto: 根因频次降序（排除 "Não Definida"），附累计百分比
// - 趋势: 按完工时间分桶，桶以周期末日期标记，首尾之间的空桶补零
// ==========================================

use crate::domain::service_order::ServiceOrder;
use crate::domain::types::{OrderClass, OrderStatus, ROOT_CAUSE_UNDEFINED};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::instrument;

/// 成本排行取前 N
pub const TOP_COST_ASSETS: usize = 5;

// ==========================================
// TimeBucket - 趋势分桶粒度
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    Daily,
    Weekly, // 周日结束
    Monthly,
    Quarterly,
    Yearly,
}

impl TimeBucket {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "d" => Some(TimeBucket::Daily),
            "weekly" | "w" => Some(TimeBucket::Weekly),
            "monthly" | "m" => Some(TimeBucket::Monthly),
            "quarterly" | "q" => Some(TimeBucket::Quarterly),
            "yearly" | "y" => Some(TimeBucket::Yearly),
            _ => None,
        }
    }

    /// 日期所在周期的末日
    pub fn period_end(&self, date: NaiveDate) -> NaiveDate {
        match self {
            TimeBucket::Daily => date,
            TimeBucket::Weekly => {
                let to_sunday = 6 - date.weekday().num_days_from_monday() as i64;
                date + Duration::days(to_sunday)
            }
            TimeBucket::Monthly => last_day_of_month(date.year(), date.month()),
            TimeBucket::Quarterly => {
                let quarter_end_month = ((date.month() - 1) / 3 + 1) * 3;
                last_day_of_month(date.year(), quarter_end_month)
            }
            TimeBucket::Yearly => last_day_of_month(date.year(), 12),
        }
    }
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

// ==========================================
// 报表结构
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoEntry {
    pub root_cause: String,
    pub count: usize,
    pub cumulative_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period_end: NaiveDate,
    pub cost: f64,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassShare {
    pub class: OrderClass,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCost {
    pub asset_id: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMetric {
    pub asset_type: String,
    pub hours: f64,
}

/// KPI 报表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_failures: usize,
    pub mttr_hours: Option<f64>,
    pub total_cost: f64,
    pub pareto: Vec<ParetoEntry>,
    pub trend: Vec<TrendPoint>,
    pub class_distribution: Vec<ClassShare>,
    pub top_cost_assets: Vec<AssetCost>,
    pub mttr_by_type: Vec<TypeMetric>,
    pub mtbf_by_type: Vec<TypeMetric>,
}

// ==========================================
// KpiEngine - KPI 计算引擎
// ==========================================
pub struct KpiEngine {}

impl KpiEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 默认统计范围: 全部工单的最早/最晚创建日期
    pub fn default_range(&self, orders: &[ServiceOrder]) -> Option<(NaiveDate, NaiveDate)> {
        let min = orders.iter().map(|o| o.creation_date.date()).min()?;
        let max = orders.iter().map(|o| o.creation_date.date()).max()?;
        Some((min, max))
    }

    /// 计算 KPI 报表
    #[instrument(skip(self, orders), fields(orders = orders.len()))]
    pub fn compute(
        &self,
        orders: &[ServiceOrder],
        start: NaiveDate,
        end: NaiveDate,
        bucket: TimeBucket,
    ) -> KpiReport {
        let in_range: Vec<&ServiceOrder> = orders
            .iter()
            .filter(|o| {
                let d = o.creation_date.date();
                d >= start && d <= end
            })
            .collect();

        let failures: Vec<&ServiceOrder> = in_range
            .iter()
            .copied()
            .filter(|o| {
                o.status == OrderStatus::Completed
                    && o.class.is_failure()
                    && o.completion_date.is_some()
            })
            .collect();

        let repair_hours: Vec<f64> = failures.iter().filter_map(|o| o.repair_hours()).collect();

        KpiReport {
            start,
            end,
            total_failures: failures.len(),
            mttr_hours: mean(&repair_hours),
            total_cost: failures.iter().map(|o| o.actual_cost).sum(),
            pareto: pareto(&failures),
            trend: trend(&failures, bucket),
            class_distribution: class_distribution(&in_range),
            top_cost_assets: top_cost_assets(&failures, TOP_COST_ASSETS),
            mttr_by_type: mttr_by_type(&failures),
            mtbf_by_type: mtbf_by_type(&failures),
        }
    }
}

impl Default for KpiEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 分项计算
// ==========================================

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn pareto(failures: &[&ServiceOrder]) -> Vec<ParetoEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for rc in failures
        .iter()
        .filter_map(|o| o.root_cause.as_deref())
        .filter(|rc| *rc != ROOT_CAUSE_UNDEFINED)
    {
        *counts.entry(rc).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let total: usize = ranked.iter().map(|(_, n)| n).sum();
    let mut running = 0usize;
    ranked
        .into_iter()
        .map(|(rc, n)| {
            running += n;
            ParetoEntry {
                root_cause: rc.to_string(),
                count: n,
                cumulative_pct: running as f64 * 100.0 / total as f64,
            }
        })
        .collect()
}

fn trend(failures: &[&ServiceOrder], bucket: TimeBucket) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for o in failures {
        if let Some(done) = o.completion_date {
            let entry = buckets
                .entry(bucket.period_end(done.date()))
                .or_insert((0.0, 0));
            entry.0 += o.actual_cost;
            entry.1 += 1;
        }
    }

    let (first, last) = match (buckets.keys().next(), buckets.keys().next_back()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return Vec::new(),
    };

    let mut points = Vec::new();
    let mut cursor = first;
    while cursor <= last {
        let (cost, failures) = buckets.get(&cursor).copied().unwrap_or((0.0, 0));
        points.push(TrendPoint {
            period_end: cursor,
            cost,
            failures,
        });
        match cursor.succ_opt() {
            Some(next) => cursor = bucket.period_end(next),
            None => break,
        }
    }
    points
}

fn class_distribution(orders: &[&ServiceOrder]) -> Vec<ClassShare> {
    let mut counts: Vec<ClassShare> = Vec::new();
    for o in orders {
        match counts.iter_mut().find(|c| c.class == o.class) {
            Some(c) => c.count += 1,
            None => counts.push(ClassShare {
                class: o.class,
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

fn top_cost_assets(failures: &[&ServiceOrder], n: usize) -> Vec<AssetCost> {
    let mut costs: BTreeMap<&str, f64> = BTreeMap::new();
    for o in failures {
        *costs.entry(o.asset_id.as_str()).or_insert(0.0) += o.actual_cost;
    }
    let mut ranked: Vec<AssetCost> = costs
        .into_iter()
        .map(|(asset_id, cost)| AssetCost {
            asset_id: asset_id.to_string(),
            cost,
        })
        .collect();
    ranked.sort_by(|a, b| b.cost.total_cmp(&a.cost).then_with(|| a.asset_id.cmp(&b.asset_id)));
    ranked.truncate(n);
    ranked
}

fn mean_by_type(samples: impl Iterator<Item = (String, f64)>) -> Vec<TypeMetric> {
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (asset_type, hours) in samples {
        grouped.entry(asset_type).or_default().push(hours);
    }
    grouped
        .into_iter()
        .filter_map(|(asset_type, values)| {
            mean(&values).map(|hours| TypeMetric { asset_type, hours })
        })
        .collect()
}

fn mttr_by_type(failures: &[&ServiceOrder]) -> Vec<TypeMetric> {
    mean_by_type(
        failures
            .iter()
            .filter_map(|o| o.repair_hours().map(|h| (o.asset_type.clone(), h))),
    )
}

fn mtbf_by_type(failures: &[&ServiceOrder]) -> Vec<TypeMetric> {
    let mut sorted: Vec<&ServiceOrder> = failures.to_vec();
    sorted.sort_by(|a, b| {
        (&a.asset_id, a.creation_date).cmp(&(&b.asset_id, b.creation_date))
    });

    let mut samples = Vec::new();
    for pair in sorted.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if prev.asset_id != cur.asset_id {
            continue;
        }
        if let Some(prev_done) = prev.completion_date {
            let uptime = (cur.creation_date - prev_done).num_seconds() as f64 / 3600.0;
            if uptime > 0.0 {
                samples.push((cur.asset_type.clone(), uptime));
            }
        }
    }
    mean_by_type(samples.into_iter())
}
