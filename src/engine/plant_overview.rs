// ==========================================
// 工厂设备维护管理 - 工厂总览与告警历史
// ==========================================
// 总览口径:
// - 窗口: 以全部读数的最大时间戳为终点，向前 window_hours 小时（含起点）
// - 资产总数: 全部读数中的不同 asset_id
// - 告警资产数: 窗口内出现 Atenção/Crítico 的不同资产
// - 待处理工单: status = Aberta
// - 资产状态: 窗口内取最差状态 Crítico > Atenção > Normal (Resolvido) > Normal
// ==========================================

use crate::domain::inventory::Part;
use crate::domain::sensor::ClassifiedReading;
use crate::domain::service_order::ServiceOrder;
use crate::domain::types::{AlertStatus, OrderStatus};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetStatusSummary {
    pub asset_id: String,
    pub asset_type: String,
    pub location: String,
    pub status: AlertStatus,
}

/// 工厂总览
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantOverview {
    pub window_start: Option<NaiveDateTime>,
    pub window_end: Option<NaiveDateTime>,
    pub total_assets: usize,
    pub assets_with_alerts: usize,
    pub open_orders: usize,
    pub asset_status: Vec<AssetStatusSummary>,
    pub low_stock_parts: Vec<Part>,
}

/// 构建工厂总览
///
/// # 参数
/// - `classified`: 已抑制的分类读数
/// - `orders`: 全部工单
/// - `low_stock_parts`: 低库存备件
/// - `window_hours`: 统计窗口（小时）
#[instrument(skip_all, fields(readings = classified.len(), window_hours))]
pub fn build_overview(
    classified: &[ClassifiedReading],
    orders: &[ServiceOrder],
    low_stock_parts: Vec<Part>,
    window_hours: i64,
) -> PlantOverview {
    let open_orders = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Open)
        .count();

    let window_end = classified.iter().map(|c| c.reading.timestamp).max();
    let window_start = window_end.map(|end| end - Duration::hours(window_hours));

    let total_assets = classified
        .iter()
        .map(|c| c.reading.asset_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let mut per_asset: BTreeMap<&str, AssetStatusSummary> = BTreeMap::new();
    if let Some(start) = window_start {
        for c in classified.iter().filter(|c| c.reading.timestamp >= start) {
            per_asset
                .entry(c.reading.asset_id.as_str())
                .and_modify(|s| s.status = s.status.max(c.status))
                .or_insert_with(|| AssetStatusSummary {
                    asset_id: c.reading.asset_id.clone(),
                    asset_type: c.reading.asset_type.clone(),
                    location: c.reading.location.clone(),
                    status: c.status,
                });
        }
    }

    let asset_status: Vec<AssetStatusSummary> = per_asset.into_values().collect();
    let assets_with_alerts = asset_status
        .iter()
        .filter(|s| s.status.is_actionable())
        .count();

    PlantOverview {
        window_start,
        window_end,
        total_assets,
        assets_with_alerts,
        open_orders,
        asset_status,
        low_stock_parts,
    }
}

/// 告警事件（资产历史）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub timestamp: NaiveDateTime,
    pub status: AlertStatus,
    pub reason: String,
}

/// 资产告警历史: 非 Normal / Normal (Resolvido) 的读数，最新在前
pub fn alert_history(classified: &[ClassifiedReading], asset_id: &str) -> Vec<AlertEvent> {
    let mut events: Vec<AlertEvent> = classified
        .iter()
        .filter(|c| c.reading.asset_id == asset_id && c.status.is_actionable())
        .map(|c| AlertEvent {
            timestamp: c.reading.timestamp,
            status: c.status,
            reason: c.status_reason.clone(),
        })
        .collect();
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sensor::SensorReading;
    use chrono::NaiveDate;
    use std::collections::BTreeMap as Map;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn c(asset: &str, ts: NaiveDateTime, status: AlertStatus, reason: &str) -> ClassifiedReading {
        ClassifiedReading {
            reading: SensorReading {
                timestamp: ts,
                asset_id: asset.to_string(),
                asset_type: "Motor".to_string(),
                location: "Setor A".to_string(),
                latitude: None,
                longitude: None,
                values: Map::new(),
            },
            status,
            status_reason: reason.to_string(),
        }
    }

    #[test]
    fn test_overview_window_and_worst_status() {
        let readings = vec![
            // 窗口外的严重告警不计入
            c("M1", at(1, 0), AlertStatus::Critical, "Temperatura Alta"),
            c("M1", at(2, 12), AlertStatus::Normal, ""),
            c("M1", at(2, 13), AlertStatus::NormalResolved, "Temperatura Alta"),
            c("M2", at(2, 10), AlertStatus::Attention, "Vibracao Alta"),
            c("M2", at(2, 11), AlertStatus::Critical, "Vibracao Alta"),
            c("M2", at(2, 12), AlertStatus::Normal, ""),
            c("M3", at(1, 23), AlertStatus::Normal, ""),
            c("M4", at(3, 0), AlertStatus::Normal, ""),
        ];
        let overview = build_overview(&readings, &[], Vec::new(), 24);

        assert_eq!(overview.window_end, Some(at(3, 0)));
        assert_eq!(overview.window_start, Some(at(2, 0)));
        assert_eq!(overview.total_assets, 4);
        assert_eq!(overview.assets_with_alerts, 1);

        let status: Vec<_> = overview
            .asset_status
            .iter()
            .map(|s| (s.asset_id.as_str(), s.status))
            .collect();
        assert_eq!(
            status,
            vec![
                ("M1", AlertStatus::NormalResolved),
                ("M2", AlertStatus::Critical),
                ("M4", AlertStatus::Normal),
            ]
        );
    }

    #[test]
    fn test_overview_without_readings() {
        let overview = build_overview(&[], &[], Vec::new(), 24);
        assert_eq!(overview.total_assets, 0);
        assert!(overview.window_end.is_none());
        assert!(overview.asset_status.is_empty());
    }

    #[test]
    fn test_alert_history_newest_first() {
        let readings = vec![
            c("M1", at(1, 0), AlertStatus::Critical, "Temperatura Alta"),
            c("M1", at(1, 1), AlertStatus::Normal, ""),
            c("M1", at(1, 2), AlertStatus::Attention, "Vibracao Alta"),
            c("M1", at(1, 3), AlertStatus::NormalResolved, "Temperatura Alta"),
            c("M2", at(1, 4), AlertStatus::Critical, "Pressao Alta"),
        ];
        let history = alert_history(&readings, "M1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].reason, "Vibracao Alta");
        assert_eq!(history[1].status, AlertStatus::Critical);
    }
}
