// ==========================================
// 分析视图集成测试
// ==========================================
// 职责: 资产登记、工厂总览、维护 KPI、故障风险研判
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod analytics_test {
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use plant_maintenance::api::ApiError;
    use plant_maintenance::app::AppState;
    use plant_maintenance::domain::access::RequestContext;
    use plant_maintenance::domain::asset::Asset;
    use plant_maintenance::domain::service_order::{NewServiceOrder, OrderTransition};
    use plant_maintenance::domain::types::{
        AlertStatus, OrderClass, OrderStatus, Priority, Recurrence,
    };
    use plant_maintenance::engine::{ForecastError, ForecastProvider, TimeBucket};
    use plant_maintenance::engine::risk_triage::{BreachSide, SeriesPoint};
    use plant_maintenance::repository::SensorReadingRepository;
    use std::sync::Arc;

    use crate::test_helpers::{admin_ctx, create_test_db, reading, ts, viewer_ctx};

    const PUMP: &str = "Bomba Centrífuga";

    fn base() -> NaiveDateTime {
        ts(2024, 5, 1, 0)
    }

    fn asset(asset_id: &str) -> Asset {
        Asset {
            asset_id: asset_id.to_string(),
            asset_type: PUMP.to_string(),
            location: "Setor B-Linha 3".to_string(),
            description: String::new(),
            install_date: NaiveDate::from_ymd_opt(2020, 1, 15),
        }
    }

    /// B1: 温度每小时 +0.45（30 点）；B2: 平稳（30 点）；B3: 仅 10 点
    fn seed_series(db_path: &str) {
        let sensors = SensorReadingRepository::new(db_path).unwrap();
        let mut rows = Vec::new();
        for h in 0..30 {
            let at = base() + Duration::hours(h);
            rows.push(reading("B1", PUMP, at, &[("temperatura", 80.0 + 0.45 * h as f64)]));
            rows.push(reading("B2", PUMP, at, &[("temperatura", 70.0)]));
            if h < 10 {
                rows.push(reading("B3", PUMP, at, &[("temperatura", 60.0 + h as f64)]));
            }
        }
        sensors.append_batch(&rows).unwrap();
    }

    async fn state_with_assets(db_path: &str) -> AppState {
        let state = AppState::new(db_path.to_string()).await.unwrap();
        for id in ["B1", "B2", "B3"] {
            state.asset_api.register(&admin_ctx(), asset(id)).unwrap();
        }
        state
    }

    fn stranger_ctx() -> RequestContext {
        RequestContext::new("u-x", "Convidado", "convidado")
    }

    struct BrokenForecaster;

    #[async_trait]
    impl ForecastProvider for BrokenForecaster {
        async fn forecast(
            &self,
            _history: &[SeriesPoint],
            _horizon_hours: i64,
        ) -> Result<Vec<SeriesPoint>, ForecastError> {
            Err(ForecastError::Unavailable("serviço fora do ar".to_string()))
        }
    }

    // ==========================================
    // 资产登记
    // ==========================================

    #[tokio::test]
    async fn test_register_asset_validation() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = AppState::new(db_path).await.unwrap();
        let admin = admin_ctx();

        let saved = state
            .asset_api
            .register(
                &admin,
                Asset {
                    asset_id: "  B1 ".to_string(),
                    ..asset("B1")
                },
            )
            .unwrap();
        assert_eq!(saved.asset_id, "B1");

        assert!(matches!(
            state.asset_api.register(&admin, asset("B1")),
            Err(ApiError::DuplicateKey(_))
        ));
        assert!(matches!(
            state.asset_api.register(
                &admin,
                Asset {
                    asset_type: "Foguete".to_string(),
                    ..asset("X1")
                }
            ),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            state.asset_api.register(
                &admin,
                Asset {
                    location: "   ".to_string(),
                    ..asset("X2")
                }
            ),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            state.asset_api.register(&viewer_ctx(), asset("X3")),
            Err(ApiError::AccessDenied { .. })
        ));

        assert_eq!(state.asset_api.list_assets(&admin).unwrap().len(), 1);
        assert!(state.asset_api.asset_types().contains(&PUMP.to_string()));
    }

    // ==========================================
    // 故障风险研判
    // ==========================================

    #[tokio::test]
    async fn test_triage_finds_rising_temperature() {
        let (_tmp, db_path) = create_test_db().unwrap();
        seed_series(&db_path);
        let state = state_with_assets(&db_path).await;

        let risks = state
            .analytics_api
            .failure_triage(&admin_ctx())
            .await
            .unwrap();

        // 严重上限 80 × 1.25 = 100: 80 + 0.45h > 100 → h = 45，末点 h = 29
        assert_eq!(risks.len(), 1);
        let risk = &risks[0];
        assert_eq!(risk.asset_id, "B1");
        assert_eq!(risk.parameter, "temperatura");
        assert_eq!(risk.side, BreachSide::High);
        assert!((risk.threshold - 100.0).abs() < 1e-9);
        assert!(risk.predicted_value > 100.0);
        assert_eq!(risk.predicted_breach, base() + Duration::hours(45));
        assert_eq!(risk.hours_to_failure, 16);
    }

    #[tokio::test]
    async fn test_triage_skips_failed_forecasts() {
        let (_tmp, db_path) = create_test_db().unwrap();
        seed_series(&db_path);
        let state = AppState::with_forecaster(db_path.clone(), Arc::new(BrokenForecaster))
            .await
            .unwrap();
        state.asset_api.register(&admin_ctx(), asset("B1")).unwrap();

        let risks = state
            .analytics_api
            .failure_triage(&admin_ctx())
            .await
            .unwrap();
        assert!(risks.is_empty());

        // viewer 可查看研判，未授权角色不可
        assert!(state.analytics_api.failure_triage(&viewer_ctx()).await.is_ok());
        assert!(matches!(
            state.analytics_api.failure_triage(&stranger_ctx()).await,
            Err(ApiError::AccessDenied { .. })
        ));
    }

    // ==========================================
    // 工厂总览
    // ==========================================

    #[tokio::test]
    async fn test_plant_overview_counts() {
        let (_tmp, db_path) = create_test_db().unwrap();
        seed_series(&db_path);
        let state = state_with_assets(&db_path).await;
        let admin = admin_ctx();

        let before = state.analytics_api.plant_overview(&admin).await.unwrap();
        assert_eq!(before.open_orders, 0);

        state
            .maintenance_api
            .create_order(
                &admin,
                NewServiceOrder {
                    asset_id: "B2".to_string(),
                    asset_type: PUMP.to_string(),
                    reason: "Inspeção de selo".to_string(),
                    priority: Priority::Low,
                    class: OrderClass::Preventive,
                    recurrence: Recurrence::None,
                    assigned_to: None,
                    estimated_cost: 0.0,
                },
                ts(2024, 5, 2, 6),
            )
            .unwrap();

        let overview = state.analytics_api.plant_overview(&admin).await.unwrap();
        assert_eq!(overview.window_end, Some(base() + Duration::hours(29)));
        assert_eq!(overview.window_start, Some(base() + Duration::hours(5)));
        assert_eq!(overview.total_assets, 3);
        // B1 后段温度超过 88 → Atenção
        assert_eq!(overview.assets_with_alerts, 1);
        assert_eq!(overview.open_orders, 1);
        let statuses: Vec<(&str, AlertStatus)> = overview
            .asset_status
            .iter()
            .map(|s| (s.asset_id.as_str(), s.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("B1", AlertStatus::Attention),
                ("B2", AlertStatus::Normal),
                ("B3", AlertStatus::Normal),
            ]
        );

        let history = state.analytics_api.asset_history(&admin, "B1").unwrap();
        assert!(history.orders.is_empty());
        assert!(!history.alerts.is_empty());
        assert!(history
            .alerts
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp));
    }

    // ==========================================
    // 维护 KPI
    // ==========================================

    #[tokio::test]
    async fn test_maintenance_kpis() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = AppState::new(db_path).await.unwrap();
        let admin = admin_ctx();
        let kpis = |start, end| {
            state
                .analytics_api
                .maintenance_kpis(&admin, start, end, TimeBucket::Monthly)
        };

        assert!(matches!(kpis(None, None), Err(ApiError::DataUnavailable(_))));

        let os_id = state
            .maintenance_api
            .create_order(
                &admin,
                NewServiceOrder {
                    asset_id: "B1".to_string(),
                    asset_type: PUMP.to_string(),
                    reason: "Vazamento".to_string(),
                    priority: Priority::High,
                    class: OrderClass::Corrective,
                    recurrence: Recurrence::None,
                    assigned_to: None,
                    estimated_cost: 0.0,
                },
                ts(2024, 3, 1, 8),
            )
            .unwrap();
        state
            .maintenance_api
            .update_order(
                &admin,
                &os_id,
                OrderTransition {
                    new_status: OrderStatus::Completed,
                    notes: "Selo trocado".to_string(),
                    actual_cost: 200.0,
                    root_cause: Some("Desgaste Natural".to_string()),
                },
                ts(2024, 3, 1, 14),
            )
            .unwrap();

        let report = kpis(None, None).unwrap();
        assert_eq!(report.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(report.total_failures, 1);
        assert_eq!(report.mttr_hours, Some(6.0));
        assert!((report.total_cost - 200.0).abs() < 1e-9);
        assert_eq!(report.pareto.len(), 1);
        assert_eq!(report.pareto[0].root_cause, "Desgaste Natural");
        assert!((report.pareto[0].cumulative_pct - 100.0).abs() < 1e-9);
        assert_eq!(report.trend.len(), 1);
        assert_eq!(
            report.trend[0].period_end,
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
        );

        let inverted = kpis(
            NaiveDate::from_ymd_opt(2024, 4, 1),
            NaiveDate::from_ymd_opt(2024, 3, 1),
        );
        assert!(matches!(inverted, Err(ApiError::InvalidInput(_))));

        assert!(matches!(
            state
                .analytics_api
                .maintenance_kpis(&stranger_ctx(), None, None, TimeBucket::Daily),
            Err(ApiError::AccessDenied { .. })
        ));
    }
}
