// ==========================================
// 工单生命周期集成测试
// ==========================================
// 职责: 预防性工单周期重开、附件登记与上传、技师工作清单
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod order_lifecycle_test {
    use std::sync::Arc;

    use plant_maintenance::api::ApiError;
    use plant_maintenance::app::AppState;
    use plant_maintenance::config::config_keys;
    use plant_maintenance::domain::access::{pages, RequestContext, RolePermission};
    use plant_maintenance::domain::service_order::{NewServiceOrder, OrderTransition};
    use plant_maintenance::domain::types::{OrderClass, OrderStatus, Priority, Recurrence};
    use plant_maintenance::engine::{EngineError, ServiceOrderLifecycle};
    use plant_maintenance::repository::{PartRepository, ServiceOrderRepository};

    use crate::test_helpers::{admin_ctx, create_test_db, open_session, ts};

    fn lifecycle(db_path: &str) -> ServiceOrderLifecycle {
        let conn = open_session(db_path);
        ServiceOrderLifecycle::new(
            Arc::new(ServiceOrderRepository::from_connection(conn.clone())),
            Arc::new(PartRepository::from_connection(conn)),
        )
    }

    fn lubrication(assigned_to: &str) -> NewServiceOrder {
        NewServiceOrder {
            asset_id: "ESTEIRA-03".to_string(),
            asset_type: "Esteira Transportadora".to_string(),
            reason: "Lubrificação mensal".to_string(),
            priority: Priority::Medium,
            class: OrderClass::Preventive,
            recurrence: Recurrence::Monthly,
            assigned_to: Some(assigned_to.to_string()),
            estimated_cost: 80.0,
        }
    }

    fn complete(root_cause: &str) -> OrderTransition {
        OrderTransition {
            new_status: OrderStatus::Completed,
            notes: "ok".to_string(),
            actual_cost: 75.0,
            root_cause: Some(root_cause.to_string()),
        }
    }

    #[test]
    fn test_monthly_preventive_reopens_once() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let lc = lifecycle(&db_path);

        let os_id = lc.create_manual(lubrication("Carlos"), ts(2024, 1, 10, 8)).unwrap();
        lc.transition(&os_id, complete("Desgaste Natural"), ts(2024, 1, 15, 8))
            .unwrap();

        // 未到期
        assert!(lc.sweep_recurrence(ts(2024, 2, 14, 8)).unwrap().is_empty());

        // 到期: 2024-01-15 + 1 个月 = 2024-02-15
        let reopened = lc.sweep_recurrence(ts(2024, 2, 16, 8)).unwrap();
        assert_eq!(reopened.len(), 1);
        let o = &reopened[0];
        assert_ne!(o.os_id, os_id);
        assert_eq!(o.status, OrderStatus::Open);
        assert_eq!(o.class, OrderClass::Preventive);
        assert_eq!(o.recurrence, Recurrence::Monthly);
        assert_eq!(o.assigned_to, "Carlos");
        assert_eq!(o.estimated_cost, 80.0);
        assert_eq!(o.creation_date, ts(2024, 2, 16, 8));

        // 已有 Aberta 工单，不再重开
        assert!(lc.sweep_recurrence(ts(2024, 2, 17, 8)).unwrap().is_empty());
        assert_eq!(lc.all().unwrap().len(), 2);
    }

    #[test]
    fn test_in_progress_order_blocks_reopen() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let lc = lifecycle(&db_path);

        let first = lc.create_manual(lubrication("Carlos"), ts(2024, 1, 10, 8)).unwrap();
        lc.transition(&first, complete("Desgaste Natural"), ts(2024, 1, 15, 8))
            .unwrap();
        let second = lc.sweep_recurrence(ts(2024, 2, 16, 8)).unwrap();
        lc.transition(
            &second[0].os_id,
            OrderTransition {
                new_status: OrderStatus::InProgress,
                notes: String::new(),
                actual_cost: 0.0,
                root_cause: None,
            },
            ts(2024, 2, 16, 9),
        )
        .unwrap();

        // 活动工单（Em Andamento）由存储层兜底跳过
        assert!(lc.sweep_recurrence(ts(2024, 3, 1, 8)).unwrap().is_empty());
        assert_eq!(lc.active().unwrap().len(), 1);
    }

    #[test]
    fn test_attachments_are_an_ordered_set() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let lc = lifecycle(&db_path);
        let os_id = lc.create_manual(lubrication("Carlos"), ts(2024, 1, 10, 8)).unwrap();

        let laudo = format!("{}_laudo.pdf", os_id);
        let foto = format!("{}_foto.jpg", os_id);
        assert_eq!(lc.attach_file(&os_id, &laudo).unwrap(), laudo);
        lc.attach_file(&os_id, &foto).unwrap();
        lc.attach_file(&os_id, &laudo).unwrap();

        // 已是存储名的文件名按原样登记，不再加前缀
        let order = lc.get(&os_id).unwrap();
        assert_eq!(order.files_attached, vec![laudo.clone(), foto]);

        assert!(matches!(
            lc.attach_file(&os_id, "   "),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            lc.attach_file("OS-inexistente", "laudo.pdf"),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_writes_file_and_registers_name() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let upload_dir = tempfile::tempdir().unwrap();
        let state = AppState::new(db_path).await.unwrap();
        state
            .config_manager
            .set_global_config_value(
                config_keys::UPLOAD_DIR,
                upload_dir.path().to_str().unwrap(),
            )
            .unwrap();

        let admin = admin_ctx();
        let os_id = state
            .maintenance_api
            .create_order(&admin, lubrication("Carlos"), ts(2024, 1, 10, 8))
            .unwrap();

        let stored = state
            .maintenance_api
            .attach_file(&admin, &os_id, "relatorio.txt", b"vibracao normalizada")
            .await
            .unwrap();

        assert_eq!(stored, format!("{}_relatorio.txt", os_id));
        let written = std::fs::read(upload_dir.path().join(&stored)).unwrap();
        assert_eq!(written, b"vibracao normalizada");
        let order = state.maintenance_api.get_order(&admin, &os_id).unwrap();
        assert_eq!(order.files_attached, vec![stored]);

        let missing = state
            .maintenance_api
            .attach_file(&admin, "OS-inexistente", "x.txt", b"x")
            .await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_technician_sees_only_assigned_active_orders() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = AppState::new(db_path).await.unwrap();
        let admin = admin_ctx();

        state
            .role_api
            .save_role(
                &admin,
                RolePermission {
                    role_name: "tecnico".to_string(),
                    pages: vec![pages::TECH_APP.to_string()],
                },
            )
            .unwrap();

        let mine = state
            .maintenance_api
            .create_order(&admin, lubrication("Carlos"), ts(2024, 1, 10, 8))
            .unwrap();
        let mut other = lubrication("Ana");
        other.asset_id = "ESTEIRA-04".to_string();
        state
            .maintenance_api
            .create_order(&admin, other, ts(2024, 1, 10, 9))
            .unwrap();

        let carlos = RequestContext::new("u-carlos", "Carlos", "tecnico");
        let list = state.maintenance_api.work_list(&carlos).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].os_id, mine);

        assert_eq!(state.maintenance_api.work_list(&admin).unwrap().len(), 2);

        // 技师无工单规划页权限
        assert!(matches!(
            state.maintenance_api.list_orders(&carlos),
            Err(ApiError::AccessDenied { .. })
        ));
    }
}
