// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证多会话并发下的去重、库存与状态 CAS
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod concurrent_control_test {
    use plant_maintenance::domain::sensor::ClassifiedReading;
    use plant_maintenance::domain::types::{AlertStatus, OrderStatus};
    use plant_maintenance::engine::{EngineError, InventoryLedger, ServiceOrderLifecycle};
    use plant_maintenance::repository::{
        PartRepository, RepositoryError, ServiceOrderRepository,
    };
    use std::sync::{Arc, Barrier};
    use std::thread;

    use crate::test_helpers::{create_test_db, open_session, part, reading, ts};

    const WORKERS: usize = 8;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 每个线程一个独立会话（独立连接）
    fn lifecycle_session(db_path: &str) -> ServiceOrderLifecycle {
        let conn = open_session(db_path);
        ServiceOrderLifecycle::new(
            Arc::new(ServiceOrderRepository::from_connection(conn.clone())),
            Arc::new(PartRepository::from_connection(conn)),
        )
    }

    fn critical_reading() -> ClassifiedReading {
        ClassifiedReading {
            reading: reading(
                "MOTOR-001",
                "Motor Elétrico",
                ts(2024, 6, 1, 8),
                &[("temperatura", 140.0)],
            ),
            status: AlertStatus::Critical,
            status_reason: "Temperatura Alta".to_string(),
        }
    }

    // ==========================================
    // 测试1: 并发评估只生成一张工单
    // ==========================================

    #[test]
    fn test_concurrent_generation_creates_single_order() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let barrier = Arc::new(Barrier::new(WORKERS));

        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let db_path = db_path.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let lifecycle = lifecycle_session(&db_path);
                    let batch = vec![critical_reading()];
                    barrier.wait();
                    lifecycle
                        .generate_from_critical(&batch, ts(2024, 6, 1, 9))
                        .unwrap()
                        .len()
                })
            })
            .collect();

        let created: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(created, 1);

        let orders = lifecycle_session(&db_path).all().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].reason, "Temperatura Alta");
    }

    // ==========================================
    // 测试2: 并发出库库存永不为负
    // ==========================================

    #[test]
    fn test_concurrent_consume_never_oversells() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        InventoryLedger::new(Arc::new(PartRepository::new(&db_path).unwrap()))
            .create_part(&part("ROL-6205", 10, 2, 45.0))
            .unwrap();

        let barrier = Arc::new(Barrier::new(WORKERS));
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let db_path = db_path.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let ledger = InventoryLedger::new(Arc::new(
                        PartRepository::from_connection(open_session(&db_path)),
                    ));
                    barrier.wait();
                    ledger.consume("ROL-6205", 3)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 3);
        assert!(results.iter().filter(|r| r.is_err()).all(|r| matches!(
            r,
            Err(EngineError::InsufficientStock { requested: 3, .. })
        )));

        let stock = PartRepository::new(&db_path)
            .unwrap()
            .get("ROL-6205")
            .unwrap()
            .unwrap()
            .stock_quantity;
        assert_eq!(stock, 1);
    }

    // ==========================================
    // 测试3: 状态 CAS 冲突
    // ==========================================

    #[test]
    fn test_stale_status_update_is_rejected() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let lifecycle = lifecycle_session(&db_path);
        let created = lifecycle
            .generate_from_critical(&[critical_reading()], ts(2024, 6, 1, 9))
            .unwrap();
        let os_id = created[0].os_id.clone();

        // 会话 A 与 B 读到同一个 Aberta 快照
        let repo_a = ServiceOrderRepository::from_connection(open_session(&db_path));
        let repo_b = ServiceOrderRepository::from_connection(open_session(&db_path));
        let snapshot_a = repo_a.find_by_id(&os_id).unwrap().unwrap();
        let snapshot_b = repo_b.find_by_id(&os_id).unwrap().unwrap();

        let mut update_a = snapshot_a.clone();
        update_a.status = OrderStatus::InProgress;
        update_a.notes = "A assumiu".to_string();
        repo_a.update(&update_a, snapshot_a.status).unwrap();

        let mut update_b = snapshot_b.clone();
        update_b.status = OrderStatus::InProgress;
        update_b.notes = "B assumiu".to_string();
        let err = repo_b.update(&update_b, snapshot_b.status).unwrap_err();
        assert!(matches!(err, RepositoryError::StaleState { .. }));

        let stored = repo_b.find_by_id(&os_id).unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::InProgress);
        assert_eq!(stored.notes, "A assumiu");
    }
}
