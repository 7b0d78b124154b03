// ==========================================
// 工厂设备维护管理 - 备件库存台账
// ==========================================
// 职责: 出库/入库/建档/低库存查询
// 红线: 库存永不为负；库存不足时不做任何修改
// ==========================================

use crate::domain::inventory::Part;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::part_repo::PartRepository;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct InventoryLedger {
    part_repo: Arc<PartRepository>,
}

impl InventoryLedger {
    pub fn new(part_repo: Arc<PartRepository>) -> Self {
        Self { part_repo }
    }

    /// 出库
    ///
    /// # 返回
    /// 出库后的库存
    ///
    /// # 错误
    /// - Validation: 数量 <= 0
    /// - NotFound: 备件不存在
    /// - InsufficientStock: 库存不足
    #[instrument(skip(self))]
    pub fn consume(&self, part_id: &str, quantity: i64) -> EngineResult<i64> {
        validate_quantity(quantity)?;
        match self.part_repo.consume_stock(part_id, quantity) {
            Ok(level) => {
                info!(part_id, quantity, stock_after = level, "备件出库");
                Ok(level)
            }
            Err(e) => {
                let e = EngineError::from(e);
                if let EngineError::InsufficientStock { available, .. } = &e {
                    warn!(part_id, quantity, available, "备件库存不足，出库被拒绝");
                }
                Err(e)
            }
        }
    }

    /// 新建备件（编号重复 → DuplicateKey）
    pub fn create_part(&self, part: &Part) -> EngineResult<()> {
        validate_part(part)?;
        self.part_repo.create(part).map_err(|e| match EngineError::from(e) {
            EngineError::DuplicateKey(_) => {
                EngineError::DuplicateKey(format!("备件已存在: {}", part.part_id))
            }
            other => other,
        })?;
        info!(part_id = %part.part_id, stock = part.stock_quantity, "备件建档");
        Ok(())
    }

    /// 新建或覆盖备件主数据
    pub fn upsert_part(&self, part: &Part) -> EngineResult<()> {
        validate_part(part)?;
        self.part_repo.upsert(part)?;
        info!(part_id = %part.part_id, stock = part.stock_quantity, "备件主数据已保存");
        Ok(())
    }

    /// 入库
    ///
    /// # 返回
    /// 入库后的库存
    #[instrument(skip(self))]
    pub fn restock(&self, part_id: &str, quantity: i64) -> EngineResult<i64> {
        validate_quantity(quantity)?;
        let level = self.part_repo.restock(part_id, quantity)?;
        info!(part_id, quantity, stock_after = level, "备件入库");
        Ok(level)
    }

    pub fn get(&self, part_id: &str) -> EngineResult<Part> {
        self.part_repo
            .get(part_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Part".to_string(),
                id: part_id.to_string(),
            })
    }

    pub fn list(&self) -> EngineResult<Vec<Part>> {
        Ok(self.part_repo.list()?)
    }

    /// 低库存备件（stock_quantity <= min_stock_level）
    pub fn low_stock(&self) -> EngineResult<Vec<Part>> {
        Ok(self.part_repo.low_stock()?)
    }
}

pub(crate) fn validate_quantity(quantity: i64) -> EngineResult<()> {
    if quantity <= 0 {
        return Err(EngineError::Validation(format!(
            "数量必须大于 0: {}",
            quantity
        )));
    }
    Ok(())
}

fn validate_part(part: &Part) -> EngineResult<()> {
    if part.part_id.trim().is_empty() {
        return Err(EngineError::Validation("备件编号为空".to_string()));
    }
    if part.stock_quantity < 0 {
        return Err(EngineError::Validation(format!(
            "库存不能为负: {}",
            part.stock_quantity
        )));
    }
    if part.min_stock_level < 0 || part.unit_cost < 0.0 {
        return Err(EngineError::Validation(format!(
            "备件{}: 最低库存与单价不能为负",
            part.part_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn ledger() -> InventoryLedger {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        let repo = PartRepository::from_connection(Arc::new(Mutex::new(conn)));
        InventoryLedger::new(Arc::new(repo))
    }

    fn part(id: &str, stock: i64) -> Part {
        Part {
            part_id: id.to_string(),
            description: "Correia".to_string(),
            stock_quantity: stock,
            min_stock_level: 5,
            unit_cost: 12.0,
        }
    }

    #[test]
    fn test_consume_rejects_non_positive_quantity() {
        let l = ledger();
        l.create_part(&part("COR-A40", 8)).unwrap();
        assert!(matches!(l.consume("COR-A40", 0), Err(EngineError::Validation(_))));
        assert!(matches!(l.consume("COR-A40", -2), Err(EngineError::Validation(_))));
        assert_eq!(l.get("COR-A40").unwrap().stock_quantity, 8);
    }

    #[test]
    fn test_create_duplicate_and_restock() {
        let l = ledger();
        l.create_part(&part("COR-A40", 1)).unwrap();
        assert!(matches!(
            l.create_part(&part("COR-A40", 1)),
            Err(EngineError::DuplicateKey(_))
        ));
        assert_eq!(l.low_stock().unwrap().len(), 1);
        assert_eq!(l.restock("COR-A40", 9).unwrap(), 10);
        assert!(l.low_stock().unwrap().is_empty());
        assert!(matches!(l.get("NOPE"), Err(EngineError::NotFound { .. })));
    }
}
