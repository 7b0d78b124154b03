// ==========================================
// 工厂设备维护管理 - 备件库存 API
// ==========================================

use std::sync::Arc;

use crate::api::access_guard::AccessGuard;
use crate::api::error::ApiResult;
use crate::domain::access::{pages, RequestContext};
use crate::domain::inventory::Part;
use crate::engine::inventory_ledger::InventoryLedger;

pub struct InventoryApi {
    ledger: Arc<InventoryLedger>,
    guard: Arc<AccessGuard>,
}

impl InventoryApi {
    pub fn new(ledger: Arc<InventoryLedger>, guard: Arc<AccessGuard>) -> Self {
        Self { ledger, guard }
    }

    pub fn list_parts(&self, ctx: &RequestContext) -> ApiResult<Vec<Part>> {
        self.guard.require(ctx, pages::INVENTORY)?;
        Ok(self.ledger.list()?)
    }

    pub fn get_part(&self, ctx: &RequestContext, part_id: &str) -> ApiResult<Part> {
        self.guard.require(ctx, pages::INVENTORY)?;
        Ok(self.ledger.get(part_id)?)
    }

    pub fn low_stock(&self, ctx: &RequestContext) -> ApiResult<Vec<Part>> {
        self.guard.require(ctx, pages::INVENTORY)?;
        Ok(self.ledger.low_stock()?)
    }

    /// 新建备件（编号重复 → DuplicateKey）
    pub fn create_part(&self, ctx: &RequestContext, part: &Part) -> ApiResult<()> {
        self.guard.require(ctx, pages::INVENTORY)?;
        Ok(self.ledger.create_part(part)?)
    }

    /// 保存备件主数据（存在则覆盖）
    pub fn save_part(&self, ctx: &RequestContext, part: &Part) -> ApiResult<()> {
        self.guard.require(ctx, pages::INVENTORY)?;
        Ok(self.ledger.upsert_part(part)?)
    }

    pub fn restock(&self, ctx: &RequestContext, part_id: &str, quantity: i64) -> ApiResult<i64> {
        self.guard.require(ctx, pages::INVENTORY)?;
        Ok(self.ledger.restock(part_id, quantity)?)
    }

    /// 直接出库（不关联工单）
    pub fn consume(&self, ctx: &RequestContext, part_id: &str, quantity: i64) -> ApiResult<i64> {
        self.guard.require(ctx, pages::INVENTORY)?;
        Ok(self.ledger.consume(part_id, quantity)?)
    }
}
