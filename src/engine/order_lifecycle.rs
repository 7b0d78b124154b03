// ==========================================
// 工厂设备维护管理 - 工单生命周期引擎
// ==========================================
// 状态机: Aberta → Em Andamento → Concluída（只进不退，可跳过 Em Andamento）
// 红线: 同一 (asset_id, reason) 最多一张活动工单（存储层唯一索引兜底）
// 红线: 完工必须给出根因（取自根因列表，且不为 "Não Definida"）
// 红线: 预测性工单完工时同事务登记已处理告警
// ==========================================
// 创建路径:
// - 人工创建: 已有活动工单 → DuplicateKey
// - 严重告警自动生成: 已有活动工单 → 跳过
// - 预防性工单周期重开: 已有 Aberta 工单 → 跳过；Em Andamento 由存储层跳过
// ==========================================

use crate::domain::access::RequestContext;
use crate::domain::inventory::PartsUsageRecord;
use crate::domain::sensor::ClassifiedReading;
use crate::domain::service_order::{NewServiceOrder, OrderTransition, ServiceOrder};
use crate::domain::types::{
    AlertStatus, OrderClass, OrderStatus, Priority, Recurrence, ROOT_CAUSES, ROOT_CAUSE_UNDEFINED,
    UNASSIGNED,
};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::inventory_ledger::validate_quantity;
use crate::repository::part_repo::PartRepository;
use crate::repository::service_order_repo::ServiceOrderRepository;
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// 纯规划函数（不落库）
// ==========================================

/// 由严重告警规划预测性工单
///
/// 每个不同的严重 (asset_id, asset_type, reason) 至多一张；
/// 已有活动工单的 (asset_id, reason) 跳过。顺序为告警首次出现顺序。
pub fn plan_orders_from_critical(
    classified: &[ClassifiedReading],
    existing: &[ServiceOrder],
    now: NaiveDateTime,
) -> Vec<ServiceOrder> {
    let mut taken: HashSet<(&str, &str)> = existing
        .iter()
        .filter(|o| o.is_active())
        .map(|o| (o.asset_id.as_str(), o.reason.as_str()))
        .collect();

    let mut planned = Vec::new();
    for c in classified
        .iter()
        .filter(|c| c.status == AlertStatus::Critical && !c.status_reason.is_empty())
    {
        let key = (c.reading.asset_id.as_str(), c.status_reason.as_str());
        if !taken.insert(key) {
            continue;
        }
        planned.push(predictive_order(
            &c.reading.asset_id,
            &c.reading.asset_type,
            &c.status_reason,
            now,
        ));
    }
    planned
}

fn predictive_order(
    asset_id: &str,
    asset_type: &str,
    reason: &str,
    now: NaiveDateTime,
) -> ServiceOrder {
    ServiceOrder {
        os_id: ServiceOrder::generate_id(),
        asset_id: asset_id.to_string(),
        asset_type: asset_type.to_string(),
        creation_date: now,
        reason: reason.to_string(),
        priority: Priority::Critical,
        status: OrderStatus::Open,
        class: OrderClass::Predictive,
        recurrence: Recurrence::None,
        assigned_to: UNASSIGNED.to_string(),
        notes: String::new(),
        estimated_cost: 0.0,
        actual_cost: 0.0,
        root_cause: None,
        files_attached: Vec::new(),
        completion_date: None,
    }
}

/// 规划预防性工单的周期重开
///
/// 按 (asset_id, reason) 分组取最近完工的重复性预防工单；
/// now >= 完工时间 + 周期 且该问题无 Aberta 工单时，克隆优先级/负责人/预估成本/周期新建
pub fn plan_recurring_orders(existing: &[ServiceOrder], now: NaiveDateTime) -> Vec<ServiceOrder> {
    let mut latest: HashMap<(&str, &str), &ServiceOrder> = HashMap::new();
    for o in existing.iter().filter(|o| {
        o.class == OrderClass::Preventive
            && o.recurrence != Recurrence::None
            && o.status == OrderStatus::Completed
            && o.completion_date.is_some()
    }) {
        let key = (o.asset_id.as_str(), o.reason.as_str());
        match latest.get(&key) {
            Some(cur) if cur.completion_date >= o.completion_date => {}
            _ => {
                latest.insert(key, o);
            }
        }
    }

    let open: HashSet<(&str, &str)> = existing
        .iter()
        .filter(|o| o.status == OrderStatus::Open)
        .map(|o| (o.asset_id.as_str(), o.reason.as_str()))
        .collect();

    let mut templates: Vec<&ServiceOrder> = latest.into_values().collect();
    templates.sort_by(|a, b| (&a.asset_id, &a.reason).cmp(&(&b.asset_id, &b.reason)));

    templates
        .into_iter()
        .filter(|last| {
            let due = last
                .completion_date
                .and_then(|done| last.recurrence.next_due(done));
            matches!(due, Some(due) if now >= due)
        })
        .filter(|last| !open.contains(&(last.asset_id.as_str(), last.reason.as_str())))
        .map(|last| ServiceOrder {
            os_id: ServiceOrder::generate_id(),
            asset_id: last.asset_id.clone(),
            asset_type: last.asset_type.clone(),
            creation_date: now,
            reason: last.reason.clone(),
            priority: last.priority,
            status: OrderStatus::Open,
            class: OrderClass::Preventive,
            recurrence: last.recurrence,
            assigned_to: last.assigned_to.clone(),
            notes: String::new(),
            estimated_cost: last.estimated_cost,
            actual_cost: 0.0,
            root_cause: None,
            files_attached: Vec::new(),
            completion_date: None,
        })
        .collect()
}

/// 附件存储文件名: {os_id}_{原文件名}（去除路径部分）
pub fn attachment_file_name(os_id: &str, original: &str) -> Option<String> {
    let base = Path::new(original.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::trim)
        .filter(|n| !n.is_empty())?;
    Some(format!("{}_{}", os_id, base))
}

/// 技师工作清单: 分配给当前用户的活动工单；管理员可见全部活动工单
pub fn technician_work_list(orders: &[ServiceOrder], ctx: &RequestContext) -> Vec<ServiceOrder> {
    orders
        .iter()
        .filter(|o| o.is_active())
        .filter(|o| ctx.is_admin() || o.assigned_to == ctx.display_name)
        .cloned()
        .collect()
}

/// 根因是否可用于完工: 必须取自根因列表，且不是哨兵值
fn is_defined_root_cause(root_cause: Option<&str>) -> bool {
    matches!(
        root_cause.map(str::trim),
        Some(rc) if rc != ROOT_CAUSE_UNDEFINED && ROOT_CAUSES.contains(&rc)
    )
}

// ==========================================
// ServiceOrderLifecycle - 工单生命周期服务
// ==========================================
pub struct ServiceOrderLifecycle {
    order_repo: Arc<ServiceOrderRepository>,
    part_repo: Arc<PartRepository>,
}

impl ServiceOrderLifecycle {
    pub fn new(order_repo: Arc<ServiceOrderRepository>, part_repo: Arc<PartRepository>) -> Self {
        Self {
            order_repo,
            part_repo,
        }
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 人工创建工单
    ///
    /// # 返回
    /// 新工单号
    ///
    /// # 错误
    /// - Validation: asset_id/reason 为空或预估成本为负
    /// - DuplicateKey: 同一 (asset_id, reason) 已有活动工单
    #[instrument(skip(self, new_order), fields(asset_id = %new_order.asset_id, reason = %new_order.reason))]
    pub fn create_manual(
        &self,
        new_order: NewServiceOrder,
        now: NaiveDateTime,
    ) -> EngineResult<String> {
        if new_order.asset_id.trim().is_empty() {
            return Err(EngineError::Validation("asset_id 不能为空".to_string()));
        }
        if new_order.reason.trim().is_empty() {
            return Err(EngineError::Validation("reason 不能为空".to_string()));
        }
        if !(new_order.estimated_cost >= 0.0) {
            return Err(EngineError::Validation(format!(
                "预估成本无效: {}",
                new_order.estimated_cost
            )));
        }

        let order = new_order.into_order(now);
        if !self.order_repo.insert_if_no_active(&order)? {
            return Err(EngineError::DuplicateKey(format!(
                "资产{}的问题\"{}\"已有未完工工单",
                order.asset_id, order.reason
            )));
        }

        info!(
            os_id = %order.os_id,
            class = %order.class,
            priority = %order.priority,
            "工单已创建"
        );
        Ok(order.os_id)
    }

    /// 由严重告警生成预测性工单并落库
    ///
    /// # 返回
    /// 本次实际写入的工单（并发会话已写入的视为已存在，不返回）
    #[instrument(skip(self, classified), fields(count = classified.len()))]
    pub fn generate_from_critical(
        &self,
        classified: &[ClassifiedReading],
        now: NaiveDateTime,
    ) -> EngineResult<Vec<ServiceOrder>> {
        let existing = self.order_repo.find_active()?;
        let planned = plan_orders_from_critical(classified, &existing, now);
        let created = self.persist_guarded(planned)?;
        if !created.is_empty() {
            info!(created = created.len(), "已生成预测性工单");
        }
        Ok(created)
    }

    /// 预防性工单周期重开
    #[instrument(skip(self))]
    pub fn sweep_recurrence(&self, now: NaiveDateTime) -> EngineResult<Vec<ServiceOrder>> {
        let existing = self.order_repo.all()?;
        let planned = plan_recurring_orders(&existing, now);
        let created = self.persist_guarded(planned)?;
        if !created.is_empty() {
            info!(created = created.len(), "已重开预防性工单");
        }
        Ok(created)
    }

    fn persist_guarded(&self, planned: Vec<ServiceOrder>) -> EngineResult<Vec<ServiceOrder>> {
        let mut created = Vec::with_capacity(planned.len());
        for order in planned {
            if self.order_repo.insert_if_no_active(&order)? {
                info!(
                    os_id = %order.os_id,
                    asset_id = %order.asset_id,
                    reason = %order.reason,
                    class = %order.class,
                    "工单已创建"
                );
                created.push(order);
            } else {
                debug!(asset_id = %order.asset_id, reason = %order.reason, "活动工单已存在，跳过");
            }
        }
        Ok(created)
    }

    // ==========================================
    // 状态迁移
    // ==========================================

    /// 状态迁移
    ///
    /// 规则:
    /// - 只进不退，Concluída 为终态；非终态允许原地更新备注/成本
    /// - 迁移到 Concluída: 根因必填，写入完工时间
    /// - 非完工迁移未给根因时保留原根因
    /// - 预测性工单完工时同事务登记 (asset_id, reason) 为已处理
    ///
    /// # 错误
    /// - NotFound: 工单不存在
    /// - Validation: 非法迁移/根因缺失/成本为负
    /// - Conflict: 其他会话已修改状态
    #[instrument(skip(self, transition), fields(new_status = %transition.new_status))]
    pub fn transition(
        &self,
        os_id: &str,
        transition: OrderTransition,
        now: NaiveDateTime,
    ) -> EngineResult<ServiceOrder> {
        let current = self.get(os_id)?;

        if !current.status.can_transition_to(transition.new_status) {
            return Err(EngineError::Validation(format!(
                "工单{}不允许从{}迁移到{}",
                os_id, current.status, transition.new_status
            )));
        }
        if !(transition.actual_cost >= 0.0) {
            return Err(EngineError::Validation(format!(
                "实际成本无效: {}",
                transition.actual_cost
            )));
        }

        let completing = transition.new_status == OrderStatus::Completed;
        if completing && !is_defined_root_cause(transition.root_cause.as_deref()) {
            return Err(EngineError::Validation(
                "完工必须从根因列表中选择（不能为空或\"Não Definida\"）".to_string(),
            ));
        }

        let supplied_root_cause = transition
            .root_cause
            .map(|rc| rc.trim().to_string())
            .filter(|rc| !rc.is_empty());

        let mut updated = current.clone();
        updated.status = transition.new_status;
        updated.notes = transition.notes;
        updated.actual_cost = transition.actual_cost;
        if supplied_root_cause.is_some() {
            updated.root_cause = supplied_root_cause;
        }

        if completing {
            updated.completion_date = Some(now);
            let resolve_alert = current.class == OrderClass::Predictive;
            self.order_repo
                .complete(&updated, current.status, resolve_alert)?;
            info!(
                os_id,
                root_cause = ?updated.root_cause,
                actual_cost = updated.actual_cost,
                resolved_alert = resolve_alert,
                "工单已完工"
            );
        } else {
            self.order_repo.update(&updated, current.status)?;
            info!(os_id, from = %current.status, to = %updated.status, "工单状态已更新");
        }

        Ok(updated)
    }

    // ==========================================
    // 附件与备件
    // ==========================================

    /// 登记附件（有序集合追加，重复为空操作）
    ///
    /// 文件名按原样登记；上传路径负责生成 {os_id}_{原文件名}
    pub fn attach_file(&self, os_id: &str, filename: &str) -> EngineResult<String> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(EngineError::Validation("附件文件名为空".to_string()));
        }
        if self.order_repo.append_attachment(os_id, filename)? {
            info!(os_id, file = %filename, "附件已登记");
        } else {
            debug!(os_id, file = %filename, "附件已存在");
        }
        Ok(filename.to_string())
    }

    /// 工单领用备件（扣减库存 + 写领用记录，同一事务）
    ///
    /// # 返回
    /// 领用记录
    #[instrument(skip(self))]
    pub fn consume_part(
        &self,
        os_id: &str,
        part_id: &str,
        quantity: i64,
    ) -> EngineResult<PartsUsageRecord> {
        validate_quantity(quantity)?;
        match self.part_repo.consume_for_order(os_id, part_id, quantity) {
            Ok((level, usage_id)) => {
                info!(os_id, part_id, quantity, stock_after = level, "工单领用备件");
                Ok(PartsUsageRecord {
                    usage_id: Some(usage_id),
                    os_id: os_id.to_string(),
                    part_id: part_id.to_string(),
                    quantity_used: quantity,
                })
            }
            Err(e) => {
                let e = EngineError::from(e);
                if let EngineError::InsufficientStock { available, .. } = &e {
                    warn!(os_id, part_id, quantity, available, "备件库存不足，领用被拒绝");
                }
                Err(e)
            }
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get(&self, os_id: &str) -> EngineResult<ServiceOrder> {
        self.order_repo
            .find_by_id(os_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "ServiceOrder".to_string(),
                id: os_id.to_string(),
            })
    }

    pub fn all(&self) -> EngineResult<Vec<ServiceOrder>> {
        Ok(self.order_repo.all()?)
    }

    pub fn active(&self) -> EngineResult<Vec<ServiceOrder>> {
        Ok(self.order_repo.find_active()?)
    }

    pub fn find_by_asset(&self, asset_id: &str) -> EngineResult<Vec<ServiceOrder>> {
        Ok(self.order_repo.find_by_asset(asset_id)?)
    }

    pub fn work_list(&self, ctx: &RequestContext) -> EngineResult<Vec<ServiceOrder>> {
        let active = self.order_repo.find_active()?;
        Ok(technician_work_list(&active, ctx))
    }
}
