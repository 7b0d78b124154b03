// ==========================================
// 工厂设备维护管理 - 角色权限 API
// ==========================================

use std::sync::Arc;

use tracing::info;

use crate::api::access_guard::AccessGuard;
use crate::api::error::{ApiError, ApiResult};
use crate::domain::access::{pages, RequestContext, RolePermission};
use crate::repository::role_repo::RoleRepository;

pub struct RoleApi {
    role_repo: Arc<RoleRepository>,
    guard: Arc<AccessGuard>,
}

impl RoleApi {
    pub fn new(role_repo: Arc<RoleRepository>, guard: Arc<AccessGuard>) -> Self {
        Self { role_repo, guard }
    }

    /// 当前用户可访问的页面（用于导航）
    pub fn allowed_pages(&self, ctx: &RequestContext) -> ApiResult<Vec<String>> {
        Ok(self
            .role_repo
            .get(&ctx.role)?
            .map(|r| r.pages)
            .unwrap_or_default())
    }

    pub fn list_roles(&self, ctx: &RequestContext) -> ApiResult<Vec<RolePermission>> {
        self.guard.require(ctx, pages::USER_MANAGEMENT)?;
        Ok(self.role_repo.list()?)
    }

    /// 新建或覆盖角色；页面必须是已知页面
    pub fn save_role(&self, ctx: &RequestContext, role: RolePermission) -> ApiResult<()> {
        self.guard.require(ctx, pages::USER_MANAGEMENT)?;
        if role.role_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("角色名为空".to_string()));
        }
        if let Some(unknown) = role.pages.iter().find(|p| !pages::ALL.contains(&p.as_str())) {
            return Err(ApiError::InvalidInput(format!("未知页面: {}", unknown)));
        }
        self.role_repo.upsert(&role)?;
        info!(user_id = %ctx.user_id, role = %role.role_name, pages = role.pages.len(), "角色已保存");
        Ok(())
    }
}
