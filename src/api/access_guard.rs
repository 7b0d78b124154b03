// ==========================================
// 工厂设备维护管理 - 页面访问守卫
// ==========================================
// 职责: 按角色表校验请求上下文能否访问页面
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::access::{is_page_allowed, RequestContext};
use crate::repository::role_repo::RoleRepository;
use std::sync::Arc;
use tracing::warn;

pub struct AccessGuard {
    role_repo: Arc<RoleRepository>,
}

impl AccessGuard {
    pub fn new(role_repo: Arc<RoleRepository>) -> Self {
        Self { role_repo }
    }

    /// 校验页面访问权限
    ///
    /// # 错误
    /// - AccessDenied: 角色不存在或页面未授权
    pub fn require(&self, ctx: &RequestContext, page: &str) -> ApiResult<()> {
        let permissions = self.role_repo.permission_map()?;
        if is_page_allowed(&permissions, &ctx.role, page) {
            return Ok(());
        }
        warn!(user_id = %ctx.user_id, role = %ctx.role, page, "页面访问被拒绝");
        Err(ApiError::AccessDenied {
            role: ctx.role.clone(),
            page: page.to_string(),
        })
    }
}
