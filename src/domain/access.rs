// ==========================================
// 工厂设备维护管理 - 访问控制模型
// ==========================================
// 职责: 显式请求上下文 + 角色→页面授权（纯函数）
// 红线: 不依赖任何会话级隐式状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// 页面标识（与角色表 pages 字段一致）
// ==========================================
pub mod pages {
    pub const OVERVIEW: &str = "1_Inicial_Screen";
    pub const PLANT_MAP: &str = "2_Plant_Map";
    pub const EQUIPMENT_MONITORING: &str = "3_Equipment_Monitoring";
    pub const OS_PLANNING: &str = "4_OS_Planning";
    pub const TECH_APP: &str = "5_Tech_App";
    pub const EQUIPMENT_HISTORY: &str = "6_Equipment_History";
    pub const USER_MANAGEMENT: &str = "7_User_Management";
    pub const MAINTENANCE_KPIS: &str = "8_KPIs_Manutencao";
    pub const INVENTORY: &str = "9_Inventory_Management";
    pub const ASSET_MANAGEMENT: &str = "10_Equipments_Management";
    pub const FAILURE_PREDICTION: &str = "11_Failure_Prediction";

    pub const ALL: [&str; 11] = [
        OVERVIEW,
        PLANT_MAP,
        EQUIPMENT_MONITORING,
        OS_PLANNING,
        TECH_APP,
        EQUIPMENT_HISTORY,
        USER_MANAGEMENT,
        MAINTENANCE_KPIS,
        INVENTORY,
        ASSET_MANAGEMENT,
        FAILURE_PREDICTION,
    ];
}

/// 管理员角色名（可查看全部活动工单）
pub const ADMIN_ROLE: &str = "admin";

// ==========================================
// RequestContext - 请求上下文
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: String,
    pub display_name: String, // 用于匹配 assigned_to
    pub role: String,
}

impl RequestContext {
    pub fn new(user_id: &str, display_name: &str, role: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            role: role.to_string(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

// ==========================================
// RolePermission - 角色可访问页面
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePermission {
    pub role_name: String,
    pub pages: Vec<String>,
}

/// 判断角色是否可访问页面
///
/// # 返回
/// - true: 角色存在且页面在其授权列表中
/// - false: 角色不存在或页面未授权
pub fn is_page_allowed(permissions: &HashMap<String, RolePermission>, role: &str, page: &str) -> bool {
    permissions
        .get(role)
        .map(|p| p.pages.iter().any(|allowed| allowed == page))
        .unwrap_or(false)
}

/// 默认角色: admin 全部页面，viewer 只读页面
pub fn default_roles() -> Vec<RolePermission> {
    vec![
        RolePermission {
            role_name: ADMIN_ROLE.to_string(),
            pages: pages::ALL.iter().map(|p| p.to_string()).collect(),
        },
        RolePermission {
            role_name: "viewer".to_string(),
            pages: [
                pages::OVERVIEW,
                pages::PLANT_MAP,
                pages::EQUIPMENT_MONITORING,
                pages::EQUIPMENT_HISTORY,
                pages::MAINTENANCE_KPIS,
                pages::FAILURE_PREDICTION,
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission_map() -> HashMap<String, RolePermission> {
        default_roles()
            .into_iter()
            .map(|r| (r.role_name.clone(), r))
            .collect()
    }

    #[test]
    fn test_admin_reaches_every_page() {
        let perms = permission_map();
        for page in pages::ALL {
            assert!(is_page_allowed(&perms, ADMIN_ROLE, page));
        }
    }

    #[test]
    fn test_viewer_is_read_only() {
        let perms = permission_map();
        assert!(is_page_allowed(&perms, "viewer", pages::MAINTENANCE_KPIS));
        assert!(!is_page_allowed(&perms, "viewer", pages::TECH_APP));
        assert!(!is_page_allowed(&perms, "viewer", pages::INVENTORY));
    }

    #[test]
    fn test_unknown_role_denied() {
        let perms = permission_map();
        assert!(!is_page_allowed(&perms, "guest", pages::OVERVIEW));
    }
}
