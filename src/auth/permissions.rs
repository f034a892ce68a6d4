// ==========================================
// 建材商品目录系统 - 权限策略
// ==========================================
// 规则:
// - admin: 全部
// - manager: brands/products/excel_formats（品牌删除除外），不可管理用户
// - viewer: 仅 read
// - 未知角色: 无权限
// ==========================================

use crate::domain::types::{Action, Resource, Role};

/// 角色是否允许对资源执行操作
pub fn has_permission(role: Role, resource: Resource, action: Action) -> bool {
    match role {
        Role::Admin => true,
        Role::Manager => match (resource, action) {
            (Resource::Brands, Action::Delete) => false,
            (Resource::Users, _) => false,
            (Resource::Brands | Resource::Products | Resource::ExcelFormats, _) => true,
        },
        Role::Viewer => action == Action::Read,
    }
}

/// 按角色名判断（无法识别的角色一律拒绝）
pub fn has_permission_for_role_name(role: &str, resource: Resource, action: Action) -> bool {
    role.parse::<Role>()
        .map(|role| has_permission(role, resource, action))
        .unwrap_or(false)
}

pub fn can_manage_content(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Manager)
}

pub fn can_manage_users(role: Role) -> bool {
    role == Role::Admin
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESOURCES: [Resource; 4] = [
        Resource::Brands,
        Resource::Products,
        Resource::ExcelFormats,
        Resource::Users,
    ];
    const ACTIONS: [Action; 4] = [Action::Read, Action::Create, Action::Update, Action::Delete];

    #[test]
    fn test_admin_allows_everything() {
        for resource in RESOURCES {
            for action in ACTIONS {
                assert!(has_permission(Role::Admin, resource, action));
            }
        }
    }

    #[test]
    fn test_manager_policy() {
        assert!(has_permission(Role::Manager, Resource::Brands, Action::Update));
        assert!(!has_permission(Role::Manager, Resource::Brands, Action::Delete));
        assert!(has_permission(Role::Manager, Resource::Products, Action::Delete));
        assert!(has_permission(Role::Manager, Resource::ExcelFormats, Action::Create));
        for action in ACTIONS {
            assert!(!has_permission(Role::Manager, Resource::Users, action));
        }
    }

    #[test]
    fn test_viewer_reads_only() {
        for resource in RESOURCES {
            assert!(has_permission(Role::Viewer, resource, Action::Read));
            assert!(!has_permission(Role::Viewer, resource, Action::Create));
        }
    }

    #[test]
    fn test_unknown_role_denied() {
        assert!(!has_permission_for_role_name("guest", Resource::Products, Action::Read));
        assert!(has_permission_for_role_name("viewer", Resource::Products, Action::Read));
    }
}
