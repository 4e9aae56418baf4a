use domain::{ContextId, UserId};
use std::collections::HashSet;

pub const PERM_VIEW: &str = "comment:view";
pub const PERM_EDIT_ANY: &str = "comment:editany";
pub const PERM_DELETE: &str = "comment:delete";

/// The host's permission system. `None` is the guest user.
pub trait PermissionOracle: Send + Sync {
    fn has_permission(&self, permission: &str, context_id: ContextId, user_id: Option<UserId>) -> bool;
}

/// Fixed grant table, for hosts without their own role system.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    users: HashSet<(String, ContextId, UserId)>,
    everyone: HashSet<(String, ContextId)>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, permission: &str, context_id: ContextId, user_id: UserId) -> Self {
        self.users.insert((permission.to_string(), context_id, user_id));
        self
    }

    // 包括访客
    pub fn grant_everyone(mut self, permission: &str, context_id: ContextId) -> Self {
        self.everyone.insert((permission.to_string(), context_id));
        self
    }
}

impl PermissionOracle for PermissionTable {
    fn has_permission(&self, permission: &str, context_id: ContextId, user_id: Option<UserId>) -> bool {
        if self.everyone.contains(&(permission.to_string(), context_id)) {
            return true;
        }
        match user_id {
            Some(user_id) => self
                .users
                .contains(&(permission.to_string(), context_id, user_id)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_are_per_context() {
        let table = PermissionTable::new()
            .grant(PERM_DELETE, 1, 7)
            .grant_everyone(PERM_VIEW, 1);

        assert!(table.has_permission(PERM_VIEW, 1, None));
        assert!(table.has_permission(PERM_VIEW, 1, Some(3)));
        assert!(!table.has_permission(PERM_VIEW, 2, Some(3)));
        assert!(table.has_permission(PERM_DELETE, 1, Some(7)));
        assert!(!table.has_permission(PERM_DELETE, 1, Some(8)));
        assert!(!table.has_permission(PERM_DELETE, 1, None));
    }
}
