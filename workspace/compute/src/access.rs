//! Role decisions used by the request guard and by account creation.

use std::collections::HashSet;

use model::entities::account::{self, Role};

/// A static set of roles allowed to reach an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSet(&'static [Role]);

impl RoleSet {
    pub const ADMIN: RoleSet = RoleSet(&[Role::Admin]);
    pub const TEACHER: RoleSet = RoleSet(&[Role::Teacher]);
    pub const STUDENT: RoleSet = RoleSet(&[Role::Student]);
    pub const ADMIN_OR_TEACHER: RoleSet = RoleSet(&[Role::Admin, Role::Teacher]);
    pub const ANY: RoleSet = RoleSet(&[Role::Admin, Role::Teacher, Role::Student]);

    pub const fn new(roles: &'static [Role]) -> Self {
        RoleSet(roles)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn roles(&self) -> &'static [Role] {
        self.0
    }
}

/// Outcome of checking an authenticated account against a `RoleSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Forbidden,
}

/// Decides whether `account` may reach an operation open to `allowed`.
///
/// Superusers are let into anything that admits admins, whatever their role.
pub fn authorize(account: &account::Model, allowed: RoleSet) -> Access {
    if allowed.contains(account.role) {
        return Access::Granted;
    }
    if account.is_superuser && allowed.contains(Role::Admin) {
        return Access::Granted;
    }
    Access::Forbidden
}

/// Which roles must be approved by an admin before they can log in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPolicy {
    roles: HashSet<Role>,
}

impl ApprovalPolicy {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }

    pub fn requires_approval(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl Default for ApprovalPolicy {
    /// Every role waits for approval.
    fn default() -> Self {
        Self::new([Role::Admin, Role::Teacher, Role::Student])
    }
}
