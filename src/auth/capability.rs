//! Route capability table
//!
//! Declares who may reach each path prefix. The router middleware consults
//! this table once per request; handlers never compare role strings.

use super::Role;

/// Access rule for a path prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, token optional
    Public,
    /// Any authenticated role
    Authenticated,
    /// Only the listed roles
    Roles(&'static [Role]),
}

impl Access {
    pub fn allows(&self, role: Role) -> bool {
        match self {
            Access::Public | Access::Authenticated => true,
            Access::Roles(roles) => roles.contains(&role),
        }
    }
}

const ADMIN: &[Role] = &[Role::Admin];
const OPERATIONS: &[Role] = &[Role::Admin, Role::TourManager];
const FINANCE: &[Role] = &[Role::Admin, Role::Accountant];
const CLIENT: &[Role] = &[Role::Client];

/// Longest matching prefix wins; unlisted paths are public.
const ROUTE_TABLE: &[(&str, Access)] = &[
    ("/api/auth/me", Access::Authenticated),
    ("/api/auth", Access::Public),
    ("/api/admin", Access::Roles(ADMIN)),
    ("/api/manage", Access::Roles(OPERATIONS)),
    ("/api/storage", Access::Roles(OPERATIONS)),
    ("/api/finance", Access::Roles(FINANCE)),
    ("/api/client", Access::Roles(CLIENT)),
    ("/api/dashboard/admin", Access::Roles(ADMIN)),
    ("/api/dashboard/tour-manager", Access::Roles(OPERATIONS)),
    ("/api/dashboard/accountant", Access::Roles(FINANCE)),
    ("/api/dashboard/client", Access::Roles(CLIENT)),
    ("/api/dashboard", Access::Authenticated),
];

fn prefix_matches(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Access rule for a request path
pub fn access_for(path: &str) -> Access {
    ROUTE_TABLE
        .iter()
        .filter(|(prefix, _)| prefix_matches(path, prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, access)| *access)
        .unwrap_or(Access::Public)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_prefix_wins() {
        assert_eq!(access_for("/api/auth/login"), Access::Public);
        assert_eq!(access_for("/api/auth/me"), Access::Authenticated);
        assert_eq!(access_for("/api/dashboard/client"), Access::Roles(CLIENT));
        assert_eq!(access_for("/api/dashboard"), Access::Authenticated);
    }

    #[test]
    fn test_prefix_respects_segments() {
        assert_eq!(access_for("/api/administrator"), Access::Public);
        assert_eq!(access_for("/api/admin/settings/site_name"), Access::Roles(ADMIN));
    }

    #[test]
    fn test_unlisted_paths_are_public() {
        assert_eq!(access_for("/health"), Access::Public);
        assert_eq!(access_for("/sitemap.xml"), Access::Public);
        assert_eq!(access_for("/api/packages/sahara"), Access::Public);
    }

    #[test]
    fn test_role_sets() {
        let finance = access_for("/api/finance/payments");
        assert!(finance.allows(Role::Accountant));
        assert!(finance.allows(Role::Admin));
        assert!(!finance.allows(Role::TourManager));
        assert!(!access_for("/api/client/bookings").allows(Role::Admin));
    }
}
