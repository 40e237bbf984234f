use gymdesk_models::{NewPermission, UserRole};

/// The full permission catalog as (name, category, description). Names are
/// stable identifiers referenced by the route policy and the handlers;
/// renaming one is a breaking change for both.
const CATALOG: &[(&str, &str, &str)] = &[
    // Staff account administration
    ("users.view", "users", "View staff accounts"),
    ("users.create", "users", "Create staff accounts"),
    ("users.edit", "users", "Edit staff accounts"),
    ("users.delete", "users", "Deactivate staff accounts"),
    // Gym members
    ("members.view", "members", "View gym members"),
    ("members.create", "members", "Register gym members"),
    ("members.edit", "members", "Edit gym member details"),
    ("members.delete", "members", "Remove gym members"),
    // Membership plans
    ("plans.view", "plans", "View membership plans"),
    ("plans.create", "plans", "Create membership plans"),
    ("plans.edit", "plans", "Edit membership plans"),
    ("plans.delete", "plans", "Delete membership plans"),
    // Member subscriptions
    ("memberships.view", "memberships", "View member subscriptions"),
    ("memberships.create", "memberships", "Enroll members in plans"),
    ("memberships.edit", "memberships", "Edit member subscriptions"),
    ("memberships.delete", "memberships", "Cancel member subscriptions"),
    // Money in
    ("payments.view", "payments", "View recorded payments"),
    ("payments.create", "payments", "Record payments"),
    ("payments.edit", "payments", "Edit recorded payments"),
    ("payments.delete", "payments", "Void recorded payments"),
    // Money out
    ("expenses.view", "expenses", "View recorded expenses"),
    ("expenses.create", "expenses", "Record expenses"),
    ("expenses.edit", "expenses", "Edit recorded expenses"),
    ("expenses.delete", "expenses", "Delete recorded expenses"),
    // Reporting
    ("reports.view", "reports", "View financial and attendance reports"),
    // Gym settings
    ("settings.view", "settings", "View gym settings and security events"),
    ("settings.edit", "settings", "Edit gym settings"),
];

/// The trainer's subset: front desk work on members and their
/// subscriptions, read-only on plans. No money, no reports, no settings.
const TRAINER_GRANTS: &[&str] = &[
    "members.view",
    "members.create",
    "members.edit",
    "memberships.view",
    "memberships.create",
    "memberships.edit",
    "plans.view",
];

/// Route policy table as (path prefix, required permissions). A user needs
/// ANY one of the listed permissions. Paths without an entry are open to
/// every authenticated user.
const ROUTE_POLICY: &[(&str, &[&str])] = &[
    ("/users", &["users.view"]),
    ("/api/users", &["users.view"]),
    ("/members", &["members.view"]),
    ("/api/members", &["members.view"]),
    ("/plans", &["plans.view"]),
    ("/api/plans", &["plans.view"]),
    ("/memberships", &["memberships.view"]),
    ("/api/memberships", &["memberships.view"]),
    ("/payments", &["payments.view"]),
    ("/api/payments", &["payments.view"]),
    ("/expenses", &["expenses.view"]),
    ("/api/expenses", &["expenses.view"]),
    ("/reporting", &["reports.view"]),
    ("/settings", &["settings.view", "settings.edit"]),
    ("/api/events", &["settings.view"]),
];

/// Every catalog entry, ready for seeding
pub fn all_permissions() -> Vec<NewPermission> {
    CATALOG
        .iter()
        .map(|(name, category, description)| NewPermission {
            name: (*name).to_string(),
            category: (*category).to_string(),
            description: Some((*description).to_string()),
        })
        .collect()
}

/// Permission names a role is granted. Members authenticate but hold no
/// staff permissions; their routes have no policy entries.
pub fn grants_for(role: UserRole) -> Vec<&'static str> {
    match role {
        UserRole::Admin => CATALOG.iter().map(|(name, _, _)| *name).collect(),
        UserRole::Trainer => TRAINER_GRANTS.to_vec(),
        UserRole::Member => Vec::new(),
    }
}

pub fn route_policy() -> &'static [(&'static str, &'static [&'static str])] {
    ROUTE_POLICY
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_names_are_unique() {
        let names: HashSet<_> = CATALOG.iter().map(|(name, _, _)| *name).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn grants_reference_real_permissions() {
        let names: HashSet<_> = CATALOG.iter().map(|(name, _, _)| *name).collect();
        for role in [UserRole::Admin, UserRole::Trainer, UserRole::Member] {
            for grant in grants_for(role) {
                assert!(names.contains(grant), "unknown permission {}", grant);
            }
        }
    }

    #[test]
    fn route_policy_references_real_permissions() {
        let names: HashSet<_> = CATALOG.iter().map(|(name, _, _)| *name).collect();
        for (prefix, required) in route_policy() {
            assert!(!required.is_empty(), "empty requirement for {}", prefix);
            for name in *required {
                assert!(names.contains(name), "unknown permission {}", name);
            }
        }
    }

    #[test]
    fn admin_holds_every_permission() {
        assert_eq!(grants_for(UserRole::Admin).len(), CATALOG.len());
    }

    #[test]
    fn trainer_cannot_touch_money_or_settings() {
        let grants = grants_for(UserRole::Trainer);
        assert!(grants.contains(&"members.edit"));
        assert!(grants.contains(&"plans.view"));
        assert!(!grants.iter().any(|g| g.starts_with("payments.")));
        assert!(!grants.iter().any(|g| g.starts_with("expenses.")));
        assert!(!grants.iter().any(|g| g.starts_with("settings.")));
        assert!(!grants.iter().any(|g| g.starts_with("users.")));
        assert!(!grants.contains(&"reports.view"));
    }

    #[test]
    fn members_hold_nothing() {
        assert!(grants_for(UserRole::Member).is_empty());
    }
}
