use crate::catalog;

/// Declarative map from path prefixes to required permissions. Matching is
/// by path segment: `/users` covers `/users` and `/users/42` but not
/// `/users-export`. When several prefixes cover a path the longest wins,
/// so `/api/users` can demand more than `/api`.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    entries: Vec<PolicyEntry>,
}

#[derive(Debug, Clone)]
struct PolicyEntry {
    prefix: String,
    any_of: Vec<String>,
}

impl RoutePolicy {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The built-in gym route table
    pub fn standard() -> Self {
        let mut policy = Self::new();
        for (prefix, required) in catalog::route_policy() {
            policy = policy.require(prefix, required);
        }
        policy
    }

    pub fn require(mut self, prefix: &str, any_of: &[&str]) -> Self {
        self.entries.push(PolicyEntry {
            prefix: prefix.to_string(),
            any_of: any_of.iter().map(|p| (*p).to_string()).collect(),
        });
        self
    }

    /// Permissions required for a path, if any entry covers it
    pub fn required_for(&self, path: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .filter(|entry| prefix_matches(&entry.prefix, path))
            .max_by_key(|entry| entry.prefix.len())
            .map(|entry| entry.any_of.as_slice())
    }

    /// Whether a permission set grants access to a path. Any one of the
    /// required permissions is enough; uncovered paths are allowed.
    pub fn allows(&self, path: &str, permissions: &[String]) -> bool {
        match self.required_for(path) {
            Some(required) => required.iter().any(|r| permissions.contains(r)),
            None => true,
        }
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Segment-boundary prefix match: the path equals the prefix or continues
/// it with a `/`.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_prefix_matches_on_segment_boundary() {
        assert!(prefix_matches("/users", "/users"));
        assert!(prefix_matches("/users", "/users/42"));
        assert!(prefix_matches("/users", "/users/42/sessions"));
        assert!(!prefix_matches("/users", "/users-export"));
        assert!(!prefix_matches("/users", "/user"));
    }

    #[test]
    fn test_uncovered_paths_are_allowed() {
        let policy = RoutePolicy::standard();
        assert!(policy.allows("/dashboard", &[]));
        assert!(policy.allows("/profile", &perms(&["members.view"])));
        assert!(policy.required_for("/dashboard").is_none());
    }

    #[test]
    fn test_any_one_permission_grants_access() {
        let policy = RoutePolicy::standard();
        assert!(policy.allows("/settings", &perms(&["settings.view"])));
        assert!(policy.allows("/settings", &perms(&["settings.edit"])));
        assert!(!policy.allows("/settings", &perms(&["members.view"])));
    }

    #[test]
    fn test_reporting_requires_reports_view() {
        let policy = RoutePolicy::standard();
        assert!(!policy.allows("/reporting", &perms(&["members.view", "plans.view"])));
        assert!(policy.allows("/reporting", &perms(&["reports.view"])));
        assert!(policy.allows("/reporting/monthly", &perms(&["reports.view"])));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let policy = RoutePolicy::new()
            .require("/api", &["members.view"])
            .require("/api/users", &["users.view"]);

        assert!(!policy.allows("/api/users", &perms(&["members.view"])));
        assert!(policy.allows("/api/users/42", &perms(&["users.view"])));
        assert!(policy.allows("/api/members", &perms(&["members.view"])));
    }

    #[test]
    fn test_subpaths_inherit_the_prefix_entry() {
        let policy = RoutePolicy::standard();
        assert!(!policy.allows("/members/42/edit", &[]));
        assert!(policy.allows("/members/42/edit", &perms(&["members.view"])));
        assert_eq!(
            policy.required_for("/api/users/42"),
            Some(perms(&["users.view"]).as_slice())
        );
    }

    #[test]
    fn test_empty_permission_set_is_denied_on_covered_paths() {
        let policy = RoutePolicy::standard();
        assert!(!policy.allows("/users", &[]));
        assert!(!policy.allows("/api/events", &[]));
    }
}
