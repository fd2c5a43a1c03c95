//! Role based permissions

/// Grants every permission.
pub const WILDCARD: &str = "*";

/// Permissions granted by `role`. Unknown roles grant nothing.
pub fn role_permissions(role: &str) -> &'static [&'static str] {
    match role {
        "admin" => &[WILDCARD],
        "premium" => &["create_restaurant", "market_analysis", "export_data", "api_access"],
        "user" => &["create_restaurant", "basic_analysis"],
        "enterprise" => &[WILDCARD, "team_management", "advanced_analytics"],
        _ => &[],
    }
}

/// Whether `permission` is granted explicitly or by `role`.
pub fn has_permission<S: AsRef<str>>(role: &str, explicit: &[S], permission: &str) -> bool {
    let grants = |granted: &str| granted == WILDCARD || granted == permission;
    explicit.iter().any(|granted| grants(granted.as_ref()))
        || role_permissions(role).iter().any(|granted| grants(granted))
}
