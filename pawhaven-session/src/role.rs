//! Role Resolver

use pawhaven_core::{User, ADMIN_ROLE};

/// Admin capability: a present user whose role is `admin`, ignoring case
///
/// Always call this on the current user; the result is never stored.
pub fn is_admin(user: Option<&User>) -> bool {
    user.is_some_and(|user| user.role.eq_ignore_ascii_case(ADMIN_ROLE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: &str) -> User {
        User::new("u1", "Mia", "mia@example.com").with_role(role)
    }

    #[test]
    fn test_admin_roles() {
        assert!(is_admin(Some(&user_with_role("admin"))));
        assert!(is_admin(Some(&user_with_role("Admin"))));
        assert!(is_admin(Some(&user_with_role("ADMIN"))));
    }

    #[test]
    fn test_non_admin_roles() {
        assert!(!is_admin(Some(&user_with_role("user"))));
        assert!(!is_admin(Some(&user_with_role("administrator"))));
        assert!(!is_admin(Some(&user_with_role(""))));
        assert!(!is_admin(Some(&user_with_role(" admin "))));
        assert!(!is_admin(Some(&user_with_role("admin\n"))));
        assert!(!is_admin(None));
    }
}
