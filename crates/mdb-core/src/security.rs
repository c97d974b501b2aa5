use crate::domain::UserId;

// ============== Admin Authorization ==============

/// Admin-only commands check membership here. An empty admin list denies
/// everyone rather than allowing everyone.
pub fn is_admin(user_id: Option<UserId>, admin_ids: &[i64]) -> bool {
    let Some(user_id) = user_id else {
        return false;
    };
    if admin_ids.is_empty() {
        return false;
    }
    admin_ids.contains(&user_id.0)
}
