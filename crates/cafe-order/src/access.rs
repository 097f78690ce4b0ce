//! Authorization rules shared by every order operation.

use cafe_types::{Identity, Role};

pub fn is_admin(identity: &Identity) -> bool {
	identity.role == Role::Admin
}

/// Owners may access their own orders; administrators may access any order.
pub fn can_access_order(identity: &Identity, owner_id: u64) -> bool {
	is_admin(identity) || identity.user_id == owner_id
}
