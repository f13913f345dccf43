use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub is_admin: bool,
}

/// Who is performing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    pub fn customer(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Customers may only act on their own records; admins on any.
    pub fn may_access(&self, owner_id: Uuid) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}
