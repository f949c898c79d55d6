use users_sdk::{Role, User};

/// Counts behind the dashboard statistics cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub admins: usize,
    pub managers: usize,
    pub employees: usize,
    pub contractors: usize,
    /// Users whose role the client does not recognise
    pub unknown_role: usize,
}

impl UserStats {
    #[must_use]
    pub fn from_users(users: &[User]) -> Self {
        users.iter().fold(Self::default(), |mut stats, user| {
            stats.total += 1;
            if user.is_active {
                stats.active += 1;
            } else {
                stats.inactive += 1;
            }
            match user.role {
                Role::Admin => stats.admins += 1,
                Role::Manager => stats.managers += 1,
                Role::Employee => stats.employees += 1,
                Role::Contractor => stats.contractors += 1,
                Role::Unknown => stats.unknown_role += 1,
            }
            stats
        })
    }

    #[must_use]
    pub fn count_for(&self, role: Role) -> usize {
        match role {
            Role::Admin => self.admins,
            Role::Manager => self.managers,
            Role::Employee => self.employees,
            Role::Contractor => self.contractors,
            Role::Unknown => self.unknown_role,
        }
    }
}
