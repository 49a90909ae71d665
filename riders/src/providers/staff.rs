//! Staff session context.

use crate::state::StaffMember;
use std::sync::{Arc, RwLock};

/// Read-only access to the authenticated staff member.
pub trait CurrentStaff: Send + Sync {
    /// The staff member operating the desk, if logged in.
    fn current_staff(&self) -> Option<StaffMember>;
}

/// Staff session shared between the desk and whatever authenticates staff.
///
/// Resolved once at startup and updated when the back office reports the
/// session as expired. Clones share the same session.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    staff: Arc<RwLock<Option<StaffMember>>>,
}

impl SessionContext {
    /// Context with nobody logged in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for `staff`.
    #[must_use]
    pub fn signed_in(staff: StaffMember) -> Self {
        Self {
            staff: Arc::new(RwLock::new(Some(staff))),
        }
    }

    /// Replace the logged-in staff member.
    pub fn set_staff(&self, staff: Option<StaffMember>) {
        if let Ok(mut guard) = self.staff.write() {
            *guard = staff;
        }
    }

    /// Forget the staff member (session expired).
    pub fn sign_out(&self) {
        self.set_staff(None);
    }
}

impl CurrentStaff for SessionContext {
    fn current_staff(&self) -> Option<StaffMember> {
        self.staff.read().ok().and_then(|guard| guard.clone())
    }
}
