//! Mock staff session for testing.

use crate::providers::CurrentStaff;
use crate::state::StaffMember;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed staff session that counts reads.
#[derive(Debug, Clone, Default)]
pub struct StaticStaffSession {
    staff: Option<StaffMember>,
    reads: Arc<AtomicUsize>,
}

impl StaticStaffSession {
    /// Nobody logged in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// `staff` logged in.
    #[must_use]
    pub fn signed_in(staff: StaffMember) -> Self {
        Self {
            staff: Some(staff),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `current_staff` calls.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl CurrentStaff for StaticStaffSession {
    fn current_staff(&self) -> Option<StaffMember> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.staff.clone()
    }
}
