use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Exclusive-start token shared by everything that can launch a game.
///
/// Cloning hands out another handle to the same slot; only one acquisition
/// can be live at a time across all handles.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    active: Arc<AtomicBool>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot. Returns `None` when another session holds it.
    pub fn acquire(&self) -> Option<SessionGuard> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(SessionGuard { slot: self.clone() })
        } else {
            None
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Releases the slot when dropped.
#[derive(Debug)]
pub struct SessionGuard {
    slot: SessionSlot,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.slot.active.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_the_first_releases() {
        let slot = SessionSlot::new();
        let guard = slot.acquire().expect("first acquire");
        assert!(slot.is_active());
        assert!(slot.acquire().is_none());
        assert!(slot.clone().acquire().is_none());

        drop(guard);
        assert!(!slot.is_active());
        assert!(slot.acquire().is_some());
    }
}
