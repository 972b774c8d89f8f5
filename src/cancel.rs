//! Cooperative cancellation shared between the caller and scale tasks.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag; tasks poll it between voxel rows.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::CancelToken;

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let seen_by_task = token.clone();
        assert!(!seen_by_task.is_cancelled());
        token.cancel();
        assert!(seen_by_task.is_cancelled());
    }
}
