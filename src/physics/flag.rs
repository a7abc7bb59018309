//! Change tracking for network delta sync.

/// Dirty marker for one kinematic field.
///
/// A change arms two independent channels: the full-state channel read by
/// [`DirtyFlag::pop`] and the one-shot channel read by [`DirtyFlag::take_once`].
/// Each read clears only its own channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFlag {
    dirty: bool,
    once: bool,
}

impl DirtyFlag {
    /// A clean flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a real change.
    #[inline]
    pub fn mark(&mut self) {
        self.dirty = true;
        self.once = true;
    }

    /// Whether a change is pending on the full-state channel.
    #[inline]
    pub fn has(&self) -> bool {
        self.dirty
    }

    /// Read and clear the full-state channel.
    #[inline]
    pub fn pop(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Read and clear the one-shot channel.
    #[inline]
    pub fn take_once(&mut self) -> bool {
        std::mem::take(&mut self.once)
    }
}
