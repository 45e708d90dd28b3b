/// Last version delivered to one subscription.
///
/// Each subscription owns its tracker, so two watches on the same key keep
/// independent cursors. `None` means no baseline has been established yet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VersionTracker {
    version: Option<u64>,
}

impl VersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<u64> {
        self.version
    }

    pub fn set(
        &mut self,
        version: u64,
    ) {
        self.version = Some(version);
    }

    /// Forgets the baseline; the next poll re-initializes it.
    pub fn reset(&mut self) {
        self.version = None;
    }
}
