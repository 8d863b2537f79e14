/// Decides when a repeatedly redelivered work item is considered poison.
#[derive(Debug, Clone, Copy)]
pub struct ReservationPolicy {
    pub error_threshold: u32,
}

impl ReservationPolicy {
    /// Items reserved more than this many times are buried.
    pub const RESERVE_ERROR_THRESHOLD: u32 = 30;

    pub fn new(error_threshold: u32) -> Self {
        Self { error_threshold }
    }

    /// Returns `true` when the item must be buried instead of handled.
    pub fn is_poisoned(&self, reserve_count: u32) -> bool {
        reserve_count > self.error_threshold
    }
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self::new(Self::RESERVE_ERROR_THRESHOLD)
    }
}
