use time::{Duration, OffsetDateTime, UtcOffset};

/// A UTC instant used for leases and ledger bookkeeping.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Timestamp(pub OffsetDateTime);

impl Timestamp {
    pub fn now_utc() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn from(dt: OffsetDateTime) -> Self {
        Self(dt.to_offset(UtcOffset::UTC))
    }

    /// Returns the instant `duration` after this one.
    pub fn after(&self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }

    /// Time elapsed between `earlier` and this instant, clamped at zero.
    pub fn since(&self, earlier: Timestamp) -> Duration {
        (self.0 - earlier.0).max(Duration::ZERO)
    }

    pub fn as_inner(&self) -> OffsetDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_from_with_non_utc_offset_when_called_should_store_same_instant_in_utc() {
        let offset = UtcOffset::from_hms(2, 0, 0).expect("valid offset");
        let dt = OffsetDateTime::now_utc().to_offset(offset);
        let result = Timestamp::from(dt);
        assert_eq!(result.as_inner().offset(), UtcOffset::UTC);
        assert_eq!(result.as_inner().unix_timestamp(), dt.unix_timestamp());
    }

    #[test]
    fn given_lease_duration_when_after_called_should_move_forward() {
        let now = Timestamp::now_utc();
        let expires = now.after(Duration::seconds(120));
        assert_eq!(expires.since(now), Duration::seconds(120));
    }

    #[test]
    fn given_later_reference_when_since_called_should_clamp_to_zero() {
        let now = Timestamp::now_utc();
        let later = now.after(Duration::seconds(5));
        assert_eq!(now.since(later), Duration::ZERO);
    }
}
