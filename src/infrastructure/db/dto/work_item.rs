use crate::domain::entities::work_item::{WorkItem, WorkItemState};
use crate::domain::value_objects::ids::DeliveryId;
use crate::domain::value_objects::timestamps::Timestamp;
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkItemRow {
    pub id: uuid::Uuid,
    pub body: String,
    pub state: String,
    pub reserve_count: i32,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl WorkItemRow {
    /// Build a fresh, ready-to-reserve row for `body`.
    pub fn ready(body: String, now: Timestamp) -> Self {
        Self {
            id: DeliveryId::new().0,
            body,
            state: WorkItemState::Ready.as_str().to_string(),
            reserve_count: 0,
            lease_owner: None,
            lease_expires_at: None,
            created_at: now.as_inner(),
        }
    }

    pub fn into_work_item(self) -> WorkItem {
        WorkItem {
            id: DeliveryId(self.id),
            body: self.body,
            // Unknown states only come from manual edits; treat them as parked.
            state: WorkItemState::parse(&self.state).unwrap_or(WorkItemState::Buried),
            reserve_count: self.reserve_count.max(0) as u32,
            lease_owner: self.lease_owner,
            lease_expires_at: self.lease_expires_at.map(Timestamp::from),
            created_at: Timestamp::from(self.created_at),
        }
    }
}
