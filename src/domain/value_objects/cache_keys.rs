//! Cache key layout shared with the portal front end.

/// Key of the JSON map of instance name -> lock reason.
pub const LOCKED_INSTANCES: &str = "locked_instances";

/// Glob matching every per-user instance list.
pub const USER_INSTANCE_INDEX_PATTERN: &str = "user:*:index:instances";

/// TTL of an instance lock; refreshed on every poll cycle while a wait is live.
pub const LOCK_TTL_SECONDS: u64 = 30;

pub fn instance_lock_key(cluster_slug: &str, instance: &str) -> String {
    format!("cluster:{cluster_slug}:instance:{instance}:lock")
}

pub fn instance_cache_key(cluster_slug: &str, instance: &str) -> String {
    format!("cluster:{cluster_slug}:instance:{instance}")
}

pub fn cluster_instances_key(cluster_slug: &str) -> String {
    format!("cluster:{cluster_slug}:instances")
}

pub fn user_instances_key(username: &str) -> String {
    format!("user:{username}:index:instances")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_cluster_and_instance_when_building_keys_should_nest_under_cluster() {
        assert_eq!(
            instance_lock_key("athens", "vm1.example.org"),
            "cluster:athens:instance:vm1.example.org:lock"
        );
        assert_eq!(
            instance_cache_key("athens", "vm1.example.org"),
            "cluster:athens:instance:vm1.example.org"
        );
        assert_eq!(cluster_instances_key("athens"), "cluster:athens:instances");
    }

    #[test]
    fn given_username_when_building_index_key_should_match_index_pattern() {
        let key = user_instances_key("alice");
        assert_eq!(key, "user:alice:index:instances");
        assert!(USER_INSTANCE_INDEX_PATTERN.starts_with("user:"));
        assert!(key.ends_with(":index:instances"));
    }
}
