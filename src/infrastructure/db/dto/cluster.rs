use crate::domain::entities::cluster::Cluster;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClusterRow {
    pub slug: String,
    pub hostname: String,
    pub port: i32,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ClusterRow {
    pub fn into_cluster(self) -> Cluster {
        Cluster {
            slug: self.slug,
            hostname: self.hostname,
            port: u16::try_from(self.port).unwrap_or(5080),
            username: self.username.filter(|u| !u.is_empty()),
            password: self.password.filter(|p| !p.is_empty()),
        }
    }
}
