/// Connection details of a compute cluster, addressed by slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub slug: String,
    pub hostname: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Cluster {
    pub fn rapi_base_url(&self) -> String {
        format!("https://{}:{}", self.hostname, self.port)
    }
}
