use crate::domain::entities::application::Application;
use crate::domain::entities::cluster_job::JobStatus;

/// Rendered subject and body of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub subject: String,
    pub body: String,
}

/// Portal page of an instance.
pub fn instance_url(base_url: &str, cluster_slug: &str, hostname: &str) -> String {
    format!(
        "{}/cluster/{}/{}/",
        base_url.trim_end_matches('/'),
        cluster_slug,
        hostname
    )
}

pub fn instance_ready(application: &Application, cluster_slug: &str, url: &str) -> Mail {
    Mail {
        subject: format!("Instance {} is ready", application.hostname),
        body: format!(
            "Dear {},\n\n\
             Your virtual machine {} has been created on cluster {} and is now ready.\n\n\
             You can manage it at:\n{}\n",
            application.applicant.username, application.hostname, cluster_slug, url
        ),
    }
}

pub fn creation_failure(application: &Application, cluster_hostname: &str, status: &JobStatus) -> Mail {
    Mail {
        subject: format!(
            "Instance creation failure for {} on {}",
            application.hostname, cluster_hostname
        ),
        body: status.to_pretty_json(),
    }
}

/// Operator notice for an item that can never be processed.
pub fn poisoned_creation(application_id: i64, reason: &str) -> Mail {
    Mail {
        subject: format!("Instance creation watcher gave up on application #{application_id}"),
        body: format!(
            "The creation work item for application #{application_id} was buried: {reason}.\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::application::{Applicant, ApplicationStatus};
    use crate::domain::value_objects::ids::{ApplicationId, ClusterJobId};

    fn application() -> Application {
        Application {
            id: ApplicationId(42),
            hostname: "vm1.example.org".to_string(),
            job_id: Some(ClusterJobId(1001)),
            status: ApplicationStatus::Submitted,
            backend_message: None,
            applicant: Applicant {
                username: "alice".to_string(),
                email: "alice@example.org".to_string(),
            },
            cluster: Some("athens".to_string()),
            reviewer: None,
        }
    }

    #[test]
    fn given_base_url_with_slash_when_linking_should_not_double_it() {
        assert_eq!(
            instance_url("https://portal.example.org/", "athens", "vm1.example.org"),
            "https://portal.example.org/cluster/athens/vm1.example.org/"
        );
    }

    #[test]
    fn given_ready_instance_when_rendered_should_include_link() {
        let mail = instance_ready(&application(), "athens", "https://p/cluster/athens/vm1/");
        assert_eq!(mail.subject, "Instance vm1.example.org is ready");
        assert!(mail.body.contains("https://p/cluster/athens/vm1/"));
        assert!(mail.body.contains("alice"));
    }

    #[test]
    fn given_failed_job_when_rendered_should_carry_job_detail() {
        let status = JobStatus {
            end_ts: Some(serde_json::json!(1)),
            status: "error".to_string(),
            opresult: serde_json::json!("disk full"),
        };
        let mail = creation_failure(&application(), "ganeti.example.org", &status);
        assert_eq!(
            mail.subject,
            "Instance creation failure for vm1.example.org on ganeti.example.org"
        );
        assert!(mail.body.contains("disk full"));
    }
}
