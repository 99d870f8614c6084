//! Deployment-wide settings read once per run.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeploymentSettings {
    /// Root segment of every computed object key.
    pub unique_id: String,
    pub site_url: Option<String>,
}

impl DeploymentSettings {
    /// Prefix a `/ufs/...` path with the site URL when one is known.
    pub fn absolute_url(&self, path: &str) -> String {
        match self.site_url.as_deref().map(|url| url.trim_end_matches('/')) {
            Some(site_url) if !site_url.is_empty() => format!("{}{}", site_url, path),
            _ => path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_url_with_and_without_site_url() {
        let mut settings = DeploymentSettings {
            unique_id: "dep1".to_string(),
            site_url: Some("https://chat.example.com/".to_string()),
        };
        assert_eq!(
            settings.absolute_url("/ufs/AmazonS3:Uploads/f1/a.png"),
            "https://chat.example.com/ufs/AmazonS3:Uploads/f1/a.png"
        );

        settings.site_url = None;
        assert_eq!(
            settings.absolute_url("/ufs/AmazonS3:Uploads/f1/a.png"),
            "/ufs/AmazonS3:Uploads/f1/a.png"
        );
    }
}
