use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct PortfolioItem {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

impl PortfolioItem {
    pub fn technologies_display(&self) -> String {
        if self.technologies.is_empty() {
            "-".to_string()
        } else {
            self.technologies.join(", ")
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct PortfolioInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technologies_display() {
        let json = r#"{"id": 1, "title": "Site", "technologies": ["Rust", "Vue"]}"#;
        let item: PortfolioItem = serde_json::from_str(json).expect("Failed to parse portfolio test JSON");
        assert_eq!(item.technologies_display(), "Rust, Vue");

        let item = PortfolioItem { technologies: vec![], ..item };
        assert_eq!(item.technologies_display(), "-");
    }
}
