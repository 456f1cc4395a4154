use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds, when the server states one
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_minimal() {
        let resp: LoginResponse = serde_json::from_str(r#"{"access_token": "abc"}"#)
            .expect("Failed to parse login test JSON");
        assert_eq!(resp.access_token, "abc");
        assert_eq!(resp.token_type, None);
        assert_eq!(resp.expires_in, None);
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let json = r#"{"id": 1, "username": "admin", "full_name": "", "is_admin": true}"#;
        let user: User = serde_json::from_str(json).expect("Failed to parse user test JSON");
        assert_eq!(user.display_name(), "admin");
        assert!(user.is_admin);
    }
}
