use serde::{Deserialize, Serialize};

const MAX_NAME_LENGTH: usize = 100;
const MAX_SUBJECT_LENGTH: usize = 200;
const MAX_MESSAGE_LENGTH: usize = 5000;

/// A stored contact form submission (admin view)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Contact form payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

impl NewContactMessage {
    /// Check the form before it is sent. Returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(format!("Name must be at most {} characters", MAX_NAME_LENGTH));
        }
        if !is_plausible_email(self.email.trim()) {
            return Err("A valid email address is required".to_string());
        }
        if let Some(ref subject) = self.subject {
            if subject.chars().count() > MAX_SUBJECT_LENGTH {
                return Err(format!("Subject must be at most {} characters", MAX_SUBJECT_LENGTH));
            }
        }
        let message = self.message.trim();
        if message.is_empty() {
            return Err("Message is required".to_string());
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(format!("Message must be at most {} characters", MAX_MESSAGE_LENGTH));
        }
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
}

/// Body for marking a message read or unread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageStatusUpdate {
    pub is_read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> NewContactMessage {
        NewContactMessage {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            subject: None,
            message: "Hello there".to_string(),
        }
    }

    #[test]
    fn test_valid_message() {
        assert!(message().validate().is_ok());
    }

    #[test]
    fn test_missing_fields() {
        let m = NewContactMessage { name: "  ".into(), ..message() };
        assert_eq!(m.validate().unwrap_err(), "Name is required");

        let m = NewContactMessage { message: String::new(), ..message() };
        assert_eq!(m.validate().unwrap_err(), "Message is required");
    }

    #[test]
    fn test_email_checks() {
        for bad in ["", "ada", "ada@", "@example.com", "ada@example", "ada@.com", "a da@example.com"] {
            let m = NewContactMessage { email: bad.into(), ..message() };
            assert!(m.validate().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_length_limits() {
        let m = NewContactMessage { message: "x".repeat(MAX_MESSAGE_LENGTH + 1), ..message() };
        assert!(m.validate().is_err());

        let m = NewContactMessage { subject: Some("s".repeat(MAX_SUBJECT_LENGTH + 1)), ..message() };
        assert!(m.validate().is_err());
    }
}
