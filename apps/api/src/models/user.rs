use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A candidate profile: free-form JSON that is the source of truth for every
/// claim the resume makes. Only the few fields the renderer needs are typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Value);

/// Contact details shown in the document header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub portfolio: Option<String>,
    pub github: Option<String>,
}

impl UserProfile {
    /// Wraps a JSON value; only objects are valid profiles.
    pub fn from_value(value: Value) -> Option<Self> {
        value.is_object().then_some(Self(value))
    }

    fn personal(&self) -> Option<&Map<String, Value>> {
        ["personal", "personal_info"]
            .iter()
            .find_map(|key| self.0.get(key).and_then(Value::as_object))
    }

    fn personal_field(&self, keys: &[&str]) -> Option<String> {
        let personal = self.personal()?;
        keys.iter()
            .find_map(|key| personal.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn display_name(&self) -> Option<String> {
        self.personal_field(&["name", "full_name"])
    }

    pub fn contact(&self) -> ContactInfo {
        ContactInfo {
            phone: self.personal_field(&["phone"]),
            email: self.personal_field(&["email"]),
            linkedin: self.personal_field(&["linkedin"]),
            portfolio: self.personal_field(&["portfolio", "website"]),
            github: self.personal_field(&["github"]),
        }
    }

    /// Repository link for a project, matched by title or name (case-insensitive).
    pub fn project_link(&self, title: &str) -> Option<String> {
        let wanted = title.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        let projects: Vec<&Value> = match self.0.get("projects")? {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => map.values().collect(),
            _ => return None,
        };

        projects
            .into_iter()
            .filter(|p| {
                ["title", "name"].iter().any(|key| {
                    p.get(*key)
                        .and_then(Value::as_str)
                        .is_some_and(|t| t.trim().to_lowercase() == wanted)
                })
            })
            .find_map(|p| {
                ["github", "url", "link"]
                    .iter()
                    .find_map(|key| p.get(*key).and_then(Value::as_str))
                    .map(str::to_string)
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn profile() -> UserProfile {
        UserProfile::from_value(json!({
            "personal": {
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "phone": "+1 555 0100",
                "github": "https://github.com/ada"
            },
            "projects": [
                {"name": "Analytical Engine", "github": "https://github.com/ada/engine"},
                {"title": "Notes", "url": "https://example.com/notes"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_only_objects_are_profiles() {
        assert!(UserProfile::from_value(json!([1, 2])).is_none());
        assert!(UserProfile::from_value(json!("text")).is_none());
    }

    #[test]
    fn test_contact_and_name() {
        let profile = profile();
        assert_eq!(profile.display_name().as_deref(), Some("Ada Lovelace"));
        let contact = profile.contact();
        assert_eq!(contact.email.as_deref(), Some("ada@example.com"));
        assert_eq!(contact.linkedin, None);
    }

    #[test]
    fn test_personal_info_key_is_supported() {
        let profile =
            UserProfile::from_value(json!({"personal_info": {"name": "Grace"}})).unwrap();
        assert_eq!(profile.display_name().as_deref(), Some("Grace"));
    }

    #[test]
    fn test_project_link_lookup() {
        let profile = profile();
        assert_eq!(
            profile.project_link("analytical engine").as_deref(),
            Some("https://github.com/ada/engine")
        );
        assert_eq!(
            profile.project_link("Notes").as_deref(),
            Some("https://example.com/notes")
        );
        assert_eq!(profile.project_link("Unknown"), None);
    }
}
