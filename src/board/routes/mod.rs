//! HTTP handlers, one module per resource.

pub mod auth;
pub mod issues;
pub mod projects;
pub mod users;

use serde::{Deserialize, Deserializer};
use validator::ValidationError;

use super::code::CodeKind;

/// Keeps an explicit `null` apart from an absent field: absent is `None`,
/// `null` is `Some(None)`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims surrounding whitespace before validation sees the value.
pub(crate) fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

pub(crate) fn trimmed_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|s| s.map(|s| s.trim().to_string()))
}

pub(crate) fn validate_racfids(racfids: &[String]) -> Result<(), ValidationError> {
    match racfids.iter().find(|r| !CodeKind::User.matches(r)) {
        Some(bad) => Err(ValidationError::new("racfid")
            .with_message(format!("{} is not a valid RACFID", bad).into())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        points: Option<Option<u32>>,
    }

    #[test]
    fn test_double_option_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.points, None);
        let null: Patch = serde_json::from_str(r#"{"points": null}"#).unwrap();
        assert_eq!(null.points, Some(None));
        let set: Patch = serde_json::from_str(r#"{"points": 3}"#).unwrap();
        assert_eq!(set.points, Some(Some(3)));
    }

    #[derive(Deserialize)]
    struct Named {
        #[serde(deserialize_with = "trimmed")]
        name: String,
        #[serde(default, deserialize_with = "trimmed_option")]
        nickname: Option<String>,
    }

    #[test]
    fn test_trimmed_strips_whitespace() {
        let named: Named = serde_json::from_str(r#"{"name": "  Ada  "}"#).unwrap();
        assert_eq!(named.name, "Ada");
        assert_eq!(named.nickname, None);
        let blank: Named = serde_json::from_str(r#"{"name": "   ", "nickname": " x "}"#).unwrap();
        assert_eq!(blank.name, "");
        assert_eq!(blank.nickname.as_deref(), Some("x"));
    }

    #[test]
    fn test_validate_racfids() {
        assert!(validate_racfids(&[]).is_ok());
        assert!(validate_racfids(&["J000001".into(), "J123456".into()]).is_ok());
        let err = validate_racfids(&["J000001".into(), "bob".into()]).unwrap_err();
        assert!(err.message.unwrap().contains("bob"));
    }
}
