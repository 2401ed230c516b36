use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::user::schema::UserEntity;
use crate::utils::double_option;

pub const SUPPORTED_LANGUAGES: [&str; 7] = ["en", "fr", "de", "es", "it", "ja", "pt"];

fn validate_language(language: &str) -> Result<(), validator::ValidationError> {
    if SUPPORTED_LANGUAGES.contains(&language) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("unsupported_language"))
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpModel {
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters long"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    #[validate(length(min = 1, max = 64, message = "Display name cannot be empty"))]
    pub display_name: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct SignInModel {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserModel {
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters long"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 64, message = "Display name cannot be empty"))]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<Option<String>>,
}

impl UpdateUserModel {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.display_name.is_none()
            && self.avatar_url.is_none()
            && self.bio.is_none()
    }
}

#[derive(Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsModel {
    #[validate(custom(function = "validate_language", message = "Unsupported language"))]
    pub language: Option<String>,
    pub notify_trades: Option<bool>,
    pub notify_messages: Option<bool>,
    pub notify_friends: Option<bool>,
    pub profile_public: Option<bool>,
    pub show_collection: Option<bool>,
}

impl UpdateSettingsModel {
    pub fn is_empty(&self) -> bool {
        self.language.is_none()
            && self.notify_trades.is_none()
            && self.notify_messages.is_none()
            && self.notify_friends.is_none()
            && self.profile_public.is_none()
            && self.show_collection.is_none()
    }
}

#[derive(Deserialize, Validate)]
pub struct SearchUsersQuery {
    #[validate(length(min = 1, max = 64, message = "Query must be 1-64 characters long"))]
    pub q: String,
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<i32>,
}

pub struct InsertUser {
    pub username: String,
    pub email: String,
    pub hash_password: String,
    pub display_name: String,
}

pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<Option<String>>,
    pub bio: Option<Option<String>>,
}

#[derive(Serialize)]
pub struct SignUpResponse {
    pub id: uuid::Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub language: String,
    pub notify_trades: bool,
    pub notify_messages: bool,
    pub notify_friends: bool,
    pub profile_public: bool,
    pub show_collection: bool,
}

impl From<&UserEntity> for UserSettings {
    fn from(entity: &UserEntity) -> Self {
        UserSettings {
            language: entity.language.clone(),
            notify_trades: entity.notify_trades,
            notify_messages: entity.notify_messages,
            notify_friends: entity.notify_friends,
            profile_public: entity.profile_public,
            show_collection: entity.show_collection,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: uuid::Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub settings: UserSettings,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserEntity> for UserResponse {
    fn from(entity: UserEntity) -> Self {
        let settings = UserSettings::from(&entity);
        UserResponse {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            display_name: entity.display_name,
            avatar_url: entity.avatar_url,
            bio: entity.bio,
            settings,
            created_at: entity.created_at,
        }
    }
}

/// What other users get to see.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserResponse {
    pub id: uuid::Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub profile_public: bool,
    pub show_collection: bool,
}

impl From<UserResponse> for PublicUserResponse {
    fn from(user: UserResponse) -> Self {
        PublicUserResponse {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            bio: user.bio,
            profile_public: user.settings.profile_public,
            show_collection: user.settings.show_collection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let model: UpdateUserModel = serde_json::from_str(r#"{"bio":null}"#).unwrap();
        assert_eq!(model.bio, Some(None));
        assert_eq!(model.avatar_url, None);
        assert!(!model.is_empty());

        let empty: UpdateUserModel = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_settings_language_validation() {
        let ok: UpdateSettingsModel = serde_json::from_str(r#"{"language":"fr"}"#).unwrap();
        assert!(ok.validate().is_ok());

        let bad: UpdateSettingsModel = serde_json::from_str(r#"{"language":"xx"}"#).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_sign_up_rejects_short_password() {
        let model: SignUpModel = serde_json::from_str(
            r#"{"username":"ash","email":"ash@pallet.town","password":"123"}"#,
        )
        .unwrap();
        assert!(model.validate().is_err());
    }
}
