use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, Secret};
use tracing::instrument;
use uuid::Uuid;

use crate::dao::UserStore;
use crate::errors::{StorageError, UserError};
use crate::model::user::{NewUser, ProfileUpdate, SignUpRequest, User};
use crate::services::password::{encode_password, verify_password};

pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+91[-\s]?)?[6-9]\d{9}$").expect("valid phone regex"));

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Register a new account, interests become the feed preference
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<User, UserError> {
        let first_name = required("first name", &request.first_name)?;
        let last_name = required("last name", &request.last_name)?;

        let email = request.email.trim().to_lowercase();
        if !EMAIL.is_match(&email) {
            return Err(UserError::Validation("invalid email address".into()));
        }

        let phone = request.phone.trim();
        if !PHONE.is_match(phone) {
            return Err(UserError::Validation("invalid phone number".into()));
        }
        let phone = normalize_phone(phone);

        check_password_strength(&request.password)?;

        let user = NewUser {
            first_name,
            last_name,
            email,
            phone,
            password_hash: encode_password(&request.password)?,
            date_of_birth: request.date_of_birth,
            preference: clean_tags(&request.interests),
        };

        match self.users.insert(user).await {
            Ok(user) => {
                tracing::info!("Account {} created", user.id);
                Ok(user)
            }
            Err(StorageError::Duplicate) => Err(UserError::AccountExists),
            Err(e) => Err(e.into()),
        }
    }

    /// Find the account behind a login id, either an email or a phone number, and check the
    /// password
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        login: &str,
        password: &Secret<String>,
    ) -> Result<User, UserError> {
        let login = login.trim();
        let user = if login.contains('@') {
            self.users.find_by_email(&login.to_lowercase()).await?
        } else {
            self.users.find_by_phone(&normalize_phone(login)).await?
        };

        let user = user.ok_or(UserError::AccountNotFound)?;
        if !verify_password(&user.password, password) {
            return Err(UserError::InvalidCredentials);
        }

        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<User, UserError> {
        self.users
            .get(user_id)
            .await?
            .ok_or(UserError::AccountNotFound)
    }

    #[instrument(skip(self))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<User, UserError> {
        let update = ProfileUpdate {
            first_name: required("first name", &update.first_name)?,
            last_name: required("last name", &update.last_name)?,
            preference: clean_tags(&update.preference),
        };

        if !self.users.update_profile(user_id, update).await? {
            return Err(UserError::AccountNotFound);
        }

        self.profile(user_id).await
    }

    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &Secret<String>,
        new_password: &Secret<String>,
    ) -> Result<(), UserError> {
        let user = self.profile(user_id).await?;
        if !verify_password(&user.password, current_password) {
            return Err(UserError::InvalidPassword);
        }

        check_password_strength(new_password)?;
        let hash = encode_password(new_password)?;

        if self.users.update_password(user_id, hash).await? {
            Ok(())
        } else {
            Err(UserError::AccountNotFound)
        }
    }
}

fn required(field: &str, value: &str) -> Result<String, UserError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(UserError::Validation(format!("{field} is required")));
    }

    Ok(value.to_owned())
}

/// Phone numbers are stored as their ten national digits, without the +91 prefix
fn normalize_phone(phone: &str) -> String {
    let phone = phone.trim();
    match phone.strip_prefix("+91") {
        Some(national) => national
            .strip_prefix(|c: char| c == '-' || c.is_whitespace())
            .unwrap_or(national)
            .to_owned(),
        None => phone.to_owned(),
    }
}

fn check_password_strength(password: &Secret<String>) -> Result<(), UserError> {
    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    Ok(())
}

/// Trimmed, non blank, without duplicates, in the original order
fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().map(|tag| tag.trim()) {
        if !tag.is_empty() && !cleaned.iter().any(|known| known == tag) {
            cleaned.push(tag.to_owned());
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_numbers() {
        assert!(PHONE.is_match("9876543210"));
        assert!(PHONE.is_match("+91 9876543210"));
        assert!(PHONE.is_match("+91-9876543210"));
        assert!(!PHONE.is_match("1234567890"));
        assert!(!PHONE.is_match("98765"));
    }

    #[test]
    fn phone_numbers_are_stored_without_prefix() {
        assert_eq!(normalize_phone("9876543210"), "9876543210");
        assert_eq!(normalize_phone(" +91 9876543210 "), "9876543210");
        assert_eq!(normalize_phone("+91-9876543210"), "9876543210");
        assert_eq!(normalize_phone("+919876543210"), "9876543210");
    }

    #[test]
    fn emails() {
        assert!(EMAIL.is_match("jane@example.com"));
        assert!(!EMAIL.is_match("jane@example"));
        assert!(!EMAIL.is_match("jane doe@example.com"));
    }

    #[test]
    fn tags_are_cleaned() {
        let tags = vec![" tech ".to_owned(), "".to_owned(), "tech".to_owned(), "news".to_owned()];

        assert_eq!(clean_tags(&tags), vec!["tech", "news"]);
    }

    #[test]
    fn short_passwords_are_refused() {
        assert!(check_password_strength(&Secret::new("short".to_owned())).is_err());
        assert!(check_password_strength(&Secret::new("long enough".to_owned())).is_ok());
    }
}
