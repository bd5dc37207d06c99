use crate::notify::{Notification, Toaster};
use crate::startup::StartupRoute;
use command_bridge::{CommandBridge, CommandError};
use doc_model::{NewUser, UserStatus};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

pub const NAME_REQUIRED: &str = "Name is required";
pub const NAME_TOO_SHORT: &str = "Name must be at least 2 characters";
pub const NAME_TOO_LONG: &str = "Name must be at most 30 characters";
pub const EMAIL_REQUIRED: &str = "Email is required";
pub const EMAIL_INVALID: &str = "Invalid email address";

pub const ACCOUNT_CREATED: &str = "Account created";
pub const ACCOUNT_CREATED_DESCRIPTION: &str = "Your account has been created successfully";
pub const ACCOUNT_FAILED: &str = "An error occurred";
pub const ACCOUNT_FAILED_DESCRIPTION: &str =
    "An error occurred while creating your account. Please try again";

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 30;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OnboardingField {
    Name,
    Email,
}

pub type OnboardingErrors = BTreeMap<OnboardingField, String>;

#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("invalid profile: {0:?}")]
    Validation(OnboardingErrors),

    #[error("backend refused the account: {0}")]
    Command(#[from] CommandError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnboardingForm {
    pub name: String,
    pub email: String,
    pub available_days: Vec<String>,
    pub interests: Vec<String>,
}

impl OnboardingForm {
    pub fn validate(&self) -> Result<NewUser, OnboardingErrors> {
        let mut errors = OnboardingErrors::new();

        let name = self.name.trim();
        let name_len = name.chars().count();
        if name.is_empty() {
            errors.insert(OnboardingField::Name, NAME_REQUIRED.to_string());
        } else if name_len < NAME_MIN {
            errors.insert(OnboardingField::Name, NAME_TOO_SHORT.to_string());
        } else if name_len > NAME_MAX {
            errors.insert(OnboardingField::Name, NAME_TOO_LONG.to_string());
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.insert(OnboardingField::Email, EMAIL_REQUIRED.to_string());
        } else if !EMAIL.is_match(email) {
            errors.insert(OnboardingField::Email, EMAIL_INVALID.to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewUser {
            name: name.to_string(),
            email: Some(email.to_string()),
            status: UserStatus::Active,
            available_days: self.available_days.clone(),
            interests: self.interests.clone(),
        })
    }

    /// Creates the account. The form is left untouched so a failed attempt
    /// can be retried as is.
    pub async fn submit(
        &self,
        bridge: &dyn CommandBridge,
        toaster: &Toaster,
    ) -> Result<StartupRoute, OnboardingError> {
        let user = self.validate().map_err(OnboardingError::Validation)?;

        match bridge.create_user(&user).await {
            Ok(()) => {
                info!(name = %user.name, "created account");
                toaster.push(Notification::success(ACCOUNT_CREATED, ACCOUNT_CREATED_DESCRIPTION));
                Ok(StartupRoute::Library)
            }
            Err(err) => {
                toaster.push(Notification::error(ACCOUNT_FAILED, ACCOUNT_FAILED_DESCRIPTION));
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ToastVariant;
    use crate::testing::{Reply, ScriptedBridge};

    fn form(name: &str, email: &str) -> OnboardingForm {
        OnboardingForm {
            name: name.to_string(),
            email: email.to_string(),
            available_days: vec!["monday".to_string(), "friday".to_string()],
            interests: vec!["history".to_string()],
        }
    }

    #[test]
    fn empty_form_requires_name_and_email() {
        let errors = OnboardingForm::default().validate().expect_err("empty form is invalid");

        assert_eq!(errors[&OnboardingField::Name], NAME_REQUIRED);
        assert_eq!(errors[&OnboardingField::Email], EMAIL_REQUIRED);
    }

    #[test]
    fn name_length_is_bounded() {
        let short = form("A", "a@b.io").validate().expect_err("one character");
        assert_eq!(short[&OnboardingField::Name], NAME_TOO_SHORT);

        let long = form(&"x".repeat(31), "a@b.io").validate().expect_err("31 characters");
        assert_eq!(long[&OnboardingField::Name], NAME_TOO_LONG);

        assert!(form(&"x".repeat(30), "a@b.io").validate().is_ok());
        assert!(form("Jo", "a@b.io").validate().is_ok());
    }

    #[test]
    fn malformed_email_is_rejected() {
        for email in ["plain", "no-domain@", "two@@signs.com", "space in@mail.com"] {
            let errors = form("Ada", email).validate().expect_err("invalid email");
            assert_eq!(errors[&OnboardingField::Email], EMAIL_INVALID, "{email}");
        }
    }

    #[test]
    fn valid_form_builds_an_active_user() {
        let user = form(" Ada ", "ada@example.com").validate().expect("valid form");

        assert_eq!(user.name, "Ada");
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.available_days, ["monday", "friday"]);
    }

    #[tokio::test]
    async fn successful_submit_routes_to_library() {
        let bridge = ScriptedBridge::new();
        let toaster = Toaster::new();

        let route = form("Ada", "ada@example.com")
            .submit(bridge.as_ref(), &toaster)
            .await
            .expect("account is created");

        assert_eq!(route, StartupRoute::Library);
        assert_eq!(bridge.users().len(), 1);
        assert_eq!(toaster.last().map(|toast| toast.title), Some(ACCOUNT_CREATED.to_string()));
    }

    #[tokio::test]
    async fn rejected_submit_shows_error_and_keeps_values() {
        let bridge = ScriptedBridge::with_replies([Reply::Reject("email already used")]);
        let toaster = Toaster::new();
        let form = form("Ada", "ada@example.com");

        let err = form.submit(bridge.as_ref(), &toaster).await.expect_err("backend rejects");

        assert!(matches!(err, OnboardingError::Command(CommandError::Rejected(ref m)) if m == "email already used"));
        assert_eq!(form.name, "Ada");
        let toast = toaster.last().expect("error toast");
        assert_eq!(toast.variant, ToastVariant::Destructive);
        assert_eq!(toast.title, ACCOUNT_FAILED);
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_backend() {
        let bridge = ScriptedBridge::new();

        let err = form("A", "nope").submit(bridge.as_ref(), &Toaster::new()).await;

        assert!(matches!(err, Err(OnboardingError::Validation(ref errors)) if errors.len() == 2));
        assert!(bridge.users().is_empty());
    }
}
