//! Profile editing.
//!
//! Submitted attributes are validated as a whole. Nothing is written unless
//! every field is valid and at least one value actually changed.

use serde::Deserialize;

use foodcoop_core::Email;

use super::auth::{AuthError, hash_password, validate_password};
use crate::db::{Store, StoreError};
use crate::models::{Group, ProfileUpdate, User};

const MAX_NAME_LENGTH: usize = 100;

/// Profile attributes as submitted. Missing fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileParams {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub contact_address: Option<String>,
}

/// A validation message attached to a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Values and errors for rendering the profile form.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub contact_address: String,
    pub errors: Vec<FieldError>,
}

impl ProfileForm {
    /// The form prefilled with stored values.
    #[must_use]
    pub fn from_user(user: &User, ordergroup: Option<&Group>) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.to_string(),
            phone: user.phone.clone().unwrap_or_default(),
            contact_address: ordergroup
                .and_then(|g| g.contact_address.clone())
                .unwrap_or_default(),
            errors: Vec::new(),
        }
    }

    /// The first error for `field`, if any.
    #[must_use]
    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn add_error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }
}

/// What happened to a profile submission.
#[derive(Debug)]
pub enum ProfileOutcome {
    /// Every submitted value equals the stored one; nothing was written.
    Unchanged,
    /// The changes were persisted.
    Saved(User),
    /// At least one field is invalid; nothing was written.
    Invalid(ProfileForm),
}

/// Errors that abort a profile update.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing error")]
    PasswordHash,
}

/// Profile service.
pub struct ProfileService<'a> {
    store: &'a dyn Store,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Validate and persist a profile submission.
    ///
    /// `contact_address` is only considered when `ordergroup` is given.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` if the store fails or the password cannot be
    /// hashed. Validation problems are reported as
    /// [`ProfileOutcome::Invalid`].
    pub async fn update(
        &self,
        user: &User,
        ordergroup: Option<&Group>,
        params: &ProfileParams,
    ) -> Result<ProfileOutcome, ProfileError> {
        let mut form = ProfileForm::from_user(user, ordergroup);
        apply(&mut form, params, ordergroup.is_some());

        let email = validate(&mut form, params);

        if let Some(email) = &email
            && !email.matches(user.email.as_str())
            && let Some(other) = self.store.find_user_by_email(email.as_str()).await?
            && other.id != user.id
        {
            form.add_error("email", "has already been taken");
        }

        let Some(email) = email.filter(|_| !form.has_errors()) else {
            return Ok(ProfileOutcome::Invalid(form));
        };

        let password_hash = match non_blank(params.password.as_deref()) {
            Some(password) => {
                Some(hash_password(password).map_err(|_| ProfileError::PasswordHash)?)
            }
            None => None,
        };

        let update = ProfileUpdate {
            user_id: user.id,
            first_name: form.first_name.trim().to_owned(),
            last_name: form.last_name.trim().to_owned(),
            email,
            phone: non_blank(Some(&form.phone)).map(str::to_owned),
            password_hash,
            ordergroup_contact: ordergroup.map(|g| {
                (
                    g.id,
                    non_blank(Some(&form.contact_address)).map(str::to_owned),
                )
            }),
        };

        if !changes(user, ordergroup, &update) {
            return Ok(ProfileOutcome::Unchanged);
        }

        match self.store.update_profile(&update).await {
            Ok(saved) => {
                tracing::info!(user_id = %saved.id, "Profile updated");
                Ok(ProfileOutcome::Saved(saved))
            }
            Err(StoreError::Conflict(_)) => {
                form.add_error("email", "has already been taken");
                Ok(ProfileOutcome::Invalid(form))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Overlay submitted values on the stored ones.
fn apply(form: &mut ProfileForm, params: &ProfileParams, has_ordergroup: bool) {
    let fields = [
        (&mut form.first_name, &params.first_name),
        (&mut form.last_name, &params.last_name),
        (&mut form.email, &params.email),
        (&mut form.phone, &params.phone),
    ];
    for (current, submitted) in fields {
        if let Some(value) = submitted {
            value.trim().clone_into(current);
        }
    }
    if has_ordergroup && let Some(value) = &params.contact_address {
        value.trim().clone_into(&mut form.contact_address);
    }
}

/// Record field errors on `form`; returns the parsed email when it is valid.
fn validate(form: &mut ProfileForm, params: &ProfileParams) -> Option<Email> {
    if form.first_name.is_empty() {
        form.add_error("first_name", "can't be blank");
    } else if form.first_name.chars().count() > MAX_NAME_LENGTH {
        form.add_error("first_name", too_long(MAX_NAME_LENGTH));
    }
    if form.last_name.chars().count() > MAX_NAME_LENGTH {
        form.add_error("last_name", too_long(MAX_NAME_LENGTH));
    }

    let email = match Email::parse(&form.email) {
        Ok(email) => Some(email),
        Err(e) => {
            form.add_error("email", e.to_string());
            None
        }
    };

    if let Some(password) = non_blank(params.password.as_deref()) {
        if let Err(AuthError::WeakPassword(message)) = validate_password(password) {
            form.add_error("password", message);
        }
        if params.password_confirmation.as_deref() != Some(password) {
            form.add_error("password_confirmation", "doesn't match password");
        }
    }

    email
}

fn changes(user: &User, ordergroup: Option<&Group>, update: &ProfileUpdate) -> bool {
    let contact_changed = match (ordergroup, &update.ordergroup_contact) {
        (Some(group), Some((_, contact))) => group.contact_address != *contact,
        _ => false,
    };

    update.password_hash.is_some()
        || contact_changed
        || user.first_name != update.first_name
        || user.last_name != update.last_name
        || user.email != update.email
        || user.phone != update.phone
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn too_long(max: usize) -> String {
    format!("is too long (maximum is {max} characters)")
}
