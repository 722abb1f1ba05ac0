use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::{ApiError, FieldErrors},
    models::{NewPost, NewProfile, PostPayload, PostUpdate, ProfilePayload, ProfileUpdate, UserPayload},
};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const DEFAULT_COUNTRY: &str = "India";
pub const IMAGE_PREFIX: &str = "images/";

pub const USERNAME_MAX: usize = 150;
pub const NAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 254;
pub const PASSWORD_MIN: usize = 5;
pub const TITLE_MAX: usize = 255;
pub const COUNTRY_MAX: usize = 255;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// WriteMode
///
/// `Create` (POST) and `Replace` (PUT) insist on required fields. `Partial` (PATCH)
/// validates only what is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Replace,
    Partial,
}

impl WriteMode {
    fn requires_all(self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

fn max_length(n: usize) -> String {
    format!("Ensure this field has no more than {} characters.", n)
}

fn min_length(n: usize) -> String {
    format!("Ensure this field has at least {} characters.", n)
}

/// Trims and checks a required text field. Returns the cleaned value when it passes.
fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    mode: WriteMode,
    max: Option<usize>,
) -> Option<String> {
    let Some(value) = value else {
        if mode.requires_all() {
            errors.add(field, REQUIRED);
        }
        return None;
    };
    let value = value.trim().to_string();
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if let Some(max) = max {
        if value.chars().count() > max {
            errors.add(field, max_length(max));
            return None;
        }
    }
    Some(value)
}

/// Blank is fine for optional text; only the length is bounded.
fn optional_text(errors: &mut FieldErrors, field: &str, value: Option<String>, max: usize) -> Option<String> {
    let value = value?.trim().to_string();
    if value.chars().count() > max {
        errors.add(field, max_length(max));
        return None;
    }
    Some(value)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

impl UserPayload {
    /// Checks and normalises a user body. The password stays in plaintext here; the
    /// handler hashes it before anything reaches the store.
    pub fn validate(self, mode: WriteMode) -> Result<UserPayload, ApiError> {
        let mut errors = FieldErrors::new();

        let username = required_text(&mut errors, "username", self.username, mode, Some(USERNAME_MAX));
        if let Some(name) = &username {
            if !USERNAME_RE.is_match(name) {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            }
        }

        // Passwords are taken verbatim, whitespace included.
        let password = match self.password {
            None => {
                if mode.requires_all() {
                    errors.add("password", REQUIRED);
                }
                None
            }
            Some(p) if p.is_empty() => {
                errors.add("password", BLANK);
                None
            }
            Some(p) if p.chars().count() < PASSWORD_MIN => {
                errors.add("password", min_length(PASSWORD_MIN));
                None
            }
            Some(p) => Some(p),
        };

        let first_name = optional_text(&mut errors, "first_name", self.first_name, NAME_MAX);
        let last_name = optional_text(&mut errors, "last_name", self.last_name, NAME_MAX);

        let email = optional_text(&mut errors, "email", self.email, EMAIL_MAX);
        if let Some(email) = &email {
            if !email.is_empty() && !is_valid_email(email) {
                errors.add("email", "Enter a valid email address.");
            }
        }

        errors.into_result(UserPayload {
            username,
            password,
            first_name,
            last_name,
            email,
        })
    }
}

impl PostPayload {
    /// Produces the column changes for a post. With `Create` or `Replace` the title and
    /// description are guaranteed to be present in the result.
    pub fn validate(self, mode: WriteMode) -> Result<PostUpdate, ApiError> {
        let mut errors = FieldErrors::new();

        let title = required_text(&mut errors, "title", self.title, mode, Some(TITLE_MAX));
        let description = required_text(&mut errors, "description", self.description, mode, None);

        let image = match self.image.map(|key| key.trim().to_string()) {
            None => None,
            Some(key) if key.is_empty() => Some(None),
            Some(key) => {
                let name = key.strip_prefix(IMAGE_PREFIX).unwrap_or_default();
                if name.is_empty() || key.contains("..") || key.starts_with('/') {
                    errors.add("image", "Image must be a key returned by the upload endpoint.");
                    None
                } else {
                    Some(Some(key))
                }
            }
        };

        errors.into_result(PostUpdate {
            title,
            description,
            image,
        })
    }

    pub fn into_new_post(self) -> Result<NewPost, ApiError> {
        let valid = self.validate(WriteMode::Create)?;
        Ok(NewPost {
            title: valid.title.unwrap_or_default(),
            description: valid.description.unwrap_or_default(),
            image: valid.image.flatten(),
        })
    }
}

impl ProfilePayload {
    pub fn validate(self, mode: WriteMode) -> Result<ProfileUpdate, ApiError> {
        let mut errors = FieldErrors::new();

        let aboutme = required_text(&mut errors, "aboutme", self.aboutme, mode, None);
        let country = required_text(&mut errors, "country", self.country, WriteMode::Partial, Some(COUNTRY_MAX));

        let dob = match self.dob {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(date) => Some(Some(date)),
                Err(_) => {
                    errors.add(
                        "dob",
                        "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
                    );
                    None
                }
            },
        };

        errors.into_result(ProfileUpdate {
            dob,
            country,
            aboutme,
        })
    }

    pub fn into_new_profile(self) -> Result<NewProfile, ApiError> {
        let valid = self.validate(WriteMode::Create)?;
        Ok(NewProfile {
            dob: valid.dob.flatten(),
            country: valid.country.unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            aboutme: valid.aboutme.unwrap_or_default(),
        })
    }
}
