//! HTML Form Types
//!
//! Each form owns its submitted values plus a [`Validator`]; on failure
//! the whole form is handed back to the template so the page re-renders
//! with the values and errors in place.

use kernel::validate::{self, EMAIL_RX, Validator};
use serde::{Deserialize, Serialize};

/// Snippet creation form
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SnippetCreateForm {
    pub title: String,
    pub content: String,
    pub expires: i64,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl Default for SnippetCreateForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            expires: 1095,
            validator: Validator::new(),
        }
    }
}

impl SnippetCreateForm {
    pub fn validate(&mut self) -> bool {
        self.validator.check_field(
            validate::not_blank(&self.title),
            "title",
            "This field cannot be blank",
        );
        self.validator.check_field(
            validate::max_chars(&self.title, 100),
            "title",
            "This field cannot be more than 100 characters long",
        );
        self.validator.check_field(
            validate::not_blank(&self.content),
            "content",
            "This field cannot be blank",
        );
        self.validator.check_field(
            validate::permitted_value(self.expires, &[1, 7, 365, 1095]),
            "expires",
            "Expires must be equal to 1, 7, 365, or 1095 days",
        );
        self.validator.valid()
    }
}

/// User signup form
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserSignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl UserSignupForm {
    pub fn validate(&mut self) -> bool {
        self.validator.check_field(
            validate::not_blank(&self.name),
            "name",
            "This field cannot be blank",
        );
        self.validator.check_field(
            validate::not_blank(&self.email),
            "email",
            "This field cannot be blank",
        );
        self.validator.check_field(
            validate::matches(&self.email, &EMAIL_RX),
            "email",
            "This field must be a valid email address",
        );
        self.validator.check_field(
            validate::not_blank(&self.password),
            "password",
            "This field cannot be blank",
        );
        self.validator.check_field(
            validate::min_chars(&self.password, 8),
            "password",
            "This field must be at least 8 characters long",
        );
        self.validator.valid()
    }
}

/// User login form
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserLoginForm {
    pub email: String,
    pub password: String,
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl UserLoginForm {
    pub fn validate(&mut self) -> bool {
        self.validator.check_field(
            validate::not_blank(&self.email),
            "email",
            "This field cannot be blank",
        );
        self.validator.check_field(
            validate::matches(&self.email, &EMAIL_RX),
            "email",
            "This field must be a valid email address",
        );
        self.validator.check_field(
            validate::not_blank(&self.password),
            "password",
            "This field cannot be blank",
        );
        self.validator.valid()
    }
}
