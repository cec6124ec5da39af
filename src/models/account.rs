use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DataError;

pub const MIN_PASSWORD_LEN: usize = 7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
    Male,
    Female,
    Others,
    #[default]
    #[serde(rename = "Prefer Not to Say")]
    #[strum(serialize = "Prefer Not to Say")]
    Unspecified,
}

#[derive(Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub gender: Gender,
    pub country: String,
    pub password: String,
    pub password2: String,
}

impl Registration {
    /// Checks the backend's account rules before the form is sent.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.email.trim().is_empty() {
            return Err(DataError::missing_field("email"));
        }
        if !self.name.trim().contains(' ') {
            return Err(DataError::invalid_value("name", "Enter full name"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DataError::invalid_value(
                "password",
                format!("The length of password must be at least {MIN_PASSWORD_LEN}"),
            ));
        }
        if self.password != self.password2 {
            return Err(DataError::invalid_value("password2", "Password must match"));
        }
        Ok(())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("gender", &self.gender)
            .field("country", &self.country)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub gender: Gender,
    pub country: String,
}
