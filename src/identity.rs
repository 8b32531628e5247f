use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEPARTMENTS: [&str; 11] = [
    "Computer Science and Engineering",
    "Electrical and Electronic Engineering",
    "Mechanical Engineering",
    "Civil Engineering",
    "Architecture",
    "Urban and Regional Planning",
    "Chemical Engineering",
    "Materials and Metallurgical Engineering",
    "Industrial and Production Engineering",
    "Water Resources Engineering",
    "Naval Architecture and Marine Engineering",
];

/// Who is taking the test. Sent as the body of `POST /users`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub name: String,
    pub department: String,
    pub registration_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

impl Identity {
    pub fn new(
        name: impl Into<String>,
        department: impl Into<String>,
        registration_number: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            department: department.into(),
            registration_number: registration_number.into(),
        }
    }

    /// Trimmed copy with every required field present
    pub fn validated(&self) -> Result<Self, IdentityError> {
        let name = self.name.trim();
        let department = self.department.trim();
        let registration_number = self.registration_number.trim();

        if name.is_empty() {
            return Err(IdentityError::MissingField("name"));
        }
        if department.is_empty() {
            return Err(IdentityError::MissingField("department"));
        }
        if registration_number.is_empty() {
            return Err(IdentityError::MissingField("registration number"));
        }

        Ok(Self::new(name, department, registration_number))
    }
}

/// Response of `POST /users`; only the id matters to the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    #[serde(rename = "_id")]
    pub id: String,
}

/// Index of `department` in [`DEPARTMENTS`], if it is one of them
pub fn department_index(department: &str) -> Option<usize> {
    DEPARTMENTS.iter().position(|d| d.eq_ignore_ascii_case(department.trim()))
}
