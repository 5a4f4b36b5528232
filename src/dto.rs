use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::Contact;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_PHONE_LEN: usize = 20;
pub const MIN_AGE: i64 = 1;
pub const MAX_AGE: i64 = 149;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDto {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub phones: Vec<PhoneDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneDto {
    pub id: i64,
    pub phone_number: String,
}

impl From<Contact> for ContactDto {
    fn from(contact: Contact) -> Self {
        ContactDto {
            id: contact.id,
            name: contact.name,
            age: contact.age,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
            phones: contact
                .phones
                .into_iter()
                .map(|p| PhoneDto {
                    id: p.id,
                    phone_number: p.phone_number,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactDto {
    pub name: String,
    pub age: i64,
    pub phone_numbers: Vec<String>,
}

/// Same shape as create; updates always carry the full replacement state.
pub type UpdateContactDto = CreateContactDto;

impl CreateContactDto {
    /// Boundary validation: malformed input never reaches the service layer.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("name is required".into()));
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(ApiError::Validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(ApiError::Validation(format!(
                "age must be between {MIN_AGE} and {MAX_AGE}"
            )));
        }
        if self.phone_numbers.is_empty() {
            return Err(ApiError::Validation(
                "at least one phone number is required".into(),
            ));
        }
        for number in &self.phone_numbers {
            if number.trim().is_empty() {
                return Err(ApiError::Validation("phone number must not be empty".into()));
            }
            if number.chars().count() > MAX_PHONE_LEN {
                return Err(ApiError::Validation(format!(
                    "phone number must be at most {MAX_PHONE_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResultDto<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> PagedResultDto<T> {
    /// `total_pages = ceil(total_count / page_size)`; zero when the set is
    /// empty.
    pub fn new(items: Vec<T>, total_count: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if total_count == 0 {
            0
        } else {
            (total_count + page_size - 1) / page_size
        };
        PagedResultDto {
            items,
            total_count,
            page,
            page_size,
            total_pages,
        }
    }
}
