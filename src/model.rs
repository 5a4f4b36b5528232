use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Persistence row for the `contact` table. Phones are loaded separately and
/// attached by the repository.
#[derive(Debug, Clone, FromRow)]
pub struct ContactRow {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PhoneRow {
    pub id: i64,
    pub contact_id: i64,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

/// A contact with its full phone set, as the repository hands it to the
/// service layer.
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub phones: Vec<PhoneRow>,
}

impl Contact {
    pub fn from_parts(row: ContactRow, phones: Vec<PhoneRow>) -> Self {
        Contact {
            id: row.id,
            name: row.name,
            age: row.age,
            created_at: row.created_at,
            updated_at: row.updated_at,
            phones,
        }
    }
}

/// Input to repository create/update: no ids, no timestamps. The repository
/// assigns both.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub age: i64,
    pub phone_numbers: Vec<String>,
}
