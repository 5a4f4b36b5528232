use std::collections::HashMap;

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use sqlx::QueryBuilder;

use crate::model::{Contact, ContactRow, NewContact, PhoneRow};

const CONTACT_COLUMNS: &str = "id, name, age, created_at, updated_at";

/// Case-insensitive substring match against the contact name or any of its
/// phone numbers. Both sides go through the same `upper()` so the folding
/// can never disagree between term and column.
const SEARCH_FILTER: &str = "instr(upper(name), upper($1)) > 0 \
     OR EXISTS (SELECT 1 FROM phone WHERE phone.contact_id = contact.id \
                AND instr(upper(phone.phone_number), upper($1)) > 0)";

/// Data access for contacts and their phones. Owns no business rules beyond
/// query shaping; store failures propagate unmodified.
#[derive(Debug, Clone)]
pub struct ContactRepository {
    pool: SqlitePool,
}

impl ContactRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ContactRepository { pool }
    }

    /// Contacts ordered by name (BINARY collation), offset-paginated, each
    /// with its full phone set. The count is unfiltered.
    pub async fn list_page(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Contact>, i64), sqlx::Error> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contact ORDER BY name LIMIT $1 OFFSET $2"
        ))
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(&self.pool)
        .await?;

        let items = self.attach_phones(rows).await?;
        Ok((items, total))
    }

    /// Empty or whitespace-only terms fall back to a plain listing; anything
    /// else filters case-insensitively on name or phone number before the
    /// same ordering and pagination.
    pub async fn search(
        &self,
        term: &str,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Contact>, i64), sqlx::Error> {
        if term.trim().is_empty() {
            return self.list_page(page, page_size).await;
        }

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM contact WHERE {SEARCH_FILTER}"))
                .bind(term)
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contact WHERE {SEARCH_FILTER} \
             ORDER BY name LIMIT $2 OFFSET $3"
        ))
        .bind(term)
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(&self.pool)
        .await?;

        let items = self.attach_phones(rows).await?;
        Ok((items, total))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Contact>, sqlx::Error> {
        let row: Option<ContactRow> =
            sqlx::query_as(&format!("SELECT {CONTACT_COLUMNS} FROM contact WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => {
                let phones = self.phones_for(row.id).await?;
                Ok(Some(Contact::from_parts(row, phones)))
            }
            None => Ok(None),
        }
    }

    /// Persists the contact and its phones in one transaction. A single
    /// timestamp stamps `created_at`/`updated_at` on the contact and
    /// `created_at` on every phone.
    pub async fn create(&self, new: NewContact) -> Result<Contact, sqlx::Error> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row: ContactRow = sqlx::query_as(&format!(
            "INSERT INTO contact (name, age, created_at, updated_at) \
             VALUES ($1, $2, $3, $4) RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(new.age)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut phones = Vec::with_capacity(new.phone_numbers.len());
        for number in &new.phone_numbers {
            let phone: PhoneRow = sqlx::query_as(
                "INSERT INTO phone (contact_id, phone_number, created_at) \
                 VALUES ($1, $2, $3) RETURNING id, contact_id, phone_number, created_at",
            )
            .bind(row.id)
            .bind(number)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            phones.push(phone);
        }

        tx.commit().await?;
        Ok(Contact::from_parts(row, phones))
    }

    /// Replaces name, age, and the ENTIRE phone set atomically. Phones are
    /// never diffed: every existing phone row is deleted and the new set is
    /// inserted fresh, so prior phone ids stop resolving after an update.
    pub async fn update(&self, id: i64, new: NewContact) -> Result<Option<Contact>, sqlx::Error> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE contact SET name = $1, age = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(&new.name)
        .bind(new.age)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM phone WHERE contact_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for number in &new.phone_numbers {
            sqlx::query(
                "INSERT INTO phone (contact_id, phone_number, created_at) VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(number)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Deletes the contact (phones cascade) and returns the pre-deletion
    /// snapshot.
    pub async fn delete(&self, id: i64) -> Result<Option<Contact>, sqlx::Error> {
        let Some(contact) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM contact WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Some(contact))
    }

    async fn phones_for(&self, contact_id: i64) -> Result<Vec<PhoneRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, contact_id, phone_number, created_at FROM phone \
             WHERE contact_id = $1 ORDER BY id",
        )
        .bind(contact_id)
        .fetch_all(&self.pool)
        .await
    }

    /// One phone query for the whole page instead of one per contact.
    async fn attach_phones(&self, rows: Vec<ContactRow>) -> Result<Vec<Contact>, sqlx::Error> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new(
            "SELECT id, contact_id, phone_number, created_at FROM phone WHERE contact_id IN (",
        );
        let mut ids = builder.separated(", ");
        for row in &rows {
            ids.push_bind(row.id);
        }
        drop(ids);
        builder.push(") ORDER BY id");

        let phones: Vec<PhoneRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        let mut by_contact: HashMap<i64, Vec<PhoneRow>> = HashMap::new();
        for phone in phones {
            by_contact.entry(phone.contact_id).or_default().push(phone);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let phones = by_contact.remove(&row.id).unwrap_or_default();
                Contact::from_parts(row, phones)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn new_contact(name: &str, age: i64, numbers: &[&str]) -> NewContact {
        NewContact {
            name: name.to_string(),
            age,
            phone_numbers: numbers.iter().map(|n| n.to_string()).collect(),
        }
    }

    async fn repo() -> ContactRepository {
        ContactRepository::new(memory_pool().await)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let repo = repo().await;
        let created = repo
            .create(new_contact("Alice", 25, &["123-456-7890"]))
            .await
            .unwrap();

        assert_eq!(created.created_at, created.updated_at);

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Alice");
        assert_eq!(fetched.age, 25);
        assert_eq!(fetched.phones.len(), 1);
        assert_eq!(fetched.phones[0].phone_number, "123-456-7890");
        assert_eq!(fetched.phones[0].contact_id, created.id);
    }

    #[tokio::test]
    async fn get_by_id_missing_is_none() {
        let repo = repo().await;
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_page_orders_by_name_and_paginates() {
        let repo = repo().await;
        for name in ["Charlie", "Alice", "Bob", "Dave", "Eve"] {
            repo.create(new_contact(name, 30, &["555"])).await.unwrap();
        }

        let (page1, total) = repo.list_page(1, 2).await.unwrap();
        assert_eq!(total, 5);
        let names: Vec<_> = page1.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob"]);

        let (page3, total) = repo.list_page(3, 2).await.unwrap();
        assert_eq!(total, 5);
        let names: Vec<_> = page3.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Eve"]);
    }

    #[tokio::test]
    async fn blank_search_matches_plain_listing() {
        let repo = repo().await;
        repo.create(new_contact("Alice", 25, &["111"])).await.unwrap();
        repo.create(new_contact("Bob", 30, &["222"])).await.unwrap();

        let (listed, listed_total) = repo.list_page(1, 10).await.unwrap();
        for term in ["", "   ", "\t"] {
            let (found, total) = repo.search(term, 1, 10).await.unwrap();
            assert_eq!(total, listed_total);
            let found: Vec<_> = found.iter().map(|c| c.id).collect();
            let listed: Vec<_> = listed.iter().map(|c| c.id).collect();
            assert_eq!(found, listed);
        }
    }

    #[tokio::test]
    async fn search_is_case_insensitive_on_name() {
        let repo = repo().await;
        repo.create(new_contact("Alice", 25, &["111"])).await.unwrap();
        repo.create(new_contact("Bob", 30, &["222"])).await.unwrap();

        for term in ["ALICE", "alice", "lIc"] {
            let (found, total) = repo.search(term, 1, 10).await.unwrap();
            assert_eq!(total, 1, "term {term:?}");
            assert_eq!(found[0].name, "Alice");
        }
    }

    #[tokio::test]
    async fn search_matches_phone_numbers() {
        let repo = repo().await;
        repo.create(new_contact("Alice", 25, &["+1-555-0101"])).await.unwrap();
        repo.create(new_contact("Bob", 30, &["+1-555-0202"])).await.unwrap();

        let (found, total) = repo.search("0101", 1, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].name, "Alice");
    }

    #[tokio::test]
    async fn search_finds_non_ascii_names_by_their_own_substring() {
        let repo = repo().await;
        repo.create(new_contact("émile", 25, &["111"])).await.unwrap();
        repo.create(new_contact("Bob", 30, &["222"])).await.unwrap();

        let (found, total) = repo.search("émile", 1, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].name, "émile");

        // ASCII folding still applies around the accented character.
        let (found, total) = repo.search("MILE", 1, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].name, "émile");
    }

    #[tokio::test]
    async fn search_counts_filtered_set_and_paginates() {
        let repo = repo().await;
        for name in ["Anna", "Annabel", "Annette", "Bob"] {
            repo.create(new_contact(name, 30, &["555"])).await.unwrap();
        }

        let (page1, total) = repo.search("ann", 1, 2).await.unwrap();
        assert_eq!(total, 3);
        let names: Vec<_> = page1.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Anna", "Annabel"]);

        let (page2, _) = repo.search("ann", 2, 2).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].name, "Annette");
    }

    #[tokio::test]
    async fn update_replaces_the_phone_set() {
        let repo = repo().await;
        let created = repo.create(new_contact("Alice", 25, &["A", "B"])).await.unwrap();
        let old_phone_ids: Vec<_> = created.phones.iter().map(|p| p.id).collect();
        assert_eq!(old_phone_ids.len(), 2);

        let updated = repo
            .update(created.id, new_contact("Alicia", 26, &["C"]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Alicia");
        assert_eq!(updated.age, 26);
        assert_eq!(updated.phones.len(), 1);
        assert_eq!(updated.phones[0].phone_number, "C");
        assert!(updated.updated_at >= updated.created_at);
        assert!(!old_phone_ids.contains(&updated.phones[0].id));
    }

    #[tokio::test]
    async fn update_missing_is_none() {
        let repo = repo().await;
        let result = repo.update(999, new_contact("Nobody", 40, &["555"])).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn delete_returns_snapshot_and_cascades() {
        let repo = repo().await;
        let created = repo.create(new_contact("Alice", 25, &["111", "222"])).await.unwrap();

        let deleted = repo.delete(created.id).await.unwrap().unwrap();
        assert_eq!(deleted.id, created.id);
        assert_eq!(deleted.name, "Alice");
        assert_eq!(deleted.phones.len(), 2);

        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        let (remaining, total) = repo.list_page(1, 10).await.unwrap();
        assert!(remaining.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn delete_missing_is_none() {
        let repo = repo().await;
        assert!(repo.delete(999).await.unwrap().is_none());
    }
}
