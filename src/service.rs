use std::sync::Arc;

use crate::deletion_log::DeletionLog;
use crate::dto::{ContactDto, CreateContactDto, PagedResultDto, UpdateContactDto};
use crate::error::ApiError;
use crate::model::NewContact;
use crate::repository::ContactRepository;

/// Orchestration over the repository: DTO mapping, pagination envelopes, and
/// the deletion-log hook. No direct store access.
#[derive(Debug, Clone)]
pub struct ContactService {
    repository: ContactRepository,
    deletion_log: Arc<DeletionLog>,
}

impl ContactService {
    pub fn new(repository: ContactRepository, deletion_log: Arc<DeletionLog>) -> Self {
        ContactService {
            repository,
            deletion_log,
        }
    }

    pub async fn get_all(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<PagedResultDto<ContactDto>, ApiError> {
        let (contacts, total) = self.repository.list_page(page, page_size).await?;
        let items = contacts.into_iter().map(ContactDto::from).collect();
        Ok(PagedResultDto::new(items, total, page, page_size))
    }

    pub async fn search(
        &self,
        term: &str,
        page: i64,
        page_size: i64,
    ) -> Result<PagedResultDto<ContactDto>, ApiError> {
        let (contacts, total) = self.repository.search(term, page, page_size).await?;
        let items = contacts.into_iter().map(ContactDto::from).collect();
        Ok(PagedResultDto::new(items, total, page, page_size))
    }

    /// `None` is the not-found signal, not an error; the HTTP layer turns it
    /// into a 404.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<ContactDto>, ApiError> {
        Ok(self.repository.get_by_id(id).await?.map(ContactDto::from))
    }

    pub async fn create(&self, dto: CreateContactDto) -> Result<ContactDto, ApiError> {
        let created = self.repository.create(Self::to_new_contact(dto)).await?;
        Ok(ContactDto::from(created))
    }

    pub async fn update(
        &self,
        id: i64,
        dto: UpdateContactDto,
    ) -> Result<Option<ContactDto>, ApiError> {
        let updated = self.repository.update(id, Self::to_new_contact(dto)).await?;
        Ok(updated.map(ContactDto::from))
    }

    /// Deletes and then awaits the audit append before returning. A log
    /// failure surfaces as the operation's failure even though the store
    /// delete already committed; a missing contact never touches the log.
    pub async fn delete(&self, id: i64) -> Result<Option<ContactDto>, ApiError> {
        let Some(deleted) = self.repository.delete(id).await? else {
            return Ok(None);
        };

        let dto = ContactDto::from(deleted);
        self.deletion_log.log_deletion(&dto).await?;
        Ok(Some(dto))
    }

    fn to_new_contact(dto: CreateContactDto) -> NewContact {
        NewContact {
            name: dto.name,
            age: dto.age,
            phone_numbers: dto.phone_numbers,
        }
    }
}
