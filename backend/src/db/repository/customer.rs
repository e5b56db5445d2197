//! Customer and pet persistence.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    Customer, CustomerFilter, CustomerId, Page, PageRequest, Pet, PetFilter, PetId, TenantId,
};

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    // ==================== Customers ====================

    /// Insert a customer.
    ///
    /// # Errors
    /// `ConflictError` when another customer of the tenant has the same email.
    async fn create_customer(&self, customer: Customer) -> RepositoryResult<Customer>;

    async fn get_customer(&self, tenant: TenantId, id: CustomerId) -> RepositoryResult<Customer>;

    /// Filtered customers ordered by last then first name.
    async fn list_customers(
        &self,
        tenant: TenantId,
        filter: &CustomerFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<Customer>>;

    async fn find_customer_by_email(
        &self,
        tenant: TenantId,
        email: &str,
    ) -> RepositoryResult<Option<Customer>>;

    async fn update_customer(&self, customer: Customer) -> RepositoryResult<Customer>;

    /// Remove a customer and their pets.
    ///
    /// # Errors
    /// `ConflictError` while any reservation still references the customer.
    async fn delete_customer(&self, tenant: TenantId, id: CustomerId) -> RepositoryResult<()>;

    /// Number of customers (active or not) the tenant owns.
    async fn count_customers(&self, tenant: TenantId) -> RepositoryResult<u64>;

    // ==================== Pets ====================

    async fn create_pet(&self, pet: Pet) -> RepositoryResult<Pet>;

    async fn get_pet(&self, tenant: TenantId, id: PetId) -> RepositoryResult<Pet>;

    /// Filtered pets ordered by name.
    async fn list_pets(&self, tenant: TenantId, filter: &PetFilter) -> RepositoryResult<Vec<Pet>>;

    async fn update_pet(&self, pet: Pet) -> RepositoryResult<Pet>;

    /// Remove a pet.
    ///
    /// # Errors
    /// `ConflictError` while any reservation still references the pet.
    async fn delete_pet(&self, tenant: TenantId, id: PetId) -> RepositoryResult<()>;
}
