//! Customer and pet management.

use super::tenants::{ensure_quota, Quota};
use super::validation;
use crate::db::repository::FullRepository;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateCustomer, CreatePet, Customer, CustomerFilter, CustomerId, Page, PageRequest, Pet,
    PetFilter, PetId, Tenant, TenantId, UpdateCustomer, UpdatePet,
};

/// How a delete request is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Mark inactive, keep the row and its history.
    Soft,
    /// Remove the row; refused while reservations reference it.
    Permanent,
}

impl DeleteMode {
    pub fn from_flag(permanent: bool) -> Self {
        if permanent {
            DeleteMode::Permanent
        } else {
            DeleteMode::Soft
        }
    }
}

// ==================== Customers ====================

pub async fn create_customer<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: &Tenant,
    request: CreateCustomer,
) -> AppResult<Customer> {
    validation::require_text(&request.first_name, "firstName")?;
    validation::require_text(&request.last_name, "lastName")?;
    validation::validate_optional_email(request.email.as_deref())?;

    ensure_quota(tenant, Quota::Customers, repo.count_customers(tenant.id).await?)?;

    let customer = request.into_customer(tenant.id);
    Ok(repo.create_customer(customer).await?)
}

pub async fn get_customer<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: CustomerId,
) -> AppResult<Customer> {
    Ok(repo.get_customer(tenant, id).await?)
}

pub async fn list_customers<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    filter: &CustomerFilter,
    page: PageRequest,
) -> AppResult<Page<Customer>> {
    Ok(repo.list_customers(tenant, filter, page).await?)
}

pub async fn update_customer<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: CustomerId,
    patch: UpdateCustomer,
) -> AppResult<Customer> {
    if let Some(v) = &patch.first_name {
        validation::require_text(v, "firstName")?;
    }
    if let Some(v) = &patch.last_name {
        validation::require_text(v, "lastName")?;
    }
    if let Some(email) = &patch.email {
        validation::validate_optional_email(email.as_deref())?;
    }

    let mut customer = repo.get_customer(tenant, id).await?;
    patch.apply(&mut customer);
    Ok(repo.update_customer(customer).await?)
}

pub async fn delete_customer<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: CustomerId,
    mode: DeleteMode,
) -> AppResult<()> {
    match mode {
        DeleteMode::Soft => {
            let mut customer = repo.get_customer(tenant, id).await?;
            if customer.is_active {
                UpdateCustomer {
                    is_active: Some(false),
                    ..Default::default()
                }
                .apply(&mut customer);
                repo.update_customer(customer).await?;
            }
            Ok(())
        }
        DeleteMode::Permanent => {
            repo.delete_customer(tenant, id).await?;
            log::info!("Permanently deleted customer {} of tenant {}", id, tenant);
            Ok(())
        }
    }
}

// ==================== Pets ====================

pub async fn create_pet<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    request: CreatePet,
) -> AppResult<Pet> {
    validation::require_text(&request.name, "name")?;
    if let Some(w) = request.weight {
        validation::non_negative(w, "weight")?;
    }
    let owner = repo.get_customer(tenant, request.customer_id).await?;
    if !owner.is_active {
        return Err(AppError::validation("Cannot add a pet to an inactive customer"));
    }
    Ok(repo.create_pet(request.into_pet(tenant)).await?)
}

pub async fn get_pet<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: PetId,
) -> AppResult<Pet> {
    Ok(repo.get_pet(tenant, id).await?)
}

pub async fn list_pets<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    filter: &PetFilter,
) -> AppResult<Vec<Pet>> {
    Ok(repo.list_pets(tenant, filter).await?)
}

/// Pets of one customer; 404 when the customer is not in the tenant.
pub async fn list_customer_pets<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    customer: CustomerId,
) -> AppResult<Vec<Pet>> {
    repo.get_customer(tenant, customer).await?;
    let filter = PetFilter {
        customer_id: Some(customer),
        ..Default::default()
    };
    Ok(repo.list_pets(tenant, &filter).await?)
}

pub async fn update_pet<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: PetId,
    patch: UpdatePet,
) -> AppResult<Pet> {
    if let Some(v) = &patch.name {
        validation::require_text(v, "name")?;
    }
    if let Some(Some(w)) = patch.weight {
        validation::non_negative(w, "weight")?;
    }
    let mut pet = repo.get_pet(tenant, id).await?;
    patch.apply(&mut pet);
    Ok(repo.update_pet(pet).await?)
}

pub async fn delete_pet<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: PetId,
    mode: DeleteMode,
) -> AppResult<()> {
    match mode {
        DeleteMode::Soft => {
            let mut pet = repo.get_pet(tenant, id).await?;
            if pet.is_active {
                UpdatePet {
                    is_active: Some(false),
                    ..Default::default()
                }
                .apply(&mut pet);
                repo.update_pet(pet).await?;
            }
            Ok(())
        }
        DeleteMode::Permanent => Ok(repo.delete_pet(tenant, id).await?),
    }
}
