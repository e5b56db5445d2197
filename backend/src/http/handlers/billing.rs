//! Invoices, payments and point-of-sale checkout.

use axum::{extract::State, http::StatusCode};

use super::{CreatedResult, HandlerResult};
use crate::http::dto::{ApiResponse, InvoiceQuery, ListData, PaymentQuery, TransactionQuery};
use crate::http::extract::{ApiJson, ApiPath, ApiQuery, CurrentTenant, IdempotencyKeyHeader};
use crate::http::state::AppState;
use crate::models::{
    CheckoutRequest, CheckoutResult, CreateInvoice, FinancialTransaction, Invoice, InvoiceId,
    NewPayment, Payment, PaymentReceipt,
};
use crate::services::billing;

// =============================================================================
// Invoices
// =============================================================================

pub async fn list_invoices(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<InvoiceQuery>,
) -> HandlerResult<ListData<Invoice>> {
    let page = billing::list_invoices(
        state.repository.as_ref(),
        tenant.id,
        &query.filter()?,
        query.page_request(),
    )
    .await?;
    Ok(ApiResponse::page("invoices", page))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<InvoiceId>,
) -> HandlerResult<Invoice> {
    Ok(ApiResponse::ok(
        billing::get_invoice(state.repository.as_ref(), tenant.id, id).await?,
    ))
}

/// POST /invoices
///
/// Tax is charged at the service-wide `TAX_RATE`.
pub async fn create_invoice(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<CreateInvoice>,
) -> CreatedResult<Invoice> {
    let invoice = billing::create_invoice(
        state.repository.as_ref(),
        tenant.id,
        state.config.tax_rate,
        request,
    )
    .await?;
    Ok(ApiResponse::created(invoice))
}

// =============================================================================
// Payments
// =============================================================================

pub async fn list_invoice_payments(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<InvoiceId>,
) -> HandlerResult<ListData<Payment>> {
    let payments =
        billing::list_invoice_payments(state.repository.as_ref(), tenant.id, id).await?;
    Ok(ApiResponse::list("payments", payments))
}

pub async fn record_payment(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<InvoiceId>,
    ApiJson(request): ApiJson<NewPayment>,
) -> CreatedResult<PaymentReceipt> {
    let receipt = billing::record_payment(state.repository.as_ref(), tenant.id, id, request).await?;
    Ok(ApiResponse::created(receipt))
}

pub async fn list_payments(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<PaymentQuery>,
) -> HandlerResult<ListData<Payment>> {
    let payments =
        billing::list_payments(state.repository.as_ref(), tenant.id, &query.filter()?).await?;
    Ok(ApiResponse::list("payments", payments))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> HandlerResult<ListData<FinancialTransaction>> {
    let transactions =
        billing::list_transactions(state.repository.as_ref(), tenant.id, query.invoice_id).await?;
    Ok(ApiResponse::list("transactions", transactions))
}

// =============================================================================
// Checkout
// =============================================================================

/// POST /checkout
///
/// Invoice, payment and ledger entry are written together. With an
/// `Idempotency-Key` header a retry returns the first result with
/// `replayed: true` and status 200 instead of 201.
pub async fn checkout(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    IdempotencyKeyHeader(key): IdempotencyKeyHeader,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> CreatedResult<CheckoutResult> {
    let result = billing::checkout(
        state.repository.as_ref(),
        &tenant,
        state.config.tax_rate,
        request,
        key,
    )
    .await?;

    let status = if result.replayed {
        StatusCode::OK
    } else {
        tracing::info!(
            tenant = %tenant.slug,
            invoice = %result.invoice.invoice_number,
            total = result.invoice.total,
            "checkout completed"
        );
        StatusCode::CREATED
    };
    Ok((status, ApiResponse::ok(result)))
}
