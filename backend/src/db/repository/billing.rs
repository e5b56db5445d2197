//! Invoices, payments, financial transactions and checkout.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    CheckoutPlan, CheckoutResult, FinancialTransaction, IdempotencyKey, Invoice, InvoiceFilter, InvoiceId,
    Page, PageRequest, Payment, PaymentFilter, PaymentReceipt, TenantId,
};

#[async_trait]
pub trait BillingRepository: Send + Sync {
    /// Insert an invoice with its line items, assigning the next
    /// `INV-YYYYMMDD-NNNN` number for the tenant.
    async fn create_invoice(&self, invoice: Invoice) -> RepositoryResult<Invoice>;

    async fn get_invoice(&self, tenant: TenantId, id: InvoiceId) -> RepositoryResult<Invoice>;

    /// One page of filtered invoices, newest first.
    async fn list_invoices(
        &self,
        tenant: TenantId,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<Invoice>>;

    /// Every invoice matching `filter`, newest first.
    async fn find_invoices(
        &self,
        tenant: TenantId,
        filter: &InvoiceFilter,
    ) -> RepositoryResult<Vec<Invoice>>;

    /// Settle `payment` against its invoice.
    ///
    /// Updating the invoice, inserting the payment and writing the audit
    /// transaction happen in one transaction.
    ///
    /// # Errors
    /// `ValidationError` for overpayment or a cancelled/paid invoice.
    async fn record_payment(&self, payment: Payment) -> RepositoryResult<PaymentReceipt>;

    /// Payments ordered by payment time, newest first.
    async fn list_payments(
        &self,
        tenant: TenantId,
        filter: &PaymentFilter,
    ) -> RepositoryResult<Vec<Payment>>;

    /// Write invoice, payment and audit row atomically.
    ///
    /// With an idempotency key, a second call carrying the same key and
    /// fingerprint returns the stored result with `replayed = true`.
    ///
    /// # Errors
    /// `ConflictError` when the key was used with a different fingerprint.
    async fn checkout(&self, plan: CheckoutPlan) -> RepositoryResult<CheckoutResult>;

    /// The stored result of an earlier checkout under `key`, with
    /// `replayed = true`.
    ///
    /// # Errors
    /// `ConflictError` when the key was used with a different fingerprint.
    async fn find_checkout(
        &self,
        tenant: TenantId,
        key: &IdempotencyKey,
    ) -> RepositoryResult<Option<CheckoutResult>>;

    async fn list_financial_transactions(
        &self,
        tenant: TenantId,
        invoice: Option<InvoiceId>,
    ) -> RepositoryResult<Vec<FinancialTransaction>>;
}
