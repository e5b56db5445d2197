//! Invoicing, payments and point-of-sale checkout.

use super::tenants::require_feature;
use super::validation;
use crate::db::repository::FullRepository;
use crate::db::request_fingerprint;
use crate::error::{AppError, AppResult};
use crate::models::{
    features, CheckoutPlan, CheckoutRequest, CheckoutResult, CreateInvoice, CustomerId,
    FinancialTransaction, IdempotencyKey, Invoice, InvoiceFilter, InvoiceId, LineItemType,
    NewLineItem, NewPayment, Page, PageRequest, Payment, PaymentFilter, PaymentReceipt,
    ReservationId, Tenant, TenantId,
};

/// Longest accepted `Idempotency-Key` header value.
pub const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 255;

fn validate_items(items: &[NewLineItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::validation("At least one line item is required"));
    }
    for (i, item) in items.iter().enumerate() {
        validation::require_text(&item.description, &format!("lineItems[{}].description", i))?;
        validation::positive(item.quantity, &format!("lineItems[{}].quantity", i))?;
        validation::non_negative(item.unit_price, &format!("lineItems[{}].unitPrice", i))?;
    }
    Ok(())
}

/// The customer must exist and, when given, own the reservation.
async fn check_parties<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    customer: CustomerId,
    reservation: Option<ReservationId>,
) -> AppResult<()> {
    repo.get_customer(tenant, customer).await?;
    if let Some(id) = reservation {
        let reservation = repo.get_reservation(tenant, id).await?;
        if reservation.customer_id != customer {
            return Err(AppError::validation(format!(
                "Reservation {} does not belong to customer {}",
                id, customer
            )));
        }
    }
    Ok(())
}

pub async fn create_invoice<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    tax_rate: f64,
    request: CreateInvoice,
) -> AppResult<Invoice> {
    validate_items(&request.line_items)?;
    check_parties(repo, tenant, request.customer_id, request.reservation_id).await?;

    let mut invoice = Invoice::draft(
        tenant,
        request.customer_id,
        request.reservation_id,
        request.line_items,
        tax_rate,
    );
    invoice.due_date = request.due_date;
    invoice.notes = request.notes;

    let created = repo.create_invoice(invoice).await?;
    log::info!("Issued invoice {} total {:.2}", created.invoice_number, created.total);
    Ok(created)
}

pub async fn get_invoice<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: InvoiceId,
) -> AppResult<Invoice> {
    Ok(repo.get_invoice(tenant, id).await?)
}

pub async fn list_invoices<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    filter: &InvoiceFilter,
    page: PageRequest,
) -> AppResult<Page<Invoice>> {
    Ok(repo.list_invoices(tenant, filter, page).await?)
}

/// Settle a payment against an invoice.
pub async fn record_payment<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    invoice: InvoiceId,
    request: NewPayment,
) -> AppResult<PaymentReceipt> {
    let invoice = repo.get_invoice(tenant, invoice).await?;
    invoice
        .clone()
        .apply_payment(request.amount)
        .map_err(AppError::validation)?;
    let receipt = repo.record_payment(request.into_payment(&invoice)).await?;
    log::info!(
        "Payment of {:.2} on invoice {}, now {}",
        receipt.payment.amount,
        receipt.invoice.invoice_number,
        receipt.invoice.status
    );
    Ok(receipt)
}

pub async fn list_payments<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    filter: &PaymentFilter,
) -> AppResult<Vec<Payment>> {
    Ok(repo.list_payments(tenant, filter).await?)
}

pub async fn list_invoice_payments<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    invoice: InvoiceId,
) -> AppResult<Vec<Payment>> {
    repo.get_invoice(tenant, invoice).await?;
    let filter = PaymentFilter {
        invoice_id: Some(invoice),
        ..Default::default()
    };
    Ok(repo.list_payments(tenant, &filter).await?)
}

pub async fn list_transactions<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    invoice: Option<InvoiceId>,
) -> AppResult<Vec<FinancialTransaction>> {
    Ok(repo.list_financial_transactions(tenant, invoice).await?)
}

/// Line items for a reservation: the stay itself plus every attached add-on.
pub async fn reservation_line_items<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    reservation: ReservationId,
) -> AppResult<Vec<NewLineItem>> {
    let reservation = repo.get_reservation(tenant, reservation).await?;
    let service = repo.get_service(tenant, reservation.service_id).await?;

    let description = if service.service_category.is_nightly() {
        let nights = reservation.window().nights();
        format!(
            "{} ({} night{})",
            service.name,
            nights,
            if nights == 1 { "" } else { "s" }
        )
    } else {
        service.name.clone()
    };
    let mut items = vec![NewLineItem {
        item_type: LineItemType::Service,
        description,
        quantity: 1,
        unit_price: reservation.price,
        reference_id: Some(service.id.value()),
    }];

    for line in repo.list_reservation_add_ons(tenant, reservation.id).await? {
        let name = match repo.get_add_on(tenant, line.add_on_id).await {
            Ok(add_on) => add_on.name,
            Err(e) if e.is_not_found() => "Add-on".to_string(),
            Err(e) => return Err(e.into()),
        };
        items.push(NewLineItem {
            item_type: LineItemType::AddOn,
            description: name,
            quantity: line.quantity,
            unit_price: line.unit_price,
            reference_id: Some(line.add_on_id.value()),
        });
    }
    Ok(items)
}

/// Bill and collect in one atomic step.
///
/// Without explicit items the reservation is billed. A repeated call with the
/// same `Idempotency-Key` and body returns the first result with
/// `replayed = true`; the same key with a different body is a 409.
pub async fn checkout<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: &Tenant,
    tax_rate: f64,
    request: CheckoutRequest,
    idempotency_key: Option<String>,
) -> AppResult<CheckoutResult> {
    require_feature(tenant, features::POS)?;

    let idempotency = match idempotency_key.map(|k| k.trim().to_string()) {
        Some(key) if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LENGTH => {
            return Err(AppError::validation(format!(
                "Idempotency-Key must be 1 to {} characters",
                MAX_IDEMPOTENCY_KEY_LENGTH
            )));
        }
        Some(key) => Some(IdempotencyKey {
            key,
            fingerprint: request_fingerprint(&request)?,
        }),
        None => None,
    };

    // A retry gets the stored result even if the reservation has since changed.
    if let Some(key) = &idempotency {
        if let Some(stored) = repo.find_checkout(tenant.id, key).await? {
            log::info!("Replayed checkout for invoice {}", stored.invoice.invoice_number);
            return Ok(stored);
        }
    }

    check_parties(repo, tenant.id, request.customer_id, request.reservation_id).await?;

    let items = match (request.items.is_empty(), request.reservation_id) {
        (false, _) => request.items,
        (true, Some(reservation)) => reservation_line_items(repo, tenant.id, reservation).await?,
        (true, None) => {
            return Err(AppError::validation(
                "Checkout needs line items or a reservation to bill",
            ))
        }
    };
    validate_items(&items)?;

    let mut invoice = Invoice::draft(
        tenant.id,
        request.customer_id,
        request.reservation_id,
        items,
        tax_rate,
    );
    invoice.notes = request.notes;

    let amount = request.payment.amount.unwrap_or(invoice.total);
    invoice
        .clone()
        .apply_payment(amount)
        .map_err(AppError::validation)?;
    let payment = NewPayment {
        amount,
        method: request.payment.method,
        reference: request.payment.reference,
        notes: None,
    }
    .into_payment(&invoice);

    let result = repo
        .checkout(CheckoutPlan {
            idempotency,
            invoice,
            payment,
        })
        .await?;
    if result.replayed {
        log::info!("Replayed checkout for invoice {}", result.invoice.invoice_number);
    } else {
        log::info!(
            "Checkout: invoice {} total {:.2}, paid {:.2} by {}",
            result.invoice.invoice_number,
            result.invoice.total,
            result.payment.amount,
            result.payment.method
        );
    }
    Ok(result)
}
