//! Invoices, payments and the financial audit trail.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::customer::CustomerId;
use super::reservation::ReservationId;
use super::tenant::TenantId;
use super::time::TimeWindow;
use crate::define_id_type;
use crate::define_text_enum;

define_id_type!(InvoiceId);
define_id_type!(LineItemId);
define_id_type!(PaymentId);
define_id_type!(TransactionId);

/// Amounts closer than this are considered equal.
pub const CURRENCY_EPSILON: f64 = 0.005;

/// Round half away from zero to two decimals.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
}

/// `total = round(S + S*T, 2)`; the tax amount is whatever remains so the
/// three figures always add up exactly.
pub fn compute_totals(subtotal: f64, tax_rate: f64) -> InvoiceTotals {
    let subtotal = round_currency(subtotal);
    let total = round_currency(subtotal + subtotal * tax_rate);
    InvoiceTotals {
        subtotal,
        tax_rate,
        tax_amount: round_currency(total - subtotal),
        total,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Cancelled,
}

define_text_enum!(InvoiceStatus {
    Pending => "PENDING",
    PartiallyPaid => "PARTIALLY_PAID",
    Paid => "PAID",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemType {
    Service,
    AddOn,
    Product,
}

define_text_enum!(LineItemType {
    Service => "SERVICE",
    AddOn => "ADD_ON",
    Product => "PRODUCT",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineItem {
    pub id: LineItemId,
    pub invoice_id: InvoiceId,
    #[serde(rename = "type")]
    pub item_type: LineItemType,
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub amount: f64,
    /// Service, add-on or product the line was priced from.
    pub reference_id: Option<uuid::Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLineItem {
    #[serde(rename = "type", alias = "itemType")]
    pub item_type: LineItemType,
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub unit_price: f64,
    #[serde(default)]
    pub reference_id: Option<uuid::Uuid>,
}

fn default_quantity() -> i32 {
    1
}

impl NewLineItem {
    pub fn amount(&self) -> f64 {
        round_currency(self.unit_price * self.quantity as f64)
    }

    pub fn into_line_item(self, invoice_id: InvoiceId) -> InvoiceLineItem {
        let amount = self.amount();
        InvoiceLineItem {
            id: LineItemId::generate(),
            invoice_id,
            item_type: self.item_type,
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
            amount,
            reference_id: self.reference_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    pub tenant_id: TenantId,
    /// `INV-YYYYMMDD-NNNN`, assigned by the repository on insert.
    pub invoice_number: String,
    pub customer_id: CustomerId,
    pub reservation_id: Option<ReservationId>,
    pub status: InvoiceStatus,
    pub issue_date: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub amount_paid: f64,
    pub notes: Option<String>,
    pub line_items: Vec<InvoiceLineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Build an unsaved invoice; totals are derived from the line items.
    pub fn draft(
        tenant_id: TenantId,
        customer_id: CustomerId,
        reservation_id: Option<ReservationId>,
        items: Vec<NewLineItem>,
        tax_rate: f64,
    ) -> Self {
        let id = InvoiceId::generate();
        let line_items: Vec<InvoiceLineItem> =
            items.into_iter().map(|i| i.into_line_item(id)).collect();
        let totals = compute_totals(line_items.iter().map(|l| l.amount).sum(), tax_rate);
        let now = Utc::now();
        Self {
            id,
            tenant_id,
            invoice_number: String::new(),
            customer_id,
            reservation_id,
            status: InvoiceStatus::Pending,
            issue_date: now,
            due_date: None,
            subtotal: totals.subtotal,
            tax_rate: totals.tax_rate,
            tax_amount: totals.tax_amount,
            total: totals.total,
            amount_paid: 0.0,
            notes: None,
            line_items,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn balance_due(&self) -> f64 {
        round_currency(self.total - self.amount_paid)
    }

    /// Settle `amount` against the invoice, moving it to PARTIALLY_PAID or PAID.
    pub fn apply_payment(&mut self, amount: f64) -> Result<(), String> {
        match self.status {
            InvoiceStatus::Cancelled => return Err("Cannot pay a cancelled invoice".into()),
            InvoiceStatus::Paid => return Err("Invoice is already paid".into()),
            _ => {}
        }
        if amount <= 0.0 {
            return Err("Payment amount must be positive".into());
        }
        if amount > self.balance_due() + CURRENCY_EPSILON {
            return Err(format!(
                "Payment of {:.2} exceeds balance due of {:.2}",
                amount,
                self.balance_due()
            ));
        }
        self.amount_paid = round_currency(self.amount_paid + amount);
        self.status = if self.balance_due() < CURRENCY_EPSILON {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Invoice number for the `sequence`-th invoice a tenant issued on `date`.
pub fn format_invoice_number(date: NaiveDate, sequence: u32) -> String {
    format!("INV-{}-{:04}", date.format("%Y%m%d"), sequence)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoice {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub reservation_id: Option<ReservationId>,
    pub line_items: Vec<NewLineItem>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
    pub customer_id: Option<CustomerId>,
    pub reservation_id: Option<ReservationId>,
    pub status: Option<InvoiceStatus>,
    /// Only invoices issued inside this window.
    pub issued: Option<TimeWindow>,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.customer_id.is_none_or(|id| invoice.customer_id == id)
            && self
                .reservation_id
                .is_none_or(|id| invoice.reservation_id == Some(id))
            && self.status.is_none_or(|s| invoice.status == s)
            && self.issued.is_none_or(|w| w.contains(invoice.issue_date))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    Check,
    GiftCard,
    AccountCredit,
}

define_text_enum!(PaymentMethod {
    Cash => "CASH",
    CreditCard => "CREDIT_CARD",
    DebitCard => "DEBIT_CARD",
    Check => "CHECK",
    GiftCard => "GIFT_CARD",
    AccountCredit => "ACCOUNT_CREDIT",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Completed,
}

define_text_enum!(PaymentStatus {
    Completed => "COMPLETED",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub customer_id: CustomerId,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Card slip, cheque number or gift card code.
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub amount: f64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPayment {
    pub fn into_payment(self, invoice: &Invoice) -> Payment {
        Payment {
            id: PaymentId::generate(),
            tenant_id: invoice.tenant_id,
            invoice_id: invoice.id,
            customer_id: invoice.customer_id,
            amount: round_currency(self.amount),
            method: self.method,
            status: PaymentStatus::Completed,
            reference: self.reference,
            notes: self.notes,
            paid_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub invoice_id: Option<InvoiceId>,
    pub customer_id: Option<CustomerId>,
    pub method: Option<PaymentMethod>,
    /// Only payments taken inside this window.
    pub paid: Option<TimeWindow>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &Payment) -> bool {
        self.invoice_id.is_none_or(|id| payment.invoice_id == id)
            && self.customer_id.is_none_or(|id| payment.customer_id == id)
            && self.method.is_none_or(|m| payment.method == m)
            && self.paid.is_none_or(|w| w.contains(payment.paid_at))
    }
}

/// Append-only audit row written with every payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTransaction {
    pub id: TransactionId,
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub payment_id: Option<PaymentId>,
    pub customer_id: CustomerId,
    pub amount: f64,
    pub payment_method: Option<PaymentMethod>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl FinancialTransaction {
    pub fn for_payment(invoice: &Invoice, payment: &Payment) -> Self {
        Self {
            id: TransactionId::generate(),
            tenant_id: payment.tenant_id,
            invoice_id: invoice.id,
            payment_id: Some(payment.id),
            customer_id: payment.customer_id,
            amount: payment.amount,
            payment_method: Some(payment.method),
            description: format!(
                "{} payment for invoice {}",
                payment.method, invoice.invoice_number
            ),
            created_at: payment.paid_at,
        }
    }
}

/// What a single payment wrote: the settled invoice, the payment and its
/// audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub invoice: Invoice,
    pub payment: Payment,
    pub transaction: FinancialTransaction,
}

/// Point-of-sale request: bill the items and take payment in one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub reservation_id: Option<ReservationId>,
    #[serde(default)]
    pub items: Vec<NewLineItem>,
    pub payment: CheckoutPayment,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayment {
    pub method: PaymentMethod,
    /// Defaults to the full invoice total.
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Idempotency key plus the fingerprint of the request body it was first used with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyKey {
    pub key: String,
    pub fingerprint: String,
}

/// Everything a checkout writes, prepared by the service layer.
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub idempotency: Option<IdempotencyKey>,
    pub invoice: Invoice,
    pub payment: Payment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    pub invoice: Invoice,
    pub payment: Payment,
    pub transaction: FinancialTransaction,
    /// True when an earlier checkout with the same idempotency key was returned.
    pub replayed: bool,
}
