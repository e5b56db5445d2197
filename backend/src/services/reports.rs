//! Operational dashboard and revenue reporting.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::availability::occupied_resources;
use super::tenants::require_feature;
use crate::db::repository::FullRepository;
use crate::error::AppResult;
use crate::models::{
    features, round_currency, InvoiceFilter, InvoiceStatus, PaymentFilter, PaymentMethod,
    Reservation, ReservationFilter, ReservationStatus, ResourceFilter, ResourceType, Tenant,
    TimeWindow,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub reservation_id: crate::models::ReservationId,
    pub pet_id: crate::models::PetId,
    pub resource_id: Option<crate::models::ResourceId>,
    pub status: ReservationStatus,
    pub at: chrono::DateTime<chrono::Utc>,
}

impl Movement {
    fn check_in(r: &Reservation) -> Self {
        Self {
            reservation_id: r.id,
            pet_id: r.pet_id,
            resource_id: r.resource_id,
            status: r.status,
            at: r.start_date,
        }
    }

    fn check_out(r: &Reservation) -> Self {
        Self {
            at: r.end_date,
            ..Self::check_in(r)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub total: u64,
    pub occupied: u64,
    /// `occupied / total`, 0 when there are no resources of this type.
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTotals {
    pub invoiced: f64,
    pub collected: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub date: NaiveDate,
    pub check_ins: Vec<Movement>,
    pub check_outs: Vec<Movement>,
    pub occupancy: Vec<Occupancy>,
    pub status_counts: BTreeMap<String, u64>,
    pub revenue: RevenueTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodTotal {
    pub method: PaymentMethod,
    pub count: u64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub invoiced: f64,
    pub collected: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub start_date: chrono::DateTime<chrono::Utc>,
    pub end_date: chrono::DateTime<chrono::Utc>,
    pub invoice_count: u64,
    pub invoiced: f64,
    pub tax: f64,
    pub collected: f64,
    pub by_method: Vec<MethodTotal>,
    pub by_day: Vec<DailyRevenue>,
}

/// What the front desk sees for one day.
pub async fn dashboard<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: &Tenant,
    date: NaiveDate,
) -> AppResult<Dashboard> {
    require_feature(tenant, features::REPORTS)?;
    let day = TimeWindow::for_day(date);

    // Overlap alone misses stays ending exactly at midnight, which are that
    // day's check-outs; reach back one microsecond and filter below.
    let fetch = TimeWindow {
        start: day.start - Duration::microseconds(1),
        end: day.end,
    };
    let reservations: Vec<Reservation> = repo
        .find_reservations(
            tenant.id,
            &ReservationFilter {
                window: Some(fetch),
                ..Default::default()
            },
        )
        .await?
        .into_iter()
        .filter(|r| r.window().overlaps(&day) || day.contains(r.end_date))
        .collect();
    let happening = |r: &&Reservation| {
        !matches!(r.status, ReservationStatus::Cancelled | ReservationStatus::NoShow)
    };
    let check_ins = reservations
        .iter()
        .filter(happening)
        .filter(|r| day.contains(r.start_date))
        .map(Movement::check_in)
        .collect();
    let check_outs = reservations
        .iter()
        .filter(happening)
        .filter(|r| day.contains(r.end_date))
        .map(Movement::check_out)
        .collect();

    let mut status_counts = BTreeMap::new();
    for r in &reservations {
        *status_counts.entry(r.status.as_str().to_string()).or_insert(0) += 1;
    }

    let resources = repo
        .list_resources(
            tenant.id,
            &ResourceFilter {
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await?;
    let occupied = occupied_resources(repo, tenant.id, day).await?;
    let occupancy = ResourceType::ALL
        .iter()
        .map(|&resource_type| {
            let of_type: Vec<_> = resources
                .iter()
                .filter(|r| r.resource_type == resource_type)
                .collect();
            let total = of_type.len() as u64;
            let busy = of_type.iter().filter(|r| occupied.contains(&r.id)).count() as u64;
            Occupancy {
                resource_type,
                total,
                occupied: busy,
                rate: if total == 0 {
                    0.0
                } else {
                    (busy as f64 / total as f64 * 10_000.0).round() / 10_000.0
                },
            }
        })
        .collect();

    let report = revenue_in(repo, tenant, day).await?;
    Ok(Dashboard {
        date,
        check_ins,
        check_outs,
        occupancy,
        status_counts,
        revenue: RevenueTotals {
            invoiced: report.invoiced,
            collected: report.collected,
        },
    })
}

/// Invoiced and collected amounts for `window`, broken down by payment
/// method and by day. Cancelled invoices are excluded.
pub async fn revenue<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: &Tenant,
    window: TimeWindow,
) -> AppResult<RevenueReport> {
    require_feature(tenant, features::REPORTS)?;
    revenue_in(repo, tenant, window).await
}

async fn revenue_in<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: &Tenant,
    window: TimeWindow,
) -> AppResult<RevenueReport> {
    let invoices: Vec<_> = repo
        .find_invoices(
            tenant.id,
            &InvoiceFilter {
                issued: Some(window),
                ..Default::default()
            },
        )
        .await?
        .into_iter()
        .filter(|i| i.status != InvoiceStatus::Cancelled)
        .collect();
    let payments = repo
        .list_payments(
            tenant.id,
            &PaymentFilter {
                paid: Some(window),
                ..Default::default()
            },
        )
        .await?;

    let mut by_day: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    let mut by_method: BTreeMap<&'static str, MethodTotal> = BTreeMap::new();
    for invoice in &invoices {
        by_day.entry(invoice.issue_date.date_naive()).or_default().0 += invoice.total;
    }
    for payment in &payments {
        by_day.entry(payment.paid_at.date_naive()).or_default().1 += payment.amount;
        let entry = by_method.entry(payment.method.as_str()).or_insert(MethodTotal {
            method: payment.method,
            count: 0,
            amount: 0.0,
        });
        entry.count += 1;
        entry.amount += payment.amount;
    }

    Ok(RevenueReport {
        start_date: window.start,
        end_date: window.end,
        invoice_count: invoices.len() as u64,
        invoiced: round_currency(invoices.iter().map(|i| i.total).sum()),
        tax: round_currency(invoices.iter().map(|i| i.tax_amount).sum()),
        collected: round_currency(payments.iter().map(|p| p.amount).sum()),
        by_method: by_method
            .into_values()
            .map(|m| MethodTotal {
                amount: round_currency(m.amount),
                ..m
            })
            .collect(),
        by_day: by_day
            .into_iter()
            .map(|(date, (invoiced, collected))| DailyRevenue {
                date,
                invoiced: round_currency(invoiced),
                collected: round_currency(collected),
            })
            .collect(),
    })
}
