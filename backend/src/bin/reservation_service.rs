//! Reservation service: resources, availability, services and add-ons,
//! reservations and imports, billing, checkout and reports.
//!
//! ```bash
//! cargo run --bin reservation-service
//! ```
//!
//! See [`tailtown::config`] for the environment variables.

use tailtown::http::{reservation_router, server};

const DEFAULT_PORT: u16 = 4003;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::run("reservation-service", DEFAULT_PORT, reservation_router).await
}
