//! HTTP surface of the two services.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Middleware: CORS, trace, error envelope, auth, tenant,   │
//! │  rate limit, usage metering                               │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Handlers: extract tenant + typed input, call a service,  │
//! │  wrap the result in the success envelope                  │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  crate::services → crate::db repositories                 │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod router;
pub mod server;
pub mod state;

pub use router::{customer_router, reservation_router};
pub use state::AppState;
