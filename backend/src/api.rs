//! Public API surface: the types that cross the HTTP boundary.
//!
//! Everything here derives `Serialize`/`Deserialize` with camelCase field
//! names, so clients written against this crate see the same JSON as the
//! services emit.

pub use crate::error::{AppError, AppResult, ErrorType};
pub use crate::models::*;
pub use crate::services::auth::{Claims, LoginRequest, LoginResponse, RefreshRequest, TokenPair};
pub use crate::services::availability::{
    Availability, AvailabilityQuery, AvailableResourcesQuery, BatchAvailabilityEntry,
    BatchAvailabilityRequest, ConflictingReservation, WindowQuery,
};
pub use crate::services::import::{ImportRequest, ImportSummary};
pub use crate::services::job_tracker::{Job, JobStatus, LogEntry, LogLevel};
pub use crate::services::reports::{
    DailyRevenue, Dashboard, MethodTotal, Movement, Occupancy, RevenueReport, RevenueTotals,
};
