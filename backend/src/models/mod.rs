//! Domain models shared by both services.
//!
//! Every tenant-scoped entity carries a [`TenantId`]; identifiers are UUID
//! newtypes generated by [`define_id_type!`](crate::define_id_type) so a pet id
//! can never be passed where a customer id is expected.

pub mod billing;
pub mod catalog;
pub mod customer;
pub mod macros;
pub mod page;
pub mod reservation;
pub mod resource;
pub mod staff;
pub mod tenant;
pub mod time;
pub mod usage;

pub use billing::*;
pub use catalog::*;
pub use customer::*;
pub use page::*;
pub use reservation::*;
pub use resource::*;
pub use staff::*;
pub use tenant::*;
pub use time::*;
pub use usage::*;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates.
pub(crate) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}
