//! Domain module
//!
//! Core domain types and business logic.

pub mod context;
pub mod error;
pub mod membership;
pub mod pagination;
pub mod types;

pub use context::OperationContext;
pub use error::DomainError;
pub use membership::{Membership, MEMBERS_FIELD};
pub use pagination::{paginate, Page, DEFAULT_PAGE_SIZE};
pub use types::{upsert_pair, Address, AutoSchedule, DomainTag, MaintainContent, PairInfo};
