//! Memory ownership model.
//!
//! # Leases
//!
//! A lease is a reference to a payload governed by a shared, reference
//! counting `Header`. Leases come in two strengths:
//! - __[`Hard`]__: a dereferenceable strong owner of a payload. A payload is
//!   dropped exactly when its last hard lease is released.
//! - __[`Soft`]__: an undereferenceable weak owner of a payload. A soft lease
//!   keeps its header alive, but not its payload; it can be promoted to a
//!   hard lease for as long as the payload remains alive.
//!
//! A header is released once both its hard and soft reference counts reach
//! zero, by whichever release observes the second count reach zero.
//!
//! ## Headers
//!
//! Headers come in two layouts, chosen by the constructor that creates the
//! first hard lease:
//! - _Detached_ headers, created by `Hard::from_box` and `Hard::from_raw_with`,
//!   govern a separately allocated payload, and reclaim it with a
//!   [`Deleter`]. A detached header remembers the exact type its payload was
//!   allocated as, so the payload is always torn down as that type.
//! - _Colocated_ headers, created by `Hard::new` and friends, store their
//!   payload inline, in the same allocation. A colocated payload is dropped
//!   in place when its last hard lease is released; its memory is reclaimed
//!   together with the header.
//!
//! ## Aliasing
//!
//! A lease's data pointer is independent of its header. `Hard::project`,
//! `Hard::map`, and `Hard::alias` produce leases that point at a field of a
//! payload, or at a payload viewed through an unsized coercion, while the
//! original header continues to decide when the whole payload drops.
//!
//! [`Hard`]: Hard
//! [`Soft`]: Soft
//! [`Deleter`]: Deleter

use thiserror::Error;
use crate::alloc::HoldError;

mod delete;
mod header;
mod hard;
mod soft;

pub use self::delete::{Deleter, BoxDelete, DropInPlace};
pub use self::header::{HARD_COUNT_MAX, SOFT_COUNT_MAX};
pub(crate) use self::header::{Header, Detached, Colocated};
pub use self::hard::Hard;
pub use self::soft::Soft;

/// Lease acquisition error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LeaseError {
    /// Payload already dropped.
    #[error("leased payload already dropped")]
    Cleared,
    /// Header allocation failed.
    #[error(transparent)]
    Hold(#[from] HoldError),
}
