//! # Shared Ownership Leases
//!
//! Reference counted ownership of heap allocated values, with strong and
//! weak references, pluggable deletion, aliasing, and colocated allocation.
//!
//! ## Design goals
//!
//! __Exactly once__
//! A shared value is dropped exactly once, at the moment its last strong
//! reference is released, no matter how many weak references remain.
//!
//! __Exact teardown__
//! A shared value is always dropped as the type it was allocated as, even
//! when every outstanding lease views it through a projection or an unsized
//! coercion.
//!
//! __Aliasing__
//! A lease may point at any sub-object of a shared value, while the shared
//! value's header remains the sole authority on when to drop it.
//!
//! __Compact__
//! Values constructed by a lease share a single allocation with their
//! reference counting header.
//!
//! __Leak free__
//! Allocation failures never leak the value being shared.
//!
//! ## Concepts
//!
//! - _Header_: shared bookkeeping that tracks the hard and soft reference
//!   counts of a memory block, and knows how to drop the block's payload.
//! - _Payload_: the value whose lifetime a header governs.
//! - _Hard reference_: a strong reference that keeps a payload alive.
//! - _Soft reference_: a weak reference that keeps a header, but not its
//!   payload, alive.
//! - _Detached block_: a header allocated separately from its payload,
//!   paired with a `Deleter` that reclaims the payload.
//! - _Colocated block_: a header and its payload in a single allocation.
//! - _Aliasing_: a lease whose data pointer differs from the address its
//!   header manages.
//! - _Promotion_: conversion of a soft lease into a hard lease, conditional
//!   on the payload still being alive.
//!
//! ## Components
//!
//! __Memory allocators__
//! - __[`HoldError`]__: allocation failure of a memory block.
//!
//! __Memory leases__
//! - __[`Hard`]__: a dereferenceable, strong reference to a shared payload.
//! - __[`Soft`]__: an undereferenceable, weak reference to a shared payload.
//!
//! __Deletion strategies__
//! - __[`Deleter`]__: reclaims a detached payload, exactly once.
//! - __[`BoxDelete`]__: drops and deallocates a boxed payload.
//! - __[`DropInPlace`]__: drops a payload without deallocating it.
//!
//! ## Threading
//!
//! Reference counts are not atomic. Leases are neither `Send` nor `Sync`, so
//! every lease sharing a header is confined to a single thread.
//!
//! # Examples
//!
//! ```
//! use tg_share::{Hard, Soft};
//!
//! let a = Hard::new(5);
//! let b = a.clone();
//! assert_eq!(a.hard_count(), 2);
//! drop(a);
//! assert_eq!(*b, 5);
//!
//! let w = Soft::from(&b);
//! drop(b);
//! assert!(w.lock().is_null());
//! ```
//!
//! [`HoldError`]: alloc::HoldError
//! [`Hard`]: lease::Hard
//! [`Soft`]: lease::Soft
//! [`Deleter`]: lease::Deleter
//! [`BoxDelete`]: lease::BoxDelete
//! [`DropInPlace`]: lease::DropInPlace

pub mod alloc;
pub mod lease;

pub use crate::alloc::HoldError;
pub use crate::lease::{Hard, Soft, LeaseError};
pub use crate::lease::{Deleter, BoxDelete, DropInPlace};
pub use crate::lease::{HARD_COUNT_MAX, SOFT_COUNT_MAX};
