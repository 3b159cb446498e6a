//! Memory block allocators.
//!
//! Every lease header is allocated by a `Hold`, and remembers the `Hold` that
//! allocated it so that the header's block can be returned to it. Leases
//! always allocate from the global hold; the `Hold` seam exists so that
//! allocation failure paths can be exercised deterministically.

use core::alloc::Layout;
use core::ptr::NonNull;
use thiserror::Error;

/// Memory block allocation error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HoldError {
    /// Insufficient available memory.
    #[error("out of memory allocating {size} bytes aligned to {align}")]
    OutOfMemory {
        /// Requested block size in bytes.
        size: usize,
        /// Requested block alignment.
        align: usize,
    },
    /// Unsupported operation; will never succeed.
    #[error("unsupported allocation: {0}")]
    Unsupported(&'static str),
}

impl HoldError {
    /// Returns an `OutOfMemory` error for a failed allocation of `layout`.
    #[inline]
    pub(crate) fn out_of_memory(layout: Layout) -> HoldError {
        HoldError::OutOfMemory { size: layout.size(), align: layout.align() }
    }
}

/// Memory block allocator.
///
/// # Safety
///
/// `alloc` must return a block valid for reads and writes of `layout`, and
/// `dealloc` must accept any block returned by `alloc` on the same `Hold`,
/// together with the layout it was allocated with.
pub(crate) unsafe trait Hold {
    /// Returns a pointer to an uninitialized memory block sized and aligned
    /// to `layout`; returns an `Err` if the allocation fails.
    unsafe fn alloc(&self, layout: Layout) -> Result<NonNull<u8>, HoldError>;

    /// Releases a memory `block` previously allocated by this `Hold` with
    /// the given `layout`.
    unsafe fn dealloc(&self, block: NonNull<u8>, layout: Layout);
}

impl dyn Hold {
    /// Returns a handle to the global `Hold` allocator.
    #[inline]
    pub(crate) fn global() -> &'static dyn Hold {
        &GLOBAL_HOLD
    }
}

/// `Hold` backed by the process-wide global allocator.
struct GlobalHold;

static GLOBAL_HOLD: GlobalHold = GlobalHold;

unsafe impl Hold for GlobalHold {
    unsafe fn alloc(&self, layout: Layout) -> Result<NonNull<u8>, HoldError> {
        // The global allocator has undefined behavior for zero-sized blocks.
        if layout.size() == 0 {
            return Err(HoldError::Unsupported("zero-sized block"));
        }
        // Allocate the block, mapping a null result to an allocation error.
        match NonNull::new(std::alloc::alloc(layout)) {
            Some(block) => Ok(block),
            None => Err(HoldError::out_of_memory(layout)),
        }
    }

    unsafe fn dealloc(&self, block: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(block.as_ptr(), layout);
    }
}
