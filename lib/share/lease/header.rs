use core::alloc::Layout;
use core::cell::Cell;
use core::mem::{self, ManuallyDrop, MaybeUninit};
use core::ptr::{self, NonNull};
use log::{debug, trace};
use crate::alloc::{Hold, HoldError};
use crate::lease::{Deleter, DropInPlace};

/// Maximum number of hard references per header. Every `Hard` lease holds
/// its own hard reference to its header.
pub const HARD_COUNT_MAX: usize = isize::MAX as usize;

/// Maximum number of soft references per header. Every `Soft` lease holds
/// its own soft reference to its header. The last hard lease to a header
/// temporarily acquires a soft reference while it drops the payload.
pub const SOFT_COUNT_MAX: usize = isize::MAX as usize;

/// Reference counting metadata shared by every lease to a payload.
///
/// A `Header` is always the first field of a `#[repr(C)]` block type that
/// implements `Control`, so a pointer to the header is also a pointer to its
/// block. The header's function pointers dispatch to the block type that
/// was erased when the header was allocated.
#[repr(C)]
pub(crate) struct Header {
    /// Number of hard references; the payload is live while non-zero.
    hard: Cell<usize>,
    /// Number of soft references.
    soft: Cell<usize>,
    /// Hold that allocated the enclosing block.
    hold: &'static dyn Hold,
    /// Drops the payload of the enclosing block, without releasing memory.
    drop_payload: unsafe fn(NonNull<Header>),
    /// Returns the enclosing block to its hold.
    release: unsafe fn(NonNull<Header>),
}

/// A memory block whose first field is a `Header` governing some payload.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` with a `Header` as their first field.
pub(crate) unsafe trait Control: Sized {
    /// Drops the payload governed by `block`, exactly once, without
    /// releasing the block's memory.
    unsafe fn drop_payload(block: NonNull<Self>);
}

impl Header {
    /// Returns a header for a newly allocated `B` block from `hold`, holding
    /// a single hard reference.
    #[inline]
    fn new<B: Control>(hold: &'static dyn Hold) -> Header {
        Header {
            hard: Cell::new(1),
            soft: Cell::new(0),
            hold: hold,
            drop_payload: erased_drop_payload::<B>,
            release: erased_release::<B>,
        }
    }

    /// Returns the number of hard references to the header.
    #[inline]
    pub(crate) fn hard_count(&self) -> usize {
        self.hard.get()
    }

    /// Returns the number of soft references to the header.
    #[inline]
    pub(crate) fn soft_count(&self) -> usize {
        self.soft.get()
    }

    /// Acquires a hard reference to a header whose payload is live.
    ///
    /// # Panics
    ///
    /// Panics if the incremented hard count would exceed `HARD_COUNT_MAX`.
    #[inline]
    pub(crate) unsafe fn acquire_hard(header: NonNull<Header>) {
        let header = header.as_ref();
        // Load the hard reference count.
        let old_hard_count = header.hard.get();
        debug_assert!(old_hard_count != 0, "acquired hard reference to dropped payload");
        // Check if the incremented hard reference count overflows.
        if old_hard_count >= HARD_COUNT_MAX {
            panic!("hard count overflow");
        }
        // Store the incremented hard reference count.
        header.hard.set(old_hard_count + 1);
    }

    /// Releases a hard reference to the header. Drops the payload if this
    /// was the last hard reference, and releases the header's block if no
    /// soft references remain.
    pub(crate) unsafe fn release_hard(header: NonNull<Header>) {
        // Decrement the hard reference count, checking for underflow.
        let new_hard_count = {
            let header = header.as_ref();
            let new_hard_count = match header.hard.get().checked_sub(1) {
                Some(hard_count) => hard_count,
                None => panic!("hard count underflow"),
            };
            header.hard.set(new_hard_count);
            new_hard_count
        };
        // Check if any hard references remain.
        if new_hard_count != 0 {
            return;
        }
        // Convert our hard reference into a soft reference, so that soft
        // leases dropped by the payload can't release the header under us.
        Header::acquire_soft(header);
        // Release the soft reference once the payload drops, or unwinds,
        // releasing the header if it was the last.
        let _guard = Retain(header);
        trace!("dropping payload of header {:p}", header);
        // Drop the payload.
        let drop_payload = header.as_ref().drop_payload;
        drop_payload(header);
    }

    /// Acquires a soft reference to the header.
    ///
    /// # Panics
    ///
    /// Panics if the incremented soft count would exceed `SOFT_COUNT_MAX`.
    #[inline]
    pub(crate) unsafe fn acquire_soft(header: NonNull<Header>) {
        let header = header.as_ref();
        // Load the soft reference count.
        let old_soft_count = header.soft.get();
        // Check if the incremented soft reference count overflows.
        if old_soft_count >= SOFT_COUNT_MAX {
            panic!("soft count overflow");
        }
        // Store the incremented soft reference count.
        header.soft.set(old_soft_count + 1);
    }

    /// Releases a soft reference to the header. Releases the header's block
    /// if no hard or soft references remain.
    pub(crate) unsafe fn release_soft(header: NonNull<Header>) {
        // Decrement the soft reference count, checking for underflow.
        let (hard_count, new_soft_count) = {
            let header = header.as_ref();
            let new_soft_count = match header.soft.get().checked_sub(1) {
                Some(soft_count) => soft_count,
                None => panic!("soft count underflow"),
            };
            header.soft.set(new_soft_count);
            (header.hard.get(), new_soft_count)
        };
        // Check if all references have been released.
        if hard_count == 0 && new_soft_count == 0 {
            Header::release(header);
        }
    }

    /// Returns the header's block to the hold that allocated it.
    unsafe fn release(header: NonNull<Header>) {
        trace!("releasing header {:p}", header);
        let release = header.as_ref().release;
        release(header);
    }
}

/// Releases the soft reference a header holds on itself while its payload
/// drops.
struct Retain(NonNull<Header>);

impl Drop for Retain {
    fn drop(&mut self) {
        unsafe { Header::release_soft(self.0) };
    }
}

unsafe fn erased_drop_payload<B: Control>(header: NonNull<Header>) {
    B::drop_payload(header.cast::<B>());
}

unsafe fn erased_release<B: Control>(header: NonNull<Header>) {
    let hold = header.as_ref().hold;
    hold.dealloc(header.cast::<u8>(), Layout::new::<B>());
}

/// Allocates an uninitialized `B` block in `hold`, with an initialized header.
unsafe fn alloc_block<B: Control>(hold: &'static dyn Hold) -> Result<NonNull<B>, HoldError> {
    // Compute the layout of the block.
    let layout = Layout::new::<B>();
    // Allocate the block, bailing on failure.
    let block = match hold.alloc(layout) {
        Ok(block) => block.cast::<B>(),
        Err(error) => {
            debug!("failed to allocate {} byte lease header: {}", layout.size(), error);
            return Err(error);
        },
    };
    // Initialize the header, which leads the block.
    ptr::write(block.as_ptr() as *mut Header, Header::new::<B>(hold));
    trace!("allocated {} byte lease header at {:p}", layout.size(), block);
    Ok(block)
}

/// Header for a payload allocated separately from the header, reclaimed by
/// a `Deleter`. Parameterized by the exact allocated type of the payload.
#[repr(C)]
pub(crate) struct Detached<Y: ?Sized, D> {
    header: Header,
    /// Taken when the payload drops.
    deleter: ManuallyDrop<D>,
    /// Pointer to the payload, exactly as it was allocated; may be null.
    data: *mut Y,
}

impl<Y: ?Sized, D: Deleter<Y>> Detached<Y, D> {
    /// Allocates a header in `hold` that governs the payload at `data`, and
    /// reclaims it with `deleter`. Invokes `deleter` on `data` before
    /// returning an error if the allocation fails.
    pub(crate) unsafe fn alloc(hold: &'static dyn Hold, data: *mut Y, deleter: D)
        -> Result<NonNull<Header>, HoldError>
    {
        match alloc_block::<Self>(hold) {
            Ok(block) => {
                let block = block.as_ptr();
                ptr::write(ptr::addr_of_mut!((*block).deleter), ManuallyDrop::new(deleter));
                ptr::write(ptr::addr_of_mut!((*block).data), data);
                Ok(NonNull::new_unchecked(block as *mut Header))
            },
            Err(error) => {
                // Reclaim the payload; nothing else ever will.
                deleter.delete(data);
                Err(error)
            },
        }
    }
}

unsafe impl<Y: ?Sized, D: Deleter<Y>> Control for Detached<Y, D> {
    unsafe fn drop_payload(block: NonNull<Self>) {
        let block = block.as_ptr();
        let deleter = ManuallyDrop::take(&mut (*block).deleter);
        deleter.delete((*block).data);
    }
}

/// Header with its payload stored inline, in the same allocation.
#[repr(C)]
pub(crate) struct Colocated<T> {
    header: Header,
    /// Initialized from construction until the payload drops.
    value: MaybeUninit<T>,
}

impl<T> Colocated<T> {
    /// Allocates a header in `hold` together with storage for its payload,
    /// then initializes the payload with the result of `f`. Releases the
    /// block before returning an error if `f` fails or panics.
    pub(crate) unsafe fn alloc_with<E, F>(hold: &'static dyn Hold, f: F)
        -> Result<(NonNull<Header>, NonNull<T>), E>
        where F: FnOnce() -> Result<T, E>,
              E: From<HoldError>,
    {
        // Allocate the block; nothing has been constructed on failure.
        let block = alloc_block::<Self>(hold)?;
        // Release the block if construction fails or unwinds.
        let guard = Abandon(block);
        let value = f()?;
        mem::forget(guard);
        // Move the payload into the block's inline storage.
        let data = Colocated::value_ptr(block);
        ptr::write(data.as_ptr(), value);
        Ok((block.cast::<Header>(), data))
    }

    /// Returns a pointer to the inline payload storage of `block`.
    #[inline]
    fn value_ptr(block: NonNull<Self>) -> NonNull<T> {
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*block.as_ptr()).value) as *mut T) }
    }
}

unsafe impl<T> Control for Colocated<T> {
    unsafe fn drop_payload(block: NonNull<Self>) {
        DropInPlace.delete(Colocated::value_ptr(block).as_ptr());
    }
}

/// Releases a colocated block whose payload was never constructed.
struct Abandon<T>(NonNull<Colocated<T>>);

impl<T> Drop for Abandon<T> {
    fn drop(&mut self) {
        unsafe { Header::release(self.0.cast::<Header>()) };
    }
}
