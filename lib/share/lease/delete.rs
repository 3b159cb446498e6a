use core::ptr;

/// Reclaims the payload of a detached lease header.
///
/// A header invokes its deleter exactly once, when the last hard lease to
/// its payload is released, passing the pointer the header was created with.
/// Any `FnOnce(*mut T)` closure is a deleter.
pub trait Deleter<T: ?Sized> {
    /// Reclaims the value at `data`, consuming this deleter.
    ///
    /// # Safety
    ///
    /// `data` must satisfy whatever contract the deleter places on the
    /// pointers it reclaims, and must not be used again afterwards.
    unsafe fn delete(self, data: *mut T);
}

impl<T: ?Sized, F: FnOnce(*mut T)> Deleter<T> for F {
    #[inline]
    unsafe fn delete(self, data: *mut T) {
        self(data)
    }
}

/// Drops and deallocates a value allocated by `Box`. The default deleter of
/// detached leases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoxDelete;

impl<T: ?Sized> Deleter<T> for BoxDelete {
    /// Reconstitutes and drops the `Box` that allocated `data`; does nothing
    /// if `data` is null.
    ///
    /// # Safety
    ///
    /// `data` must be null, or have been returned by `Box::into_raw`.
    #[inline]
    unsafe fn delete(self, data: *mut T) {
        if !data.is_null() {
            drop(Box::from_raw(data));
        }
    }
}

/// Drops a value in place, without deallocating its memory. Tears down the
/// payload of colocated lease headers, whose storage is reclaimed together
/// with the header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DropInPlace;

impl<T: ?Sized> Deleter<T> for DropInPlace {
    /// Runs the destructor of the value at `data`; does nothing if `data`
    /// is null.
    ///
    /// # Safety
    ///
    /// `data` must be null, or point to an initialized value that is valid
    /// for `ptr::drop_in_place`.
    #[inline]
    unsafe fn delete(self, data: *mut T) {
        if !data.is_null() {
            ptr::drop_in_place(data);
        }
    }
}
