use core::fmt::{self, Debug, Pointer, Formatter};
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;
use crate::lease::{Hard, Header, LeaseError};
use crate::lease::hard::address;

/// A weak reference to a payload governed by a shared, reference counted
/// `Header`.
///
/// A `Soft` lease keeps its header alive, but not its payload, and so can't
/// be dereferenced. Use [`Soft::lock`] to obtain a `Hard` lease to the
/// payload for as long as some other hard lease keeps it alive.
///
/// # Examples
///
/// ```
/// # use tg_share::{Hard, Soft};
/// let x = Hard::new(5);
/// let y = Soft::from(&x);
/// assert_eq!(*y.lock(), 5);
/// drop(x);
/// assert!(y.is_expired());
/// assert!(y.lock().is_null());
/// ```
pub struct Soft<T: ?Sized> {
    /// Pointer to the shared header, or `None` if this lease is empty.
    header: Option<NonNull<Header>>,
    /// Pointer to the leased value; never dereferenced by a soft lease.
    data: Option<NonNull<T>>,
    /// Variant over T, without drop check.
    data_lifetime: PhantomData<*const T>,
}

impl<T: ?Sized> Soft<T> {
    /// Returns an empty soft lease, which is always expired.
    #[inline]
    pub const fn empty() -> Soft<T> {
        Soft {
            header: None,
            data: None,
            data_lifetime: PhantomData,
        }
    }

    /// Returns the number of hard references to the shared payload, or zero
    /// if this lease is empty.
    #[inline]
    pub fn hard_count(&self) -> usize {
        match self.header {
            Some(header) => unsafe { header.as_ref().hard_count() },
            None => 0,
        }
    }

    /// Returns the number of soft references to the shared payload, or zero
    /// if this lease is empty.
    #[inline]
    pub fn soft_count(&self) -> usize {
        match self.header {
            Some(header) => unsafe { header.as_ref().soft_count() },
            None => 0,
        }
    }

    /// Returns `true` if the shared payload has been dropped, or if this
    /// lease is empty.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.hard_count() == 0
    }

    /// Returns `true` if this lease holds no header.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.header.is_none()
    }

    /// Returns the data pointer of this lease, without regard to whether the
    /// payload is still alive. The pointer must not be dereferenced unless a
    /// hard lease to the same payload is known to be live.
    #[inline]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.data
    }

    /// Returns a new hard lease to the shared payload, or an empty, null
    /// lease if the payload has been dropped.
    ///
    /// # Panics
    ///
    /// Panics if the incremented hard count would exceed `HARD_COUNT_MAX`.
    pub fn lock(&self) -> Hard<T> {
        match self.try_to_hard() {
            Ok(lease) => lease,
            Err(_) => Hard::empty(),
        }
    }

    /// Returns a new hard lease to the shared payload; returns
    /// `Err(LeaseError::Cleared)` if the payload has been dropped, or if
    /// this lease is empty.
    pub fn try_to_hard(&self) -> Result<Hard<T>, LeaseError> {
        // Check that this lease has a header.
        let header = match self.header {
            Some(header) => header,
            None => return Err(LeaseError::Cleared),
        };
        // Check that the payload is still alive.
        if unsafe { header.as_ref().hard_count() } == 0 {
            return Err(LeaseError::Cleared);
        }
        // Acquire a new hard reference to the live payload.
        Ok(unsafe { Hard::from_soft_unchecked(header, self.data) })
    }

    /// Releases this lease's soft reference, if any, leaving it empty.
    #[inline]
    pub fn reset(&mut self) {
        drop(mem::replace(self, Soft::empty()));
    }

    /// Exchanges the headers and data pointers of two soft leases.
    #[inline]
    pub fn swap(&mut self, that: &mut Soft<T>) {
        mem::swap(self, that);
    }
}

impl<T: ?Sized> From<&Hard<T>> for Soft<T> {
    /// Returns a new soft lease to the payload of `hard`, sharing its header.
    ///
    /// # Panics
    ///
    /// Panics if the incremented soft count would exceed `SOFT_COUNT_MAX`.
    fn from(hard: &Hard<T>) -> Soft<T> {
        let header = hard.header();
        // Acquire a new soft reference, if the hard lease isn't empty.
        if let Some(header) = header {
            unsafe { Header::acquire_soft(header) };
        }
        Soft {
            header: header,
            data: hard.as_ptr(),
            data_lifetime: PhantomData,
        }
    }
}

impl<T: ?Sized> Clone for Soft<T> {
    fn clone(&self) -> Soft<T> {
        // Acquire a new soft reference, if this lease isn't empty.
        if let Some(header) = self.header {
            unsafe { Header::acquire_soft(header) };
        }
        Soft {
            header: self.header,
            data: self.data,
            data_lifetime: PhantomData,
        }
    }
}

impl<T: ?Sized> Drop for Soft<T> {
    fn drop(&mut self) {
        if let Some(header) = self.header {
            unsafe { Header::release_soft(header) };
        }
    }
}

impl<T: ?Sized> Default for Soft<T> {
    #[inline]
    fn default() -> Soft<T> {
        Soft::empty()
    }
}

impl<T: ?Sized> Debug for Soft<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("(Soft)")
    }
}

impl<T: ?Sized> Pointer for Soft<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Pointer::fmt(&address(self.data), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_soft_is_expired() {
        let x = Soft::<u8>::empty();
        assert!(x.is_empty());
        assert!(x.is_expired());
        assert_eq!(x.soft_count(), 0);
        assert_eq!(x.try_to_hard().err(), Some(LeaseError::Cleared));
    }

    #[test]
    fn test_soft_from_empty_hard_is_empty() {
        let x = Hard::<u8>::empty();
        let y = Soft::from(&x);
        assert!(y.is_empty());
        assert!(y.lock().is_empty());
    }

    #[test]
    fn test_soft_lock_shares_data_pointer() {
        let x = Hard::new([1u16, 2, 3]);
        let y = x.to_soft();
        let z = y.lock();
        assert_eq!(z.as_ptr(), x.as_ptr());
        assert_eq!(y.as_ptr(), x.as_ptr());
        assert_eq!(x.hard_count(), 2);
        assert_eq!(x.soft_count(), 1);
    }
}
