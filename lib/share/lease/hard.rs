use core::fmt::{self, Debug, Display, Pointer, Formatter};
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::mem;
use core::ops::Deref;
use core::ptr::{self, NonNull};
use crate::alloc::{Hold, HoldError};
use crate::lease::{BoxDelete, Colocated, Deleter, Detached, Header, Soft};

/// A strong reference to a payload governed by a shared, reference counted
/// `Header`.
///
/// A `Hard` lease is either _empty_, holding no header, or holds one hard
/// reference to its header. Independently, its data pointer is either null
/// or points at the leased value, which need not be the header's payload
/// itself; see [`Hard::project`] and [`Hard::alias`].
///
/// # Examples
///
/// Share a value constructed in a single allocation with its header:
///
/// ```
/// # use tg_share::Hard;
/// let x = Hard::new(5);
/// let y = x.clone();
/// # assert_eq!(x.hard_count(), 2);
/// # assert_eq!(*y, 5);
/// ```
///
/// Share a trait object, dropping the payload as its concrete type:
///
/// ```
/// # use tg_share::Hard;
/// # use core::fmt::Display;
/// let x = Hard::new(String::from("lease")).map(|s| s as &(dyn Display + 'static));
/// # assert_eq!(x.to_string(), "lease");
/// ```
pub struct Hard<T: ?Sized> {
    /// Pointer to the shared header, or `None` if this lease is empty.
    header: Option<NonNull<Header>>,
    /// Pointer to the leased value, or `None` if this lease is null.
    data: Option<NonNull<T>>,
    /// Variant over T, with drop check.
    data_lifetime: PhantomData<T>,
}

impl<T: ?Sized> Hard<T> {
    /// Returns an empty, null lease.
    #[inline]
    pub const fn empty() -> Hard<T> {
        Hard {
            header: None,
            data: None,
            data_lifetime: PhantomData,
        }
    }

    /// Constructs a `Hard` lease from its constituent parts, taking over one
    /// hard reference to `header`, if present.
    #[inline]
    pub(crate) unsafe fn from_raw_parts(header: Option<NonNull<Header>>, data: Option<NonNull<T>>) -> Hard<T> {
        Hard {
            header: header,
            data: data,
            data_lifetime: PhantomData,
        }
    }

    /// Acquires a new hard reference to the live payload of `header`, and
    /// returns a lease to `data` that holds it.
    #[inline]
    pub(crate) unsafe fn from_soft_unchecked(header: NonNull<Header>, data: Option<NonNull<T>>) -> Hard<T> {
        Header::acquire_hard(header);
        Hard::from_raw_parts(Some(header), data)
    }

    pub(crate) unsafe fn try_hold_from_raw_with<D>(hold: &'static dyn Hold, data: *mut T, deleter: D)
        -> Result<Hard<T>, HoldError>
        where D: Deleter<T> + 'static
    {
        // Allocate a detached header; reclaims the payload on failure.
        let header = Detached::alloc(hold, data, deleter)?;
        // Return a new lease holding the header's initial hard reference.
        Ok(Hard::from_raw_parts(Some(header), NonNull::new(data)))
    }

    /// Returns a new lease to the payload at `data`, which `deleter` will
    /// reclaim when the last hard lease to it is released; returns an error
    /// if the header can't be allocated, after invoking `deleter` on `data`.
    ///
    /// A null `data` pointer yields a non-empty, null lease; `deleter` is
    /// still invoked on it, once.
    ///
    /// # Safety
    ///
    /// `data` must satisfy the contract of `deleter`, must remain valid until
    /// `deleter` is invoked, and must not be governed by any other header.
    pub unsafe fn try_from_raw_with<D>(data: *mut T, deleter: D) -> Result<Hard<T>, HoldError>
        where D: Deleter<T> + 'static
    {
        Hard::try_hold_from_raw_with(<dyn Hold>::global(), data, deleter)
    }

    /// Returns a new lease to the payload at `data`, which `deleter` will
    /// reclaim when the last hard lease to it is released.
    ///
    /// # Safety
    ///
    /// `data` must satisfy the contract of `deleter`, must remain valid until
    /// `deleter` is invoked, and must not be governed by any other header.
    ///
    /// # Panics
    ///
    /// Panics if the header can't be allocated, after invoking `deleter`
    /// on `data`.
    pub unsafe fn from_raw_with<D>(data: *mut T, deleter: D) -> Hard<T>
        where D: Deleter<T> + 'static
    {
        match Hard::try_from_raw_with(data, deleter) {
            Ok(lease) => lease,
            Err(error) => panic!("{}", error),
        }
    }

    /// Returns a new lease to the boxed payload at `data`; returns an error
    /// if the header can't be allocated, after dropping the payload.
    ///
    /// # Safety
    ///
    /// `data` must be null, or have been returned by `Box::into_raw`, and
    /// must not be governed by any other header.
    #[inline]
    pub unsafe fn try_from_raw(data: *mut T) -> Result<Hard<T>, HoldError> {
        Hard::try_from_raw_with(data, BoxDelete)
    }

    /// Returns a new lease to the boxed payload at `data`.
    ///
    /// # Safety
    ///
    /// `data` must be null, or have been returned by `Box::into_raw`, and
    /// must not be governed by any other header.
    ///
    /// # Panics
    ///
    /// Panics if the header can't be allocated, after dropping the payload.
    #[inline]
    pub unsafe fn from_raw(data: *mut T) -> Hard<T> {
        Hard::from_raw_with(data, BoxDelete)
    }

    /// Moves a boxed value into a new lease, without moving it out of its
    /// allocation; returns an error if the header can't be allocated, after
    /// dropping the value.
    #[inline]
    pub fn try_from_box(data: Box<T>) -> Result<Hard<T>, HoldError> {
        unsafe { Hard::try_from_raw(Box::into_raw(data)) }
    }

    /// Moves a boxed value into a new lease, without moving it out of its
    /// allocation.
    ///
    /// # Panics
    ///
    /// Panics if the header can't be allocated, after dropping the value.
    #[inline]
    pub fn from_box(data: Box<T>) -> Hard<T> {
        unsafe { Hard::from_raw(Box::into_raw(data)) }
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

    /// Returns `true` if this is the only hard lease to its payload.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.hard_count() == 1
    }

    /// Returns `true` if this lease holds no header.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.header.is_none()
    }

    /// Returns `true` if this lease has a null data pointer.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    /// Returns a pointer to the leased value, or `None` if this lease is null.
    /// The pointer is valid for as long as this lease remains alive.
    #[inline]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.data
    }

    /// Returns a reference to the leased value, or `None` if this lease is null.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.data.map(|data| unsafe { &*data.as_ptr() })
    }

    /// Returns a new lease to a value reachable from this lease's value,
    /// sharing this lease's header. The returned lease keeps the whole
    /// payload alive. A null lease projects to a null lease with the same
    /// header.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tg_share::Hard;
    /// let pair = Hard::new((1, String::from("two")));
    /// let second = pair.project(|pair| &pair.1);
    /// drop(pair);
    /// assert_eq!(*second, "two");
    /// ```
    pub fn project<U: ?Sized, F>(&self, f: F) -> Hard<U>
        where T: 'static,
              F: FnOnce(&T) -> &U,
    {
        // Project the data pointer.
        let data = self.get().map(|value| NonNull::from(f(value)));
        // Acquire a new hard reference, if this lease isn't empty.
        if let Some(header) = self.header {
            unsafe { Header::acquire_hard(header) };
        }
        // Return the projected lease.
        unsafe { Hard::from_raw_parts(self.header, data) }
    }

    /// Converts this lease into a lease to a value reachable from this
    /// lease's value, transferring this lease's hard reference.
    pub fn map<U: ?Sized, F>(self, f: F) -> Hard<U>
        where T: 'static,
              F: FnOnce(&T) -> &U,
    {
        // Project the data pointer.
        let data = self.get().map(|value| NonNull::from(f(value)));
        // Take the hard reference held by this lease.
        let header = self.header;
        mem::forget(self);
        // Return the projected lease.
        unsafe { Hard::from_raw_parts(header, data) }
    }

    /// Returns a new lease to `data` that shares this lease's header, and
    /// keeps its payload alive. The returned lease adopts `data` as given,
    /// whether or not it relates to the payload. Aliasing an empty lease
    /// returns an empty lease whose data pointer is `data`.
    ///
    /// # Safety
    ///
    /// `data` must remain valid for as long as the returned lease, or any
    /// lease derived from it, dereferences it.
    pub unsafe fn alias<U: ?Sized>(&self, data: *const U) -> Hard<U> {
        // Acquire a new hard reference, if this lease isn't empty.
        if let Some(header) = self.header {
            Header::acquire_hard(header);
        }
        // Return a lease to the aliased data.
        Hard::from_raw_parts(self.header, NonNull::new(data as *mut U))
    }

    /// Releases this lease's hard reference, if any, leaving it empty.
    #[inline]
    pub fn reset(&mut self) {
        drop(mem::replace(self, Hard::empty()));
    }

    /// Replaces this lease with a new lease to a boxed value, then releases
    /// the previously held hard reference, if any.
    ///
    /// # Panics
    ///
    /// Panics if the header can't be allocated, after dropping the value.
    #[inline]
    pub fn reset_box(&mut self, data: Box<T>) {
        drop(mem::replace(self, Hard::from_box(data)));
    }

    /// Replaces this lease with a new lease to the payload at `data`, which
    /// `deleter` will reclaim, then releases the previously held hard
    /// reference, if any.
    ///
    /// # Safety
    ///
    /// Same as [`Hard::from_raw_with`].
    ///
    /// # Panics
    ///
    /// Panics if the header can't be allocated, after invoking `deleter`
    /// on `data`.
    pub unsafe fn reset_raw_with<D>(&mut self, data: *mut T, deleter: D)
        where D: Deleter<T> + 'static
    {
        drop(mem::replace(self, Hard::from_raw_with(data, deleter)));
    }

    /// Exchanges the headers and data pointers of two leases.
    #[inline]
    pub fn swap(&mut self, that: &mut Hard<T>) {
        mem::swap(self, that);
    }

    /// Returns a new soft lease to the shared payload.
    ///
    /// # Panics
    ///
    /// Panics if the incremented soft count would exceed `SOFT_COUNT_MAX`.
    #[inline]
    pub fn to_soft(&self) -> Soft<T> {
        Soft::from(self)
    }

    /// Converts this hard lease into a soft lease to the shared payload,
    /// dropping the payload if this was its last hard lease.
    pub fn into_soft(self) -> Soft<T> {
        // Acquire the soft reference before releasing the hard reference, so
        // that the header survives the release.
        let soft = Soft::from(&self);
        drop(self);
        soft
    }

    /// Returns `true` if the data pointers of both leases have the same
    /// address, regardless of their value types and headers.
    #[inline]
    pub fn ptr_eq<U: ?Sized>(&self, that: &Hard<U>) -> bool {
        address(self.data) == address(that.data)
    }

    /// Returns the header of this lease.
    #[inline]
    pub(crate) fn header(&self) -> Option<NonNull<Header>> {
        self.header
    }
}

impl<T> Hard<T> {
    pub(crate) fn try_hold_new_with<E, F>(hold: &'static dyn Hold, f: F) -> Result<Hard<T>, E>
        where F: FnOnce() -> Result<T, E>,
              E: From<HoldError>,
    {
        unsafe {
            // Allocate a colocated header, and construct its payload in place.
            let (header, data) = Colocated::alloc_with(hold, f)?;
            // Return a new lease holding the header's initial hard reference.
            Ok(Hard::from_raw_parts(Some(header), Some(data)))
        }
    }

    /// Returns a new lease to the result of `f`, stored in the same
    /// allocation as its header. The header is allocated before `f` runs;
    /// returns an error without calling `f` if the allocation fails, and
    /// releases the allocation if `f` returns an error or panics.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tg_share::{Hard, LeaseError};
    /// let x = Hard::try_new_with(|| Ok::<_, LeaseError>(vec![1, 2, 3]));
    /// # assert_eq!(x.unwrap().len(), 3);
    /// ```
    #[inline]
    pub fn try_new_with<E, F>(f: F) -> Result<Hard<T>, E>
        where F: FnOnce() -> Result<T, E>,
              E: From<HoldError>,
    {
        Hard::try_hold_new_with(<dyn Hold>::global(), f)
    }

    /// Returns a new lease to the result of `f`, stored in the same
    /// allocation as its header.
    ///
    /// # Panics
    ///
    /// Panics if the header can't be allocated, without calling `f`.
    pub fn new_with<F>(f: F) -> Hard<T>
        where F: FnOnce() -> T
    {
        match Hard::try_new_with(|| Ok::<T, HoldError>(f())) {
            Ok(lease) => lease,
            Err(error) => panic!("{}", error),
        }
    }

    /// Moves `value` into a new lease, stored in the same allocation as its
    /// header; returns an error if the allocation fails.
    #[inline]
    pub fn try_new(value: T) -> Result<Hard<T>, HoldError> {
        Hard::try_new_with(|| Ok(value))
    }

    /// Moves `value` into a new lease, stored in the same allocation as its
    /// header.
    ///
    /// # Panics
    ///
    /// Panics if the header can't be allocated.
    #[inline]
    pub fn new(value: T) -> Hard<T> {
        Hard::new_with(|| value)
    }
}

impl<T: ?Sized> Clone for Hard<T> {
    fn clone(&self) -> Hard<T> {
        // Acquire a new hard reference, if this lease isn't empty.
        if let Some(header) = self.header {
            unsafe { Header::acquire_hard(header) };
        }
        // Return a lease with the same header and data pointer.
        unsafe { Hard::from_raw_parts(self.header, self.data) }
    }
}

impl<T: ?Sized> Drop for Hard<T> {
    fn drop(&mut self) {
        if let Some(header) = self.header {
            unsafe { Header::release_hard(header) };
        }
    }
}

impl<T: ?Sized> Default for Hard<T> {
    #[inline]
    fn default() -> Hard<T> {
        Hard::empty()
    }
}

impl<T: ?Sized> From<Box<T>> for Hard<T> {
    #[inline]
    fn from(data: Box<T>) -> Hard<T> {
        Hard::from_box(data)
    }
}

impl<T: ?Sized> Deref for Hard<T> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if this lease is null.
    #[inline]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced a null lease"),
        }
    }
}

/// Returns the address component of a possibly null data pointer.
#[inline]
pub(crate) fn address<T: ?Sized>(data: Option<NonNull<T>>) -> *const u8 {
    match data {
        Some(data) => data.cast::<u8>().as_ptr(),
        None => ptr::null(),
    }
}

/// Leases compare equal when their data pointers have the same address,
/// regardless of their headers. Use [`Hard::ptr_eq`] to compare leases of
/// different value types.
impl<T: ?Sized> PartialEq for Hard<T> {
    #[inline]
    fn eq(&self, that: &Hard<T>) -> bool {
        self.ptr_eq(that)
    }
}

/// Compares the data pointer of a lease against a raw pointer; `None` is
/// the null pointer.
impl<T: ?Sized> PartialEq<Option<NonNull<T>>> for Hard<T> {
    #[inline]
    fn eq(&self, that: &Option<NonNull<T>>) -> bool {
        address(self.data) == address(*that)
    }
}

impl<T: ?Sized> Eq for Hard<T> {
}

impl<T: ?Sized> Hash for Hard<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        address(self.data).hash(state);
    }
}

impl<T: ?Sized + Display> Display for Hard<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.get() {
            Some(value) => Display::fmt(value, f),
            None => f.write_str("null"),
        }
    }
}

impl<T: ?Sized + Debug> Debug for Hard<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.get() {
            Some(value) => Debug::fmt(value, f),
            None => f.write_str("null"),
        }
    }
}

impl<T: ?Sized> Pointer for Hard<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Pointer::fmt(&address(self.data), f)
    }
}
