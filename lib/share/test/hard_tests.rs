extern crate tg_share;

use std::cell::Cell;
use std::collections::HashSet;
use std::mem;
use std::ptr;
use std::rc::Rc;
use rstest::rstest;
use tg_share::{Hard, Soft, HoldError};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Increments a shared tally when dropped.
struct Tally(Rc<Cell<usize>>);

impl Drop for Tally {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn test_hard_new_clone_drop_lock() {
    init();
    let a = Hard::new(5);
    assert_eq!(a.hard_count(), 1);

    let b = a.clone();
    assert_eq!(a.hard_count(), 2);
    assert_eq!(b.hard_count(), 2);

    mem::drop(a);
    assert_eq!(b.hard_count(), 1);
    assert_eq!(*b, 5);

    let w = Soft::from(&b);
    mem::drop(b);
    assert!(w.is_expired());
    assert!(w.lock().is_null());
    assert_eq!(w.lock().hard_count(), 0);
}

#[test]
fn test_hard_empty() {
    let x = Hard::<u32>::empty();
    assert!(x.is_empty());
    assert!(x.is_null());
    assert_eq!(x.hard_count(), 0);
    assert_eq!(x.soft_count(), 0);
    assert_eq!(x.as_ptr(), None);
    assert_eq!(x.get(), None);
    assert_eq!(x, Hard::default());
    assert!(x.ptr_eq(&Hard::<u8>::default()));
    assert!(!x.is_unique());
}

#[test]
fn test_hard_clone_of_empty_is_empty() {
    let x = Hard::<String>::empty();
    let y = x.clone();
    assert!(y.is_empty());
    assert_eq!(x.hard_count(), 0);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(8)]
#[case(64)]
fn test_hard_count_tracks_live_clones(#[case] n: usize) {
    let drops = Rc::new(Cell::new(0));
    let x = Hard::new(Tally(drops.clone()));
    let mut clones = Vec::new();
    for i in 1..n {
        clones.push(x.clone());
        assert_eq!(x.hard_count(), i + 1);
    }
    assert_eq!(x.is_unique(), n == 1);
    while let Some(clone) = clones.pop() {
        mem::drop(clone);
        assert_eq!(x.hard_count(), clones.len() + 1);
    }
    assert_eq!(drops.get(), 0);
    mem::drop(x);
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_hard_move_leaves_source_empty() {
    let drops = Rc::new(Cell::new(0));
    let mut x = Hard::new(Tally(drops.clone()));
    let y = x.clone();
    let data = x.as_ptr();

    let z = mem::take(&mut x);
    assert!(x.is_empty());
    assert!(x.is_null());
    assert_eq!(x.hard_count(), 0);
    assert_eq!(z.as_ptr(), data);
    assert_eq!(z.hard_count(), 2);
    assert_eq!(y.hard_count(), 2);

    mem::drop(x);
    mem::drop(y);
    assert_eq!(drops.get(), 0);
    mem::drop(z);
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_hard_from_box() {
    let drops = Rc::new(Cell::new(0));
    let boxed = Box::new(Tally(drops.clone()));
    let data: *const Tally = &*boxed;
    let x = Hard::from_box(boxed);
    assert_eq!(x.as_ptr().map(|data| data.as_ptr() as *const Tally), Some(data));
    assert_eq!(x.hard_count(), 1);
    mem::drop(x);
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_hard_from_unsized_box() {
    let x: Hard<[u8]> = Hard::from(vec![1, 2, 3].into_boxed_slice());
    assert_eq!(&*x, &[1, 2, 3]);
    let y: Hard<str> = Hard::from(Box::<str>::from("lease"));
    assert_eq!(&*y, "lease");
}

#[test]
fn test_hard_from_raw_with_custom_deleter() {
    let deletes = Rc::new(Cell::new(0));
    let value = Box::into_raw(Box::new(7u64));
    let x = unsafe {
        let deletes = deletes.clone();
        Hard::from_raw_with(value, move |data: *mut u64| {
            deletes.set(deletes.get() + 1);
            drop(Box::from_raw(data));
        })
    };
    let y = x.clone();
    assert_eq!(*y, 7);
    mem::drop(x);
    assert_eq!(deletes.get(), 0);
    mem::drop(y);
    assert_eq!(deletes.get(), 1);
}

#[test]
fn test_hard_from_null_raw_invokes_deleter_with_null() {
    let seen = Rc::new(Cell::new(0));
    let x = unsafe {
        let seen = seen.clone();
        Hard::from_raw_with(ptr::null_mut::<u32>(), move |data: *mut u32| {
            assert!(data.is_null());
            seen.set(seen.get() + 1);
        })
    };
    assert!(!x.is_empty());
    assert!(x.is_null());
    assert_eq!(x.hard_count(), 1);
    assert_eq!(x, Hard::<u32>::empty());
    mem::drop(x);
    assert_eq!(seen.get(), 1);
}

#[test]
fn test_hard_from_null_raw_with_box_delete() {
    let x = unsafe { Hard::<String>::from_raw(ptr::null_mut()) };
    assert!(x.is_null());
    assert_eq!(x.hard_count(), 1);
}

#[test]
fn test_hard_try_new_with() {
    let x = Hard::try_new_with(|| "42".parse::<u32>().map_err(|_| HoldError::Unsupported("parse")));
    assert_eq!(*x.unwrap(), 42);
    let y = Hard::<u32>::try_new_with(|| Err(HoldError::Unsupported("parse")));
    assert_eq!(y.err(), Some(HoldError::Unsupported("parse")));
}

#[test]
fn test_hard_new_with_runs_constructor_once() {
    let calls = Cell::new(0);
    let x = Hard::new_with(|| {
        calls.set(calls.get() + 1);
        String::from("colocated")
    });
    assert_eq!(calls.get(), 1);
    assert_eq!(x.len(), 9);
}

#[test]
fn test_hard_reset() {
    let drops = Rc::new(Cell::new(0));
    let mut x = Hard::new(Tally(drops.clone()));
    let mut y = x.clone();
    x.reset();
    assert!(x.is_empty());
    assert_eq!(y.hard_count(), 1);
    assert_eq!(drops.get(), 0);
    y.reset();
    assert_eq!(drops.get(), 1);
    y.reset();
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_hard_reset_box_releases_previous_payload() {
    let drops = Rc::new(Cell::new(0));
    let mut x = Hard::new(Tally(drops.clone()));
    x.reset_box(Box::new(Tally(drops.clone())));
    assert_eq!(drops.get(), 1);
    assert_eq!(x.hard_count(), 1);
    mem::drop(x);
    assert_eq!(drops.get(), 2);
}

#[test]
fn test_hard_reset_raw_with() {
    let deletes = Rc::new(Cell::new(0));
    let mut x = Hard::new(1i32);
    unsafe {
        let deletes = deletes.clone();
        x.reset_raw_with(Box::into_raw(Box::new(2i32)), move |data: *mut i32| {
            deletes.set(deletes.get() + 1);
            drop(Box::from_raw(data));
        });
    }
    assert_eq!(*x, 2);
    x.reset();
    assert_eq!(deletes.get(), 1);
}

#[test]
fn test_hard_swap() {
    let mut x = Hard::new(1);
    let mut y = Hard::new(2);
    let z = y.clone();
    x.swap(&mut y);
    assert_eq!(*x, 2);
    assert_eq!(*y, 1);
    assert_eq!(x.hard_count(), 2);
    assert_eq!(y.hard_count(), 1);
    assert_eq!(x, z);
}

#[test]
fn test_hard_equality_compares_data_pointers() {
    let x = Hard::new(5);
    let y = Hard::new(5);
    assert_ne!(x, y);
    assert_eq!(x, x.clone());
    assert_ne!(x, Hard::empty());
    assert!(Hard::<i32>::empty().ptr_eq(&Hard::<u8>::empty()));
}

#[test]
fn test_hard_compare_against_null() {
    let x = Hard::new(5);
    assert!(x != Hard::empty());
    assert!(x != None);
    assert!(x == x.as_ptr());

    let y = Hard::<u32>::empty();
    assert!(y == Hard::empty());
    assert!(y == None);

    let z = unsafe { Hard::<u32>::from_raw(ptr::null_mut()) };
    assert!(z == Hard::empty());
    assert!(z == None);
    assert!(!z.is_empty());
}

#[test]
fn test_hard_ptr_eq_across_value_types() {
    let x = Hard::new(String::from("lease"));
    let whole = x.project(|value| value as &(dyn std::fmt::Display + 'static));
    assert!(x.ptr_eq(&whole));
    assert!(whole.ptr_eq(&x));
    assert!(!x.ptr_eq(&Hard::<u8>::empty()));
}

#[test]
fn test_hard_hash_by_address() {
    let x = Hard::new(5);
    let y = Hard::new(5);
    let mut set = HashSet::new();
    assert!(set.insert(x.clone()));
    assert!(!set.insert(x.clone()));
    assert!(set.insert(y));
    assert_eq!(set.len(), 2);
}

#[test]
#[should_panic(expected = "dereferenced a null lease")]
fn test_hard_deref_null_panics() {
    let x = Hard::<u32>::empty();
    let _value: u32 = *x;
}

#[test]
fn test_hard_formatting() {
    let x = Hard::new(String::from("lease"));
    assert_eq!(format!("{}", x), "lease");
    assert_eq!(format!("{:?}", x), "\"lease\"");
    assert_eq!(format!("{:?}", Hard::<u8>::empty()), "null");
    let data = x.as_ptr().map(|data| data.as_ptr() as *const u8);
    assert_eq!(format!("{:p}", x), format!("{:p}", data.unwrap_or(ptr::null())));
}

#[test]
fn test_hard_payload_dropped_at_last_release() {
    let drops = Rc::new(Cell::new(0));
    let x = Hard::new(Tally(drops.clone()));
    let s1 = x.to_soft();
    let s2 = s1.clone();
    let y = s2.lock();
    mem::drop(x);
    assert_eq!(drops.get(), 0);
    assert_eq!(y.hard_count(), 1);
    assert_eq!(y.soft_count(), 2);
    mem::drop(y);
    assert_eq!(drops.get(), 1);
    assert!(s1.is_expired());
    assert!(s2.is_expired());
    mem::drop(s1);
    mem::drop(s2);
    assert_eq!(drops.get(), 1);
}
