use crate::buffer::Buffer;
use crate::error::Error;

#[test]
fn test_zeroed_and_copyin_roundtrip() {
    let buffer = Buffer::zeroed(4);
    assert_eq!(buffer.to_vec().unwrap(), vec![0.0; 4]);

    buffer.copyin(&[1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(buffer.to_vec().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_copy_size_mismatch() {
    let buffer = Buffer::zeroed(4);
    assert!(matches!(
        buffer.copyin(&[1.0, 2.0]).unwrap_err(),
        Error::SizeMismatch { expected: 4, actual: 2 }
    ));
}

#[test]
fn test_views_share_storage() {
    let base = Buffer::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let tail = base.view(4, 2).unwrap();

    assert!(base.shares_storage(&tail));
    assert_eq!(tail.to_vec().unwrap(), vec![5.0, 6.0]);

    tail.copyin(&[50.0, 60.0]).unwrap();
    assert_eq!(base.to_vec().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 50.0, 60.0]);
}

#[test]
fn test_nested_views_compose_offsets() {
    let base = Buffer::from_slice(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    let mid = base.view(2, 4).unwrap();
    let inner = mid.view(1, 2).unwrap();
    assert_eq!(inner.to_vec().unwrap(), vec![3.0, 4.0]);
}

#[test]
fn test_view_out_of_bounds() {
    let base = Buffer::zeroed(4);
    assert!(matches!(base.view(2, 3).unwrap_err(), Error::InvalidView { .. }));
}

#[test]
fn test_write_pin_is_exclusive() {
    let buffer = Buffer::zeroed(4);
    let other_view = buffer.view(0, 2).unwrap();

    let pin = buffer.pin_mut().unwrap();
    assert!(matches!(other_view.pin().unwrap_err(), Error::PinConflict));
    assert!(matches!(other_view.pin_mut().unwrap_err(), Error::PinConflict));
    drop(pin);

    assert!(other_view.pin().is_ok());
}

#[test]
fn test_shared_pins_coexist() {
    let buffer = Buffer::from_slice(&[1.0, 2.0]);
    let first = buffer.pin().unwrap();
    let second = buffer.pin().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert!(matches!(buffer.pin_mut().unwrap_err(), Error::PinConflict));
}

#[test]
fn test_pin_pointer_honors_view_offset() {
    let base = Buffer::from_slice(&[1.0, 2.0, 3.0, 4.0]);
    let tail = base.view(2, 2).unwrap();

    let pin = tail.pin().unwrap();
    assert_eq!(unsafe { *pin.ptr() }, 3.0);

    let mut writer = {
        drop(pin);
        tail.pin_mut().unwrap()
    };
    unsafe { *writer.ptr() = 30.0 };
    drop(writer);
    assert_eq!(base.to_vec().unwrap(), vec![1.0, 2.0, 30.0, 4.0]);
}

#[test]
fn test_distinct_buffers_do_not_share() {
    let a = Buffer::zeroed(4);
    let b = Buffer::zeroed(4);
    assert!(!a.shares_storage(&b));
    assert_ne!(a.id(), b.id());
    assert_eq!(a.id(), a.view(1, 2).unwrap().id());
}
