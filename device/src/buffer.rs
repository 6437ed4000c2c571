//! Host buffers backing kernel arguments.
//!
//! A [`Buffer`] is a refcounted view into a flat `f64` allocation. Views
//! share storage, so several logical tensors can live in one allocation at
//! different offsets, matching the offset-based invocation ABI.
//!
//! Buffers are deliberately `!Send + !Sync`: ownership stays on the
//! dispatching thread, and workers only ever see raw pointers handed out
//! through pins for the duration of one invocation. Pinning uses `RefCell`
//! borrows, so a write pin is exclusive against every other pin of the same
//! storage; the dispatcher leans on this to detect output aliasing.

use std::cell::{Ref, RefCell, RefMut};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use snafu::ensure;
use tracing::trace;

use crate::error::{InvalidViewSnafu, PinConflictSnafu, Result, SizeMismatchSnafu};

/// Unique identity of one storage allocation. Views of the same allocation
/// share an id; it never repeats across allocations within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

impl BufferId {
    fn fresh() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Shared storage referenced by any number of views.
#[derive(Debug)]
struct BufferData {
    id: BufferId,
    cells: RefCell<Vec<f64>>,
}

/// A host buffer view: shared storage plus an offset window.
#[derive(Debug, Clone)]
pub struct Buffer {
    data: Rc<BufferData>,
    /// First element of this view within the allocation.
    offset: usize,
    /// Elements visible through this view.
    len: usize,
    /// Marker keeping `Buffer` `!Send + !Sync`.
    _not_send_sync: PhantomData<Rc<()>>,
}

impl Buffer {
    /// Allocate `len` zero-initialized elements.
    pub fn zeroed(len: usize) -> Self {
        trace!(len, "allocating host buffer");
        Self {
            data: Rc::new(BufferData { id: BufferId::fresh(), cells: RefCell::new(vec![0.0; len]) }),
            offset: 0,
            len,
            _not_send_sync: PhantomData,
        }
    }

    /// Allocate a buffer holding a copy of `src`.
    pub fn from_slice(src: &[f64]) -> Self {
        trace!(len = src.len(), "allocating host buffer from slice");
        Self {
            data: Rc::new(BufferData { id: BufferId::fresh(), cells: RefCell::new(src.to_vec()) }),
            offset: 0,
            len: src.len(),
            _not_send_sync: PhantomData,
        }
    }

    /// A sub-view over `[offset, offset + len)` of this view, sharing storage.
    ///
    /// # Errors
    /// Fails if the window exceeds this view's bounds.
    pub fn view(&self, offset: usize, len: usize) -> Result<Self> {
        ensure!(
            offset + len <= self.len,
            InvalidViewSnafu { offset, len, buffer_len: self.len }
        );
        Ok(Self {
            data: Rc::clone(&self.data),
            offset: self.offset + offset,
            len,
            _not_send_sync: PhantomData,
        })
    }

    /// Elements visible through this view.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Identity of the underlying allocation; shared by all views of it.
    pub fn id(&self) -> BufferId {
        self.data.id
    }

    /// Whether two views share the same underlying allocation.
    pub fn shares_storage(&self, other: &Buffer) -> bool {
        self.data.id == other.data.id
    }

    /// Copy host data into this view.
    ///
    /// # Errors
    /// Fails on a length mismatch or if the storage is pinned for writing.
    pub fn copyin(&self, src: &[f64]) -> Result<()> {
        ensure!(src.len() == self.len, SizeMismatchSnafu { expected: self.len, actual: src.len() });
        let mut cells = self.data.cells.try_borrow_mut().map_err(|_| PinConflictSnafu.build())?;
        cells[self.offset..self.offset + self.len].copy_from_slice(src);
        Ok(())
    }

    /// Copy this view out into host memory.
    ///
    /// # Errors
    /// Fails on a length mismatch or if the storage is pinned for writing.
    pub fn copyout(&self, dst: &mut [f64]) -> Result<()> {
        ensure!(dst.len() == self.len, SizeMismatchSnafu { expected: self.len, actual: dst.len() });
        let cells = self.data.cells.try_borrow().map_err(|_| PinConflictSnafu.build())?;
        dst.copy_from_slice(&cells[self.offset..self.offset + self.len]);
        Ok(())
    }

    /// Clone this view's contents into a fresh `Vec`.
    pub fn to_vec(&self) -> Result<Vec<f64>> {
        let mut out = vec![0.0; self.len];
        self.copyout(&mut out)?;
        Ok(out)
    }

    /// Pin the storage for exclusive writing and expose a raw pointer to this
    /// view's window. The pin holds a `RefMut`, so any overlapping pin
    /// attempt fails until it drops.
    ///
    /// # Errors
    /// Fails if the storage is already pinned in any mode.
    pub fn pin_mut(&self) -> Result<PinMut<'_>> {
        let guard = self.data.cells.try_borrow_mut().map_err(|_| PinConflictSnafu.build())?;
        Ok(PinMut { guard, offset: self.offset, len: self.len })
    }

    /// Pin the storage for shared reading.
    ///
    /// # Errors
    /// Fails if the storage is pinned for writing.
    pub fn pin(&self) -> Result<Pin<'_>> {
        let guard = self.data.cells.try_borrow().map_err(|_| PinConflictSnafu.build())?;
        Ok(Pin { guard, offset: self.offset, len: self.len })
    }
}

/// Exclusive pin over a buffer's storage.
///
/// The raw pointer stays valid exactly as long as the pin lives; the borrow
/// guard keeps every other access out in the meantime.
#[derive(Debug)]
pub struct PinMut<'a> {
    guard: RefMut<'a, Vec<f64>>,
    offset: usize,
    len: usize,
}

impl PinMut<'_> {
    pub fn ptr(&mut self) -> *mut f64 {
        // Window base; bounds were checked when the view was built.
        unsafe { self.guard.as_mut_ptr().add(self.offset) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Shared pin over a buffer's storage.
///
/// The pointer is handed to kernels as `*mut f64` to fit the uniform buffer
/// slot array, but input slots are never written through; exclusivity of the
/// output pin guarantees no writer coexists with this pin.
#[derive(Debug)]
pub struct Pin<'a> {
    guard: Ref<'a, Vec<f64>>,
    offset: usize,
    len: usize,
}

impl Pin<'_> {
    pub fn ptr(&self) -> *mut f64 {
        unsafe { self.guard.as_ptr().add(self.offset) }.cast_mut()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
