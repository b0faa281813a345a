use std::marker::PhantomData;

/// A mutable slice that several workers may write through at once.
///
/// Writers must target disjoint indices; the slice itself only checks bounds.
pub(crate) struct SharedSlice<'a, T> {
    ptr: *mut T,
    len: usize,
    _borrow: PhantomData<&'a mut [T]>,
}

// SAFETY: access is restricted to `write`, whose callers guarantee that no
// two threads touch the same index.
unsafe impl<T: Send> Send for SharedSlice<'_, T> {}
unsafe impl<T: Send> Sync for SharedSlice<'_, T> {}

impl<'a, T> SharedSlice<'a, T> {
    pub(crate) fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _borrow: PhantomData,
        }
    }

    /// Store `value` at `index`.
    ///
    /// # Safety
    /// No other thread may read or write `index` concurrently.
    #[inline]
    pub(crate) unsafe fn write(&self, index: usize, value: T) {
        assert!(index < self.len, "index {index} out of bounds for {}", self.len);
        unsafe { self.ptr.add(index).write(value) };
    }
}
