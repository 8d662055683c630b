use crate::error::{Error, Result};
use crate::view_type::ViewScalar;
use std::fmt;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

/// Used internally to make sure all memory allocations
/// are aligned to 16 bytes.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
struct U128(u128);
pub const ALIGNMENT: usize = 16;

/// align length to 16 bytes.
#[inline]
pub const fn align_u128(v: usize) -> usize {
    (v + 15) & !15
}

/// This method allocates zeroed memory area with alignment of 16 bytes.
/// The unit of input capacity is byte.
/// If it's not multiple of 16, it will be rounded up to.
///
/// Allocation failure is reported instead of aborting.
/// The memory is leaked, and raw pointer is returned.
/// Caller should always call free_aligned to release the memory.
#[inline]
pub(crate) fn alloc_aligned(cap: usize) -> Result<(NonNull<u8>, usize)> {
    let cap_u128 = cap.div_ceil(ALIGNMENT);
    let mut vec: Vec<U128> = Vec::new();
    vec.try_reserve_exact(cap_u128)
        .map_err(|_| Error::InsufficientMemory(cap))?;
    // fill whole capacity so every byte handed out is initialized.
    vec.resize(vec.capacity(), U128(0));
    let mut vec = ManuallyDrop::new(vec);
    let cap = vec.capacity() * ALIGNMENT;
    // # SAFETY
    //
    // Pointer of Vec is never null, even if nothing is allocated.
    let ptr = unsafe { NonNull::new_unchecked(vec.as_mut_ptr() as *mut u8) };
    Ok((ptr, cap))
}

/// Release memory allocated by [`alloc_aligned`].
///
/// # Safety
///
/// Caller must guarantee the input pointer and size is identical to
/// the returned value of `alloc_aligned`, and only call this method
/// once. After this call, the memory must not be used.
#[inline]
pub(crate) unsafe fn free_aligned(ptr: NonNull<u8>, cap: usize) {
    assert!(cap % ALIGNMENT == 0);
    let cap_u128 = cap / ALIGNMENT;
    let _ = Vec::<U128>::from_raw_parts(ptr.as_ptr() as *mut U128, cap_u128, cap_u128);
}

/// RawBuffer is an owned, 16-byte aligned byte block with a
/// logical length.
///
/// The logical length is what users see. The allocated capacity
/// is rounded up to multiple of 16, so the block can always be
/// viewed as slice of any [`ViewScalar`] whose width divides the
/// logical length.
///
/// RawBuffer never reallocates in place. Growing or shrinking
/// always produces a new buffer, which makes pointer identity a
/// reliable signal of reallocation.
pub struct RawBuffer {
    ptr: NonNull<u8>,
    cap_u8: usize,
    len_u8: usize,
}

// # SAFETY
//
// RawBuffer exclusively owns its memory, same as Vec<u8>.
unsafe impl Send for RawBuffer {}
unsafe impl Sync for RawBuffer {}

impl Drop for RawBuffer {
    #[inline]
    fn drop(&mut self) {
        // # SAFETY
        //
        // The pointer and capacity are guaranteed to be always valid.
        unsafe { free_aligned(self.ptr, self.cap_u8) }
    }
}

impl fmt::Debug for RawBuffer {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("len_u8", &self.len_u8)
            .field("cap_u8", &self.cap_u8)
            .finish()
    }
}

impl Default for RawBuffer {
    #[inline]
    fn default() -> Self {
        RawBuffer::empty()
    }
}

impl RawBuffer {
    /// Create an empty buffer without allocation.
    #[inline]
    pub fn empty() -> Self {
        RawBuffer {
            ptr: NonNull::<U128>::dangling().cast(),
            cap_u8: 0,
            len_u8: 0,
        }
    }

    /// Create a zeroed buffer with given logical byte length.
    #[inline]
    pub fn zeroed(len_u8: usize) -> Result<Self> {
        if len_u8 > isize::MAX as usize - ALIGNMENT {
            return Err(Error::InvalidArgument(format!(
                "buffer length {len_u8} exceeds addressable memory"
            )));
        }
        let (ptr, cap_u8) = alloc_aligned(len_u8)?;
        Ok(RawBuffer {
            ptr,
            cap_u8,
            len_u8,
        })
    }

    /// Create a buffer holding a copy of given bytes.
    #[inline]
    pub fn from_bytes(bs: &[u8]) -> Result<Self> {
        let mut buf = RawBuffer::zeroed(bs.len())?;
        buf.as_slice_mut().copy_from_slice(bs);
        Ok(buf)
    }

    /// Create a new buffer with given length and copy first
    /// `copy_u8` bytes of current buffer into it.
    /// Remaining bytes of new buffer are zeroed.
    #[inline]
    pub fn copy_prefix(&self, len_u8: usize, copy_u8: usize) -> Result<Self> {
        debug_assert!(copy_u8 <= self.len_u8 && copy_u8 <= len_u8);
        let mut buf = RawBuffer::zeroed(len_u8)?;
        buf.as_slice_mut()[..copy_u8].copy_from_slice(&self.as_slice()[..copy_u8]);
        Ok(buf)
    }

    /// Copy the whole buffer.
    #[inline]
    pub fn try_clone(&self) -> Result<Self> {
        self.copy_prefix(self.len_u8, self.len_u8)
    }

    /// Returns logical byte length.
    #[inline]
    pub fn len(&self) -> usize {
        self.len_u8
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len_u8 == 0
    }

    /// Returns allocated byte capacity.
    /// Note: capacity is always algined to multiple of 16.
    #[inline]
    pub fn cap_u8(&self) -> usize {
        self.cap_u8
    }

    /// Returns start address of the buffer.
    /// Two buffers with same pointer are the same allocation.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Returns immutable byte slice of logical length.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // # SAFETY
        //
        // Memory is initialized on allocation and logical length
        // never exceeds capacity.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr() as *const u8, self.len_u8) }
    }

    /// Returns mutable byte slice of logical length.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        // # SAFETY
        //
        // Memory is initialized on allocation and logical length
        // never exceeds capacity.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len_u8) }
    }

    /// Cast underlying bytes to immutable slice of given type T.
    ///
    /// Panics if logical length is not multiple of width of T.
    #[inline]
    pub fn cast_slice<T: ViewScalar>(&self) -> &[T] {
        bytemuck::cast_slice(self.as_slice())
    }

    /// Cast underlying bytes to mutable slice of given type T.
    ///
    /// Panics if logical length is not multiple of width of T.
    #[inline]
    pub fn cast_slice_mut<T: ViewScalar>(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(self.as_slice_mut())
    }

    /// Returns a copy of the bytes as vector.
    #[inline]
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }
}
