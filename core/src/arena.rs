//! Bump arena for allocations that live as long as their owner.
//!
//! [`Arena`] hands out copies of slices carved from large chunks. Nothing is
//! ever released individually: every block stays valid until the arena itself
//! is dropped, at which point all chunks are freed at once.
//!
//! # Motivation
//!
//! Renderer setup enumerates a lot of short lists (layers, extensions,
//! physical devices, queue families, surface formats, swapchain images).
//! Copying them into an arena owned by the renderer keeps their storage in
//! one place with a single, well-defined release point.
//!
//! # Example
//!
//! ```
//! use lantern_core::arena::Arena;
//!
//! let arena = Arena::new();
//! let modes = arena.alloc_slice_copy(&[2u32, 0, 1]);
//! let names = arena.alloc_slice_copy(&["fifo", "immediate"]);
//!
//! assert_eq!(modes, &[2, 0, 1]);
//! assert_eq!(names.len(), 2);
//! assert_eq!(arena.allocation_count(), 2);
//! ```

use std::alloc::{self, Layout};
use std::cell::{Cell, RefCell};
use std::ptr::{self, NonNull};
use std::slice;

/// Default size of a single arena chunk (4 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Alignment every chunk is allocated with.
const CHUNK_ALIGN: usize = 16;

/// A single contiguous block of arena memory.
struct Chunk {
    base: NonNull<u8>,
    capacity: usize,
    offset: usize,
}

impl Chunk {
    fn new(capacity: usize) -> Self {
        let layout = Self::layout(capacity);
        // SAFETY: layout has a non-zero size (capacity is at least CHUNK_ALIGN).
        let raw = unsafe { alloc::alloc(layout) };
        let base = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout));

        Self {
            base,
            capacity,
            offset: 0,
        }
    }

    fn layout(capacity: usize) -> Layout {
        Layout::from_size_align(capacity.max(CHUNK_ALIGN), CHUNK_ALIGN)
            .unwrap_or_else(|_| panic!("arena chunk of {capacity} bytes is too large"))
    }

    /// Bump-allocate `layout` from this chunk, if it fits.
    fn try_alloc(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        let base = self.base.as_ptr() as usize;
        let start = (base + self.offset).checked_next_multiple_of(layout.align())?;
        let end = start.checked_add(layout.size())?;

        if end > base + self.capacity {
            return None;
        }

        self.offset = end - base;
        // SAFETY: start lies inside [base, base + capacity] and base is non-null.
        Some(unsafe { NonNull::new_unchecked(self.base.as_ptr().add(start - base)) })
    }

    fn remaining(&self) -> usize {
        self.capacity - self.offset
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // SAFETY: base was allocated in `Chunk::new` with the same layout.
        unsafe { alloc::dealloc(self.base.as_ptr(), Self::layout(self.capacity)) };
    }
}

/// Append-only bump allocator.
///
/// Allocation goes through `&self`, so slices handed out earlier remain
/// borrowed while new ones are created. Chunks never move once allocated.
pub struct Arena {
    chunks: RefCell<Vec<Chunk>>,
    chunk_size: usize,
    allocated_bytes: Cell<usize>,
    allocation_count: Cell<usize>,
}

// SAFETY: the arena exclusively owns its chunks; the raw pointers inside them
// are never shared with another arena. Sharing across threads is still
// impossible because of the `RefCell`/`Cell` bookkeeping (the arena is !Sync).
unsafe impl Send for Arena {}

impl Arena {
    /// Create an arena with the default chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create an arena whose chunks hold `chunk_size` bytes.
    ///
    /// No memory is reserved until the first allocation.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunks: RefCell::new(Vec::new()),
            chunk_size: chunk_size.max(CHUNK_ALIGN),
            allocated_bytes: Cell::new(0),
            allocation_count: Cell::new(0),
        }
    }

    /// Copy `src` into the arena and return the arena-owned copy.
    ///
    /// Empty slices do not touch the arena.
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> &[T] {
        if src.is_empty() {
            return &[];
        }

        let layout = Layout::array::<T>(src.len()).unwrap_or_else(|_| {
            panic!("arena allocation of {} elements overflows", src.len())
        });
        let dst = self.alloc_raw(layout).cast::<T>();

        // SAFETY: dst points to a fresh, properly aligned block of
        // `src.len()` elements that nothing else references.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), src.len());
            slice::from_raw_parts(dst.as_ptr(), src.len())
        }
    }

    /// Move the contents of `values` into the arena.
    pub fn alloc_from_vec<T: Copy>(&self, values: Vec<T>) -> &[T] {
        self.alloc_slice_copy(&values)
    }

    fn alloc_raw(&self, layout: Layout) -> NonNull<u8> {
        let mut chunks = self.chunks.borrow_mut();

        self.allocated_bytes.set(self.allocated_bytes.get() + layout.size());
        self.allocation_count.set(self.allocation_count.get() + 1);

        if let Some(chunk) = chunks.last_mut()
            && let Some(block) = chunk.try_alloc(layout)
        {
            return block;
        }

        // Oversized requests get a dedicated chunk.
        let capacity = self.chunk_size.max(layout.size() + layout.align());
        let mut chunk = Chunk::new(capacity);
        let block = chunk
            .try_alloc(layout)
            .unwrap_or_else(|| panic!("fresh arena chunk cannot hold {} bytes", layout.size()));

        log::trace!(
            "Arena: new chunk #{} ({} bytes)",
            chunks.len(),
            chunk.capacity
        );

        // Keep the partially used chunk at the end when the new one is
        // already exhausted by a single oversized block.
        if chunk.remaining() < chunks.last().map_or(0, Chunk::remaining) {
            let last = chunks.len() - 1;
            chunks.insert(last, chunk);
        } else {
            chunks.push(chunk);
        }

        block
    }

    /// Total bytes handed out so far (excluding alignment padding).
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes.get()
    }

    /// Number of non-empty allocations served.
    pub fn allocation_count(&self) -> usize {
        self.allocation_count.get()
    }

    /// Number of chunks currently owned.
    pub fn chunk_count(&self) -> usize {
        self.chunks.borrow().len()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("chunk_size", &self.chunk_size)
            .field("chunks", &self.chunk_count())
            .field("allocated_bytes", &self.allocated_bytes())
            .field("allocation_count", &self.allocation_count())
            .finish()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        log::debug!(
            "Arena released: {} allocations, {} bytes in {} chunks",
            self.allocation_count(),
            self.allocated_bytes(),
            self.chunks.get_mut().len()
        );
    }
}
