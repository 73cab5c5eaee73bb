use std::{fmt, mem, ptr};

use libc::sbrk;
use log::{debug, error};

use crate::align;
use crate::block::{Block, CHUNK_SIZE, DSIZE, MIN_BLOCK_SIZE, OVERHEAD, WSIZE};
use crate::region::{Region, Sbrk};

pub unsafe fn print_alloc(
  size: usize,
  addr: *mut u8,
) {
  println!(
    "Allocated {} bytes, payload address = {:?}, program break = {:?}",
    size,
    addr,
    unsafe { sbrk(0) }
  );
}

/// Why `init` could not bring up the heap.
///
/// Both cases are fatal to the allocator instance: no further operation on
/// it is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
  /// The region could not supply the prologue/epilogue framing words.
  Framing,
  /// The region could not supply the first chunk-sized free block.
  FirstChunk,
}

impl fmt::Display for InitError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      InitError::Framing => write!(f, "region could not supply the initial heap framing"),
      InitError::FirstChunk => write!(f, "region could not supply the first free chunk"),
    }
  }
}

impl std::error::Error for InitError {}

/// An explicit-free-list allocator with boundary-tag coalescing.
///
/// The heap is one contiguous range grown through a [`Region`]. Every block
/// carries a header and footer tag; free blocks are additionally threaded
/// into a doubly linked list through their first two payload words, with the
/// most recently freed block at the head. Allocation is first-fit over that
/// list, splitting oversized blocks; every free immediately merges the block
/// with its free physical neighbors.
///
/// Each instance is an independent heap: the free-list head and the heap
/// bounds live here, not in process globals. Single-threaded only.
pub struct ExplicitAllocator<R: Region = Sbrk> {
  region: R,
  heap_start: *mut u8,
  head: *mut u8,
  chunk_size: usize,
}

impl ExplicitAllocator<Sbrk> {
  /// An allocator over the process data segment.
  pub fn new() -> Self {
    Self::with_region(Sbrk)
  }
}

impl<R: Region> ExplicitAllocator<R> {
  pub fn with_region(region: R) -> Self {
    Self::with_chunk_size(region, CHUNK_SIZE)
  }

  /// Overrides the default extension increment. The chunk size is rounded
  /// up to the double-word alignment.
  pub fn with_chunk_size(
    region: R,
    chunk_size: usize,
  ) -> Self {
    Self {
      region,
      heap_start: ptr::null_mut(),
      head: ptr::null_mut(),
      chunk_size: align!(chunk_size),
    }
  }

  /// Brings up the heap: one alignment pad word, the prologue block, the
  /// epilogue header, then one chunk-sized free block.
  ///
  /// Must be called exactly once, before any other operation.
  ///
  /// # Safety
  ///
  /// The region must hand out writable, double-word-aligned memory that
  /// stays valid for the allocator's lifetime.
  pub unsafe fn init(&mut self) -> Result<(), InitError> {
    unsafe {
      debug_assert!(self.heap_start.is_null(), "init called twice");

      let base = self.region.extend(4 * WSIZE);
      if base.is_null() {
        return Err(InitError::Framing);
      }

      // Pad word, then a zero-payload allocated prologue block, then the
      // epilogue header. Both sentinels stay allocated forever so that
      // coalescing never runs off the ends of the heap.
      ptr::write(base as *mut usize, 0);
      let prologue = Block::from_payload(base.add(DSIZE));
      prologue.set_tags(OVERHEAD, true);
      prologue.next().set_header(0, true);

      self.heap_start = prologue.payload();
      self.head = ptr::null_mut();

      if self.extend_heap(self.chunk_size / WSIZE).is_null() {
        return Err(InitError::FirstChunk);
      }

      Ok(())
    }
  }

  /// Hands out a payload of at least `size` bytes, or null when `size` is
  /// zero or the region cannot grow any further.
  ///
  /// # Safety
  ///
  /// `init` must have succeeded on this instance.
  pub unsafe fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    unsafe {
      debug_assert!(!self.heap_start.is_null(), "allocator not initialized");

      if size == 0 {
        return ptr::null_mut();
      }

      // Adjusted block size: overhead plus alignment, with a floor big
      // enough to hold the free-list links once the block is freed again.
      // Requests so large that the rounding would wrap can never be
      // satisfied; they get the same null as any other unmeetable request.
      let asize = if size <= DSIZE {
        DSIZE + OVERHEAD
      } else {
        match size.checked_add(OVERHEAD + DSIZE - 1) {
          Some(padded) => padded & !(DSIZE - 1),
          None => return ptr::null_mut(),
        }
      };

      let bp = self.find_fit(asize);
      if !bp.is_null() {
        self.place(bp, asize);
        return bp.payload();
      }

      // No fit; grow the heap by at least one chunk and place there.
      let extend_size = asize.max(self.chunk_size);
      let bp = self.extend_heap(extend_size / WSIZE);
      if bp.is_null() {
        return ptr::null_mut();
      }

      self.place(bp, asize);
      bp.payload()
    }
  }

  /// Releases a payload previously returned by [`allocate`](Self::allocate).
  /// Null is a no-op.
  ///
  /// # Safety
  ///
  /// `address` must be null or a payload currently allocated by this
  /// instance. Anything else (double free, foreign pointer) is undefined;
  /// debug builds assert on the cases the boundary tags can catch.
  pub unsafe fn free(
    &mut self,
    address: *mut u8,
  ) {
    unsafe {
      if address.is_null() {
        return;
      }

      debug_assert!(
        address as usize % DSIZE == 0,
        "freed pointer is not double-word aligned"
      );

      let bp = Block::from_payload(address);
      debug_assert!(bp.is_allocated(), "double free, or pointer was never allocated");

      // The size recorded in the boundary tag is trusted as-is.
      bp.set_tags(bp.size(), false);
      self.coalesce(bp);
    }
  }

  /// Resizes a payload. Null behaves as [`allocate`](Self::allocate); a zero
  /// size behaves as [`free`](Self::free) and returns null. Contents are
  /// preserved up to the smaller of the old and new sizes. On failure null
  /// is returned and the old payload is left intact.
  ///
  /// # Safety
  ///
  /// Same contract as [`free`](Self::free) for non-null `address`.
  pub unsafe fn reallocate(
    &mut self,
    address: *mut u8,
    size: usize,
  ) -> *mut u8 {
    unsafe {
      if address.is_null() {
        return self.allocate(size);
      }
      if size == 0 {
        self.free(address);
        return ptr::null_mut();
      }

      let bp = Block::from_payload(address);
      let old_payload = bp.size() - OVERHEAD;
      if size <= old_payload {
        return address;
      }

      let new_address = self.allocate(size);
      if new_address.is_null() {
        return ptr::null_mut();
      }

      ptr::copy_nonoverlapping(address, new_address, old_payload);
      self.free(address);
      new_address
    }
  }

  /// First-fit search of the free list, head to tail.
  unsafe fn find_fit(
    &self,
    asize: usize,
  ) -> Block {
    unsafe {
      let mut current = Block::from_payload(self.head);

      while !current.is_null() {
        if current.size() >= asize {
          return current;
        }
        current = current.succ();
      }

      Block::null()
    }
  }

  /// Allocates `asize` bytes at the start of free block `bp`, splitting off
  /// the remainder when it is big enough to stand on its own.
  unsafe fn place(
    &mut self,
    bp: Block,
    asize: usize,
  ) {
    unsafe {
      let current_size = bp.size();
      let remainder = current_size - asize;

      if remainder < MIN_BLOCK_SIZE {
        // Too small to carry tags and links; take the whole block.
        bp.set_tags(current_size, true);
        self.remove(bp);
      } else {
        bp.set_tags(asize, true);
        self.remove(bp);

        let rest = bp.next();
        rest.set_tags(remainder, false);
        // The block after the remainder can itself be free, e.g. right
        // after a heap extension, so run it through coalescing.
        self.coalesce(rest);
      }
    }
  }

  /// Grows the heap by `words` words (rounded up to keep alignment), frames
  /// the new bytes as one free block, rewrites the epilogue, and merges the
  /// new block with a free block that may have ended the old heap. Returns
  /// the resulting free block, or a null block if the region cannot grow.
  unsafe fn extend_heap(
    &mut self,
    words: usize,
  ) -> Block {
    unsafe {
      let mut size = words * WSIZE;
      if words % 2 == 1 {
        size += WSIZE;
      }
      if size < MIN_BLOCK_SIZE {
        size = MIN_BLOCK_SIZE;
      }

      let address = self.region.extend(size);
      if address.is_null() {
        return Block::null();
      }

      debug!("extended heap by {} bytes at {:?}", size, address);

      // The new bytes begin where the old epilogue header sat, so `address`
      // is exactly the payload address of the block replacing it.
      let bp = Block::from_payload(address);
      bp.set_tags(size, false);
      bp.next().set_header(0, true);

      self.coalesce(bp)
    }
  }

  /// Merges `bp` (free, not yet listed) with whichever physical neighbors
  /// are free, and inserts the result into the free list. Returns the block
  /// representing the merged span.
  unsafe fn coalesce(
    &mut self,
    bp: Block,
  ) -> Block {
    unsafe {
      let mut bp = bp;
      let prev = bp.prev();
      let next = bp.next();
      let prev_allocated = prev.is_allocated();
      let next_allocated = next.is_allocated();

      if prev_allocated && !next_allocated {
        let new_size = bp.size() + next.size();
        self.remove(next);
        bp.set_tags(new_size, false);
      } else if !prev_allocated && next_allocated {
        let new_size = bp.size() + prev.size();
        self.remove(prev);
        bp = prev;
        bp.set_tags(new_size, false);
      } else if !prev_allocated && !next_allocated {
        let new_size = bp.size() + prev.size() + next.size();
        self.remove(prev);
        self.remove(next);
        bp = prev;
        bp.set_tags(new_size, false);
      }

      self.insert(bp);
      bp
    }
  }

  /// Pushes a free block onto the head of the free list.
  unsafe fn insert(
    &mut self,
    bp: Block,
  ) {
    unsafe {
      bp.set_succ(Block::from_payload(self.head));
      if !self.head.is_null() {
        Block::from_payload(self.head).set_pred(bp);
      }
      bp.set_pred(Block::null());
      self.head = bp.payload();
    }
  }

  /// Unlinks a block from the free list. The block must be in the list.
  unsafe fn remove(
    &mut self,
    bp: Block,
  ) {
    unsafe {
      let pred = bp.pred();
      let succ = bp.succ();

      if pred.is_null() && succ.is_null() {
        // Only element.
        self.head = ptr::null_mut();
      } else if pred.is_null() {
        // Head element.
        succ.set_pred(Block::null());
        self.head = succ.payload();
      } else if succ.is_null() {
        // Tail element.
        pred.set_succ(Block::null());
      } else {
        pred.set_succ(succ);
        succ.set_pred(pred);
      }
    }
  }

  /// Walks every block from the prologue to the epilogue and validates the
  /// heap framing, block alignment, and header/footer agreement. Diagnostic
  /// only; never called on the allocation path.
  ///
  /// # Safety
  ///
  /// `init` must have succeeded on this instance.
  pub unsafe fn check_heap(&self) -> bool {
    unsafe {
      let prologue = Block::from_payload(self.heap_start);
      if prologue.size() != OVERHEAD || !prologue.is_allocated() {
        error!("check_heap: bad prologue header");
        return false;
      }

      let mut bp = prologue;
      while bp.size() > 0 {
        if !self.check_block(bp) {
          return false;
        }
        bp = bp.next();
      }

      if bp.size() != 0 || !bp.is_allocated() {
        error!("check_heap: bad epilogue header");
        return false;
      }

      true
    }
  }

  unsafe fn check_block(
    &self,
    bp: Block,
  ) -> bool {
    unsafe {
      if bp.payload() as usize % DSIZE != 0 {
        error!("check_heap: {:?} is not double-word aligned", bp.payload());
        return false;
      }
      if bp.header_word() != bp.footer_word() {
        error!("check_heap: header does not match footer at {:?}", bp.payload());
        return false;
      }
      true
    }
  }

  /// Logs every block in physical order at debug level.
  ///
  /// # Safety
  ///
  /// `init` must have succeeded on this instance.
  pub unsafe fn dump_heap(&self) {
    unsafe {
      debug!("heap ({:?}):", self.heap_start);

      let mut bp = Block::from_payload(self.heap_start);
      while bp.size() > 0 {
        debug!(
          "{:?}: header [{}:{}] footer [{}:{}]",
          bp.payload(),
          bp.size(),
          if bp.is_allocated() { 'a' } else { 'f' },
          bp.footer_word() & !(DSIZE - 1),
          if bp.footer_word() & 0x1 == 1 { 'a' } else { 'f' },
        );
        bp = bp.next();
      }

      debug!("{:?}: epilogue [{}]", bp.payload(), bp.header_word());
    }
  }

  /// Logs the free list head to tail at debug level.
  ///
  /// # Safety
  ///
  /// `init` must have succeeded on this instance.
  pub unsafe fn dump_free_list(&self) {
    unsafe {
      debug!("free list head: {:?}", self.head);

      let mut current = Block::from_payload(self.head);
      let mut position = 1;
      while !current.is_null() {
        debug!("element {}: {:?} ({} bytes)", position, current.payload(), current.size());
        current = current.succ();
        position += 1;
      }
    }
  }
}
