use std::{mem, ptr};

/// Machine word size in bytes. Headers and footers occupy one word each.
pub const WSIZE: usize = mem::size_of::<usize>();

/// Double-word size in bytes. Every block address and block size is a
/// multiple of this.
pub const DSIZE: usize = 2 * WSIZE;

/// Per-block overhead: one header word plus one footer word.
pub const OVERHEAD: usize = 2 * WSIZE;

/// Smallest legal block: header, footer, and room for the two free-list
/// links a block needs once it is freed.
pub const MIN_BLOCK_SIZE: usize = OVERHEAD + 2 * mem::size_of::<*mut u8>();

/// Default heap extension increment in bytes.
pub const CHUNK_SIZE: usize = 1 << 12;

/// Packs a block size and an allocated bit into one boundary-tag word.
/// Sizes are double-word multiples, so the low bits are free for the flag.
pub fn pack(
  size: usize,
  allocated: bool,
) -> usize {
  size | allocated as usize
}

/// A view over one block in the heap, addressed by its payload pointer.
///
/// ```text
///              ┌────────┬──────────────────────────────┬────────┐
///              │ header │           payload            │ footer │
///              └────────┴──────────────────────────────┴────────┘
///                       ▲
///                       └── Block(ptr)
/// ```
///
/// The header word sits one word below the payload; the footer word sits at
/// `payload + size - DSIZE`, so its position is derived from the size stored
/// in the header. When the block is free, the first two payload words hold
/// the free-list predecessor and successor links.
///
/// This is a borrowed view, not an owner: copying a `Block` copies the
/// address only, and every accessor reads or writes the heap bytes it aliases.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Block(*mut u8);

impl Block {
  pub fn from_payload(payload: *mut u8) -> Self {
    Self(payload)
  }

  pub fn null() -> Self {
    Self(ptr::null_mut())
  }

  pub fn payload(self) -> *mut u8 {
    self.0
  }

  pub fn is_null(self) -> bool {
    self.0.is_null()
  }

  unsafe fn header(self) -> *mut usize {
    unsafe { self.0.sub(WSIZE) as *mut usize }
  }

  unsafe fn footer(self) -> *mut usize {
    unsafe { self.0.add(self.size() - DSIZE) as *mut usize }
  }

  pub unsafe fn size(self) -> usize {
    unsafe { *self.header() & !(DSIZE - 1) }
  }

  pub unsafe fn is_allocated(self) -> bool {
    unsafe { *self.header() & 0x1 == 1 }
  }

  pub unsafe fn header_word(self) -> usize {
    unsafe { *self.header() }
  }

  pub unsafe fn footer_word(self) -> usize {
    unsafe { *self.footer() }
  }

  /// Writes matching header and footer tags. The footer position derives
  /// from `size`, so this is also how a block is resized.
  pub unsafe fn set_tags(
    self,
    size: usize,
    allocated: bool,
  ) {
    unsafe {
      *self.header() = pack(size, allocated);
      *self.footer() = pack(size, allocated);
    }
  }

  /// Writes the header only. Used for the epilogue sentinel, which has no
  /// footer (its size is zero).
  pub unsafe fn set_header(
    self,
    size: usize,
    allocated: bool,
  ) {
    unsafe {
      *self.header() = pack(size, allocated);
    }
  }

  /// The physically next block, found by jumping over this block's size.
  pub unsafe fn next(self) -> Block {
    unsafe { Block(self.0.add(self.size())) }
  }

  /// The physically previous block, found through its footer word. Relies
  /// on the header==footer invariant holding for that block.
  pub unsafe fn prev(self) -> Block {
    unsafe {
      let prev_footer = self.0.sub(DSIZE) as *mut usize;
      Block(self.0.sub(*prev_footer & !(DSIZE - 1)))
    }
  }

  // The free-list links live in the first two payload words of a free
  // block: predecessor first, successor second.

  pub unsafe fn pred(self) -> Block {
    unsafe { Block(*(self.0 as *mut *mut u8)) }
  }

  pub unsafe fn succ(self) -> Block {
    unsafe { Block(*(self.0.add(WSIZE) as *mut *mut u8)) }
  }

  pub unsafe fn set_pred(
    self,
    pred: Block,
  ) {
    unsafe {
      *(self.0 as *mut *mut u8) = pred.0;
    }
  }

  pub unsafe fn set_succ(
    self,
    succ: Block,
  ) {
    unsafe {
      *(self.0.add(WSIZE) as *mut *mut u8) = succ.0;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[repr(align(16))]
  struct AlignedBuffer([u8; 256]);

  #[test]
  fn test_pack() {
    assert_eq!(pack(64, true), 65);
    assert_eq!(pack(64, false), 64);
    assert_eq!(pack(0, true), 1);
  }

  #[test]
  fn test_tags_and_navigation() {
    let mut buffer = AlignedBuffer([0u8; 256]);
    let base = buffer.0.as_mut_ptr();

    unsafe {
      // Two adjacent blocks: 64 bytes allocated, then 32 bytes free.
      let first = Block::from_payload(base.add(WSIZE));
      first.set_tags(64, true);

      assert_eq!(first.size(), 64);
      assert!(first.is_allocated());
      assert_eq!(first.header_word(), first.footer_word());

      let second = first.next();
      assert_eq!(second.payload(), base.add(WSIZE + 64));
      second.set_tags(32, false);

      assert_eq!(second.size(), 32);
      assert!(!second.is_allocated());
      assert_eq!(second.prev(), first);
      assert_eq!(first.next(), second);
    }
  }

  #[test]
  fn test_link_slots() {
    let mut buffer = AlignedBuffer([0u8; 256]);
    let base = buffer.0.as_mut_ptr();

    unsafe {
      let first = Block::from_payload(base.add(WSIZE));
      first.set_tags(64, false);

      let second = first.next();
      second.set_tags(64, false);

      first.set_pred(Block::null());
      first.set_succ(second);
      second.set_pred(first);
      second.set_succ(Block::null());

      assert!(first.pred().is_null());
      assert_eq!(first.succ(), second);
      assert_eq!(second.pred(), first);
      assert!(second.succ().is_null());

      // Rewriting the tags leaves the link slots alone.
      first.set_tags(64, true);
      assert_eq!(first.succ(), second);
    }
  }
}
