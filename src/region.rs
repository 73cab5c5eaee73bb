use std::ptr;

use libc::{c_void, intptr_t, sbrk};

/// A source of heap bytes.
///
/// The allocator owns exactly one region for its whole lifetime. `extend`
/// grows the managed range by `incr` bytes at the high end and returns the
/// start address of the new bytes, or null when the range cannot grow. The
/// range is never shrunk and bytes are never handed back, so a failed
/// extension leaves the range exactly as it was.
pub trait Region {
  unsafe fn extend(
    &mut self,
    incr: usize,
  ) -> *mut u8;
}

/// Grows the process data segment with `sbrk(2)`.
///
/// This is the default region: the heap lives directly above the program
/// break, and every extension moves the break up. Failure is sbrk's `-1`
/// sentinel, reported here as null.
pub struct Sbrk;

impl Region for Sbrk {
  unsafe fn extend(
    &mut self,
    incr: usize,
  ) -> *mut u8 {
    unsafe {
      let address = sbrk(incr as intptr_t);

      if address == usize::MAX as *mut c_void {
        return ptr::null_mut();
      }

      address as *mut u8
    }
  }
}

/// A fixed-capacity range reserved up front with `mmap(2)`.
///
/// Extension hands out bytes from the reservation until the capacity runs
/// out, which makes out-of-memory behavior deterministic. Useful for tests
/// and for callers that want an isolated heap per allocator instance; the
/// mapping is released on drop.
pub struct MmapRegion {
  base: *mut u8,
  brk: usize,
  capacity: usize,
}

impl MmapRegion {
  /// Reserves `capacity` bytes. Returns `None` if the mapping fails.
  pub fn new(capacity: usize) -> Option<Self> {
    unsafe {
      let base = libc::mmap(
        ptr::null_mut(),
        capacity,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      );

      if base == libc::MAP_FAILED {
        return None;
      }

      Some(Self {
        base: base as *mut u8,
        brk: 0,
        capacity,
      })
    }
  }
}

impl Region for MmapRegion {
  unsafe fn extend(
    &mut self,
    incr: usize,
  ) -> *mut u8 {
    if self.capacity - self.brk < incr {
      return ptr::null_mut();
    }

    let address = unsafe { self.base.add(self.brk) };
    self.brk += incr;

    address
  }
}

impl Drop for MmapRegion {
  fn drop(&mut self) {
    unsafe {
      libc::munmap(self.base as *mut c_void, self.capacity);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_mmap_region_hands_out_contiguous_bytes() {
    let mut region = MmapRegion::new(4096).unwrap();

    unsafe {
      let first = region.extend(64);
      assert!(!first.is_null());

      let second = region.extend(128);
      assert_eq!(second, first.add(64));

      // The reservation is writable.
      ptr::write_bytes(first, 0xAB, 192);
      assert_eq!(*first, 0xAB);
    }
  }

  #[test]
  fn test_mmap_region_exhaustion_is_clean() {
    let mut region = MmapRegion::new(128).unwrap();

    unsafe {
      assert!(!region.extend(128).is_null());

      // Capacity is gone; further requests fail without moving the break.
      assert!(region.extend(1).is_null());
      assert!(region.extend(64).is_null());
    }
  }
}
