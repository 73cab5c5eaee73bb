/// Rounds the given size up to the next multiple of the double-word
/// alignment (two machine words).
///
/// Every block address and block size in the heap is a multiple of this
/// alignment, so adjusted allocation sizes are always pushed through here.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use exalloc::align;
///
/// match mem::size_of::<usize>() {
///   8 => assert_eq!(align!(17), 32), // 64 bit machine.
///   4 => assert_eq!(align!(17), 24), // 32 bit machine.
///   _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + 2 * mem::size_of::<usize>() - 1) & !(2 * mem::size_of::<usize>() - 1)
  };
}

#[cfg(test)]
mod tests {
  use std::mem;

  #[test]
  fn test_align() {
    let dword_size = 2 * mem::size_of::<usize>();

    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (dword_size * i + 1)..=(dword_size * (i + 1));

      let expected_alignment = dword_size * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }
}
