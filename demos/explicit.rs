use std::{io::Read, ptr};

use exalloc::{ExplicitAllocator, print_alloc};
use libc::sbrk;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how allocations change the
/// program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via brk/sbrk.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() {
  // An explicit-free-list allocator over the process data segment. It
  // keeps a doubly linked list of free blocks threaded through their own
  // payloads, searches it first-fit, and coalesces neighbors on free.
  let mut allocator = ExplicitAllocator::new();

  unsafe {
    // Initial heap state
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Bring up the heap: framing sentinels plus one 4 KiB free chunk.
    // --------------------------------------------------------------------
    allocator.init().expect("heap bring-up failed");
    println!("\n[1] Heap initialized (prologue, epilogue, one free chunk)");
    print_program_break("after init");
    println!("[1] Consistency check: {}", allocator.check_heap());

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Allocate 8 bytes for a u64. The block is carved out of the
    //    initial chunk; the remainder stays on the free list.
    // --------------------------------------------------------------------
    let first_block = allocator.allocate(8);
    println!("\n[2] Allocate u64");
    print_alloc(8, first_block);

    let first_ptr = first_block as *mut u64;
    first_ptr.write(0xDEADBEEF);
    println!("[2] Value written to first_block = 0x{:X}", first_ptr.read());

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Allocate 100 bytes and fill them with a byte pattern. Note the
    //    16-byte alignment of every returned payload.
    // --------------------------------------------------------------------
    let second_block = allocator.allocate(100);
    println!("\n[3] Allocate 100 bytes");
    print_alloc(100, second_block);

    ptr::write_bytes(second_block, 0xAB, 100);
    println!("[3] Initialized second block with 0xAB");
    println!(
      "[3] Address = {:#X}, addr % 16 = {}",
      second_block as usize,
      second_block as usize % 16
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Free the first block, then allocate a similar size again. The
    //    first-fit search finds the freed block at the list head and
    //    reuses it.
    // --------------------------------------------------------------------
    allocator.free(first_block);
    println!("\n[4] Freed first_block at {:?}", first_block);

    let third_block = allocator.allocate(8);
    println!("[4] Allocate u64 again (check reuse of freed block)");
    print_alloc(8, third_block);

    println!(
      "[4] third_block == first_block? {}",
      if third_block == first_block {
        "Yes, it reused the freed block"
      } else {
        "No, it allocated somewhere else"
      }
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Allocate a large block to observe heap growth. 64 KiB exceeds
    //    both the free space and the 4 KiB chunk, so the extension is
    //    sized to the request and the program break moves.
    // --------------------------------------------------------------------
    print_program_break("before large alloc");

    let big_block = allocator.allocate(64 * 1024);
    println!("\n[5] Allocate large 64 KiB block");
    print_alloc(64 * 1024, big_block);

    print_program_break("after large alloc");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 6) Free everything. Adjacent free blocks merge back together; the
    //    consistency checker walks the whole heap and validates the
    //    boundary tags.
    // --------------------------------------------------------------------
    allocator.free(second_block);
    allocator.free(third_block);
    allocator.free(big_block);
    println!("\n[6] Freed all blocks, consistency check: {}", allocator.check_heap());

    // --------------------------------------------------------------------
    // 7) End of demo.
    //
    //    The heap never shrinks: the region stays with the process and
    //    the OS reclaims it on exit.
    // --------------------------------------------------------------------
    println!("\n[7] End of example. Process will exit and the OS will reclaim all memory.");
  }
}
