//! # exalloc - An Explicit Free List Memory Allocator
//!
//! This crate provides a classic **explicit-free-list allocator** with
//! boundary tags and immediate coalescing, managing a single contiguous
//! heap grown through `sbrk` (or a private `mmap` reservation).
//!
//! ## Overview
//!
//! Every block in the heap is framed by a header and footer word packing
//! `(size, allocated-bit)`. Free blocks are additionally threaded into a
//! doubly linked list stored inside their own payload space:
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌─────┬─────────┬───────────┬───────────┬───────────┬──────────┐
//!   │ pad │ prologue│  block A  │  block B  │  block C  │ epilogue │
//!   │     │ hdr│ftr │ hdr│..│ftr│ hdr│..│ftr│ hdr│..│ftr│   hdr    │
//!   └─────┴─────────┴───────────┴───────────┴───────────┴──────────┘
//!         ▲                                              ▲
//!         │                                              │
//!     permanently allocated sentinels framing the heap ──┘
//!
//!   A Free Block:
//!
//!   ┌────────┬────────┬────────┬───────────────────────────┬────────┐
//!   │ header │  pred  │  succ  │       unused payload      │ footer │
//!   └────────┴────────┴────────┴───────────────────────────┴────────┘
//!            ▲
//!            └── the free-list links reuse the payload words,
//!                so free-block bookkeeping costs zero extra bytes
//! ```
//!
//! Allocation is **first-fit** over the free list; oversized blocks are
//! split and the remainder returned to the list. Every free immediately
//! merges the block with free physical neighbors (boundary-tag
//! coalescing), so no two adjacent blocks are ever both free.
//!
//! ## Crate Structure
//!
//! ```text
//!   exalloc
//!   ├── align      - Double-word alignment macro (align!)
//!   ├── block      - Boundary-tag block views and layout constants
//!   ├── region     - Memory-extension sources (sbrk, mmap)
//!   └── explicit   - ExplicitAllocator implementation
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use exalloc::ExplicitAllocator;
//!
//! fn main() {
//!     let mut allocator = ExplicitAllocator::new();
//!
//!     unsafe {
//!         allocator.init().expect("heap bring-up failed");
//!
//!         let ptr = allocator.allocate(64) as *mut u64;
//!         *ptr = 42;
//!         println!("Value: {}", *ptr);
//!
//!         allocator.free(ptr as *mut u8);
//!     }
//! }
//! ```
//!
//! ## How It Works
//!
//! `allocate` searches the free list for the first block big enough; on a
//! miss the heap grows by at least one chunk (4 KiB by default) and the
//! fresh block - merged with a free block that may have ended the old heap
//! - is placed into. `free` flips the boundary tags and coalesces:
//!
//! ```text
//!   Coalescing on free(B), with A free and C allocated:
//!
//!   before   ┌ A (free) ┬ B ──────┬ C (alloc) ┐
//!   after    ┌ A+B (free, one block) ┬ C (alloc) ┐
//! ```
//!
//! The prologue and epilogue sentinels are permanently allocated, so
//! coalescing never has to special-case the ends of the heap.
//!
//! ## Features
//!
//! - **Zero-overhead free list**: links live inside free payloads
//! - **Immediate coalescing**: fragmentation limited to split remainders
//! - **Pluggable memory source**: `sbrk`-backed by default, `mmap`-backed
//!   fixed regions for isolated heaps and deterministic testing
//! - **Opt-in consistency checker**: full heap validation off the hot path
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives
//! - **The heap never shrinks**: memory is never returned to the source
//! - **First-fit only**: no size classes, no best-fit search
//! - **Misuse is undefined**: double frees and foreign pointers are only
//!   caught by debug assertions, never in release builds
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! All allocation and deallocation operations require `unsafe` blocks.

pub mod align;
mod block;
mod explicit;
mod region;

pub use explicit::{ExplicitAllocator, InitError, print_alloc};
pub use region::{MmapRegion, Region, Sbrk};
