// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One heap for the host and its native plugin libraries.
//!
//! Export tables, boxed plugins, requests and responses cross the library
//! boundary by value, so memory allocated on one side is freed on the other.
//! [`export_plugins!`](crate::export_plugins) makes [`PluginAllocator`] the
//! library's global allocator. Right after loading, before calling anything
//! else in the library, the host passes [`HOST_ALLOCATOR`] to the function
//! behind [`ALLOCATOR_SYMBOL`]; from then on the library allocates through
//! the host's global allocator, whatever that is.

use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// Symbol through which the host installs its allocator in a library.
pub const ALLOCATOR_SYMBOL: &[u8] = b"warden_plugin_allocator";

/// Signature of the function behind [`ALLOCATOR_SYMBOL`].
pub type AllocatorHookFn = unsafe extern "C" fn(*const HostAllocator);

/// C-ABI view of an allocator. Sizes and alignments come from valid layouts.
#[repr(C)]
pub struct HostAllocator {
    pub alloc: unsafe extern "C" fn(size: usize, align: usize) -> *mut u8,
    pub alloc_zeroed: unsafe extern "C" fn(size: usize, align: usize) -> *mut u8,
    pub dealloc: unsafe extern "C" fn(ptr: *mut u8, size: usize, align: usize),
    pub realloc:
        unsafe extern "C" fn(ptr: *mut u8, size: usize, align: usize, new_size: usize) -> *mut u8,
}

impl std::fmt::Debug for HostAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostAllocator").finish_non_exhaustive()
    }
}

/// The global allocator of the process this copy of the crate is linked into.
pub static HOST_ALLOCATOR: HostAllocator = HostAllocator {
    alloc: global_alloc,
    alloc_zeroed: global_alloc_zeroed,
    dealloc: global_dealloc,
    realloc: global_realloc,
};

unsafe extern "C" fn global_alloc(size: usize, align: usize) -> *mut u8 {
    // SAFETY: the caller forwards a layout `GlobalAlloc` was given.
    unsafe { std::alloc::alloc(Layout::from_size_align_unchecked(size, align)) }
}

unsafe extern "C" fn global_alloc_zeroed(size: usize, align: usize) -> *mut u8 {
    // SAFETY: as in `global_alloc`.
    unsafe { std::alloc::alloc_zeroed(Layout::from_size_align_unchecked(size, align)) }
}

unsafe extern "C" fn global_dealloc(ptr: *mut u8, size: usize, align: usize) {
    // SAFETY: `ptr` was returned by this allocator for the same layout.
    unsafe { std::alloc::dealloc(ptr, Layout::from_size_align_unchecked(size, align)) }
}

unsafe extern "C" fn global_realloc(
    ptr: *mut u8,
    size: usize,
    align: usize,
    new_size: usize,
) -> *mut u8 {
    // SAFETY: as in `global_dealloc`; `new_size` is checked by the caller.
    unsafe { std::alloc::realloc(ptr, Layout::from_size_align_unchecked(size, align), new_size) }
}

static HOST: AtomicPtr<HostAllocator> = AtomicPtr::new(ptr::null_mut());

/// Global allocator of a native plugin library.
///
/// Uses the system allocator until the host installs its own, then forwards
/// every call to the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct PluginAllocator;

impl PluginAllocator {
    /// Route every later allocation of this module through `host`.
    ///
    /// # Safety
    ///
    /// `host` must point to an allocator that outlives this module. Memory
    /// this module obtained before the call must not be freed after it, so
    /// the host calls this before running any other code of the library.
    pub unsafe fn install(host: *const HostAllocator) {
        HOST.store(host.cast_mut(), Ordering::Release);
    }

    /// Whether a host allocator has been installed.
    pub fn is_bridged() -> bool {
        !HOST.load(Ordering::Acquire).is_null()
    }

    fn host() -> Option<&'static HostAllocator> {
        // SAFETY: `install` only accepts allocators that outlive the module.
        unsafe { HOST.load(Ordering::Acquire).as_ref() }
    }
}

// SAFETY: every call is forwarded unchanged to an allocator upholding the
// `GlobalAlloc` contract, and a pointer is always freed by the allocator that
// produced it as long as `install` runs before the first allocation.
unsafe impl GlobalAlloc for PluginAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        match Self::host() {
            Some(host) => unsafe { (host.alloc)(layout.size(), layout.align()) },
            None => unsafe { System.alloc(layout) },
        }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        match Self::host() {
            Some(host) => unsafe { (host.alloc_zeroed)(layout.size(), layout.align()) },
            None => unsafe { System.alloc_zeroed(layout) },
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        match Self::host() {
            Some(host) => unsafe { (host.dealloc)(ptr, layout.size(), layout.align()) },
            None => unsafe { System.dealloc(ptr, layout) },
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        match Self::host() {
            Some(host) => unsafe { (host.realloc)(ptr, layout.size(), layout.align(), new_size) },
            None => unsafe { System.realloc(ptr, layout, new_size) },
        }
    }
}
