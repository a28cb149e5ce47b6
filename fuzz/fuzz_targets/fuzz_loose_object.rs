//! Fuzz target for loose object decoding.
//!
//! Tests that the zlib/header decoder handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use refpack_storage::ObjectStore;

fuzz_target!(|data: &[u8]| {
    if let Ok(object) = ObjectStore::decompress(data) {
        let _ = object.tag_target();
    }
});
