//! Fuzz target for packed-refs parsing.
//!
//! Parsing must never panic, and every accepted file must re-parse to the
//! same refs once formatted back out.

#![no_main]

use libfuzzer_sys::fuzz_target;
use refpack_storage::packed::{format_peeled_line, format_ref_line, PACKED_REFS_HEADER};
use refpack_storage::PackedRefs;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(parsed) = PackedRefs::parse(text) else {
        return;
    };

    let mut out = String::from(PACKED_REFS_HEADER);
    for r in &parsed.refs {
        out.push_str(&format_ref_line(&r.name, &r.target));
        if let Some(peeled) = &r.peeled {
            out.push_str(&format_peeled_line(peeled));
        }
    }
    let reparsed = PackedRefs::parse(&out).expect("formatted packed-refs must parse");
    assert_eq!(parsed.refs, reparsed.refs);
});
