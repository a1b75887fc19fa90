//! Fuzz target for SubjectId::from_base64 and FromStr
//!
//! Arbitrary text must never panic the decoder, and anything that decodes
//! must re-encode to an identifier that decodes to the same bytes.

#![no_main]

use core_identity::SubjectId;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(id) = SubjectId::from_base64(text) {
        let again = SubjectId::from_base64(&id.to_base64());
        assert_eq!(again, Ok(id), "re-encoded identifier must decode to itself");
    }

    // Parsing accepts several textual forms; it must only ever return a Result
    let _ = text.parse::<SubjectId>();
});
