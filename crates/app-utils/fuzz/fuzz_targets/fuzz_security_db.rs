//! Fuzz target for the security database parsers
//!
//! Arbitrary text must never panic either parser, and whatever parses must
//! build stores within the ACL limits.

#![no_main]

use app_utils::db::{DatabaseParser, JsonParser, YamlParser};
use core_policy::{MAX_ACES, MAX_URI_LENGTH};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    for result in [YamlParser.parse(data), JsonParser.parse(data)] {
        let Ok(db) = result else { continue };

        let acl = db.acl_store().expect("parsed database must build its ACL");
        assert!(acl.len() <= MAX_ACES);
        for ace in acl.iter() {
            assert!(!ace.resources.is_empty());
            assert!(ace.resources.iter().all(|r| !r.is_empty() && r.len() <= MAX_URI_LENGTH));
        }
        db.amacl_store().expect("parsed database must build its AMACL");
    }
});
