// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! # app-utils
//!
//! Host-side helpers for embedding the secure resource manager.
//!
//! This crate provides non-core features:
//! - Security database loading (YAML or JSON)
//! - A system clock for time-window checks
//! - `tracing` subscriber setup

#![forbid(unsafe_code)]

pub mod error;

pub mod db {
    //! Security database documents
    //!
    //! ```yaml
    //! owner: "3q2+796tvu/erb7v3q2+7w=="
    //! device_id: "ERERERERERERERERERERBA=="
    //! acl:
    //!   - sub: "Kg=="
    //!     rsrc: ["/a/led"]
    //!     perms: 2
    //! amacl:
    //!   - rsrc: ["/a/fan"]
    //!     amss: ["paWlpaWlpaWlpaWlpaWlpQ=="]
    //! ```

    use crate::error::{Error, Result};
    use core_identity::SubjectId;
    use core_policy::{AccessControlEntry, AclStore, AmaclEntry, AmaclStore};
    use serde::{Deserialize, Serialize};
    use std::path::Path;

    /// Owner, ACL and AMACL of one device
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct SecurityDatabase {
        /// Device owner; bypasses every ACE
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub owner: Option<SubjectId>,

        /// When set, the default discovery ACL owned by this id comes first
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub device_id: Option<SubjectId>,

        /// Access control entries, in evaluation order
        #[serde(default)]
        pub acl: Vec<AccessControlEntry>,

        /// Resources whose decisions are delegated to an AMS
        #[serde(default)]
        pub amacl: Vec<AmaclEntry>,
    }

    impl SecurityDatabase {
        /// Build the ACL store, default ACL first when `device_id` is set
        ///
        /// # Errors
        ///
        /// `Error::Policy` if an ACE is invalid or the store overflows.
        pub fn acl_store(&self) -> Result<AclStore> {
            let mut store = match self.device_id {
                Some(device_id) => AclStore::with_default_acl(device_id),
                None => AclStore::new(),
            };
            store.extend(self.acl.clone())?;
            Ok(store)
        }

        /// Build the AMACL store
        ///
        /// # Errors
        ///
        /// `Error::Policy` if an entry is invalid.
        pub fn amacl_store(&self) -> Result<AmaclStore> {
            Ok(AmaclStore::from_entries(self.amacl.clone())?)
        }

        /// Check every entry
        ///
        /// # Errors
        ///
        /// The first `Error::Policy` found.
        pub fn validate(&self) -> Result<()> {
            self.acl_store()?;
            self.amacl_store()?;
            Ok(())
        }

        /// Load a file, picking the parser from its extension
        ///
        /// `.json` files are read as JSON, everything else as YAML.
        ///
        /// # Errors
        ///
        /// I/O, parse or validation errors.
        pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            let input = std::fs::read_to_string(path)?;
            let is_json = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if is_json {
                JsonParser.parse(&input)
            } else {
                YamlParser.parse(&input)
            }
        }
    }

    /// Trait for database parsers (OCP - extensible to other formats)
    pub trait DatabaseParser {
        /// Parse and validate a database
        ///
        /// # Errors
        ///
        /// Parse or validation errors.
        fn parse(&self, input: &str) -> Result<SecurityDatabase>;
    }

    /// YAML parser implementation
    #[derive(Debug, Clone, Copy, Default)]
    pub struct YamlParser;

    impl DatabaseParser for YamlParser {
        fn parse(&self, input: &str) -> Result<SecurityDatabase> {
            let db: SecurityDatabase =
                serde_yaml::from_str(input).map_err(|e| Error::YamlParseError(e.to_string()))?;
            db.validate()?;
            Ok(db)
        }
    }

    /// JSON parser implementation
    #[derive(Debug, Clone, Copy, Default)]
    pub struct JsonParser;

    impl DatabaseParser for JsonParser {
        fn parse(&self, input: &str) -> Result<SecurityDatabase> {
            let db: SecurityDatabase =
                serde_json::from_str(input).map_err(|e| Error::JsonParseError(e.to_string()))?;
            db.validate()?;
            Ok(db)
        }
    }

    /// Serialize a database to YAML
    ///
    /// # Errors
    ///
    /// `Error::YamlParseError` if serialization fails.
    pub fn to_yaml(db: &SecurityDatabase) -> Result<String> {
        serde_yaml::to_string(db).map_err(|e| Error::YamlParseError(e.to_string()))
    }
}

pub mod clock {
    //! Wall-clock source for time-window checks

    use chrono::{Local, NaiveDateTime};
    use core_policy::Clock;

    /// Local time of the host
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> NaiveDateTime {
            Local::now().naive_local()
        }
    }
}

pub mod logging {
    //! `tracing` subscriber setup

    use crate::error::{Error, Result};
    use tracing_subscriber::EnvFilter;

    /// Install a fmt subscriber filtered by `RUST_LOG`, else `default_filter`
    ///
    /// # Errors
    ///
    /// `Error::Logging` if the filter is invalid or a subscriber is
    /// already installed.
    pub fn init_tracing(default_filter: &str) -> Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .map_err(|e| Error::Logging(e.to_string()))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .map_err(|e| Error::Logging(e.to_string()))
    }
}

/// Re-export commonly used types
pub use clock::SystemClock;
pub use db::{DatabaseParser, JsonParser, SecurityDatabase, YamlParser};
pub use error::{Error, Result};
