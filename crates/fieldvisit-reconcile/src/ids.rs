//! Identifier scheme for reconciled customers.
//!
//! Identities backed by a row (customer, catalog location, report with a
//! location UUID) reuse that row's UUID unless an earlier identity already
//! holds it. Identities that exist only as a typed name get a synthetic id
//! derived from the normalized key, so the same name maps to the same id on
//! every load and in every view.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ADHOC_PREFIX: &str = "adhoc-";
const REPORT_PREFIX: &str = "report-";

/// Characters left unescaped in a synthetic id, matching URI component rules.
const KEY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Which stream created an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    Customer,
    ScheduleLocation,
    Visit,
    Report,
}

/// Opaque customer identifier, safe to put in a URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

/// What a [`CustomerId`] points back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerRef {
    /// A backing row (customer or location) with this UUID.
    Row(Uuid),
    /// A `adhoc-`/`report-` id whose remainder decodes cleanly, with the
    /// decoded key. The same text may also be a store name typed with that
    /// prefix, so callers should try it as a name too.
    Synthetic(String),
    /// A store name, normalized.
    Key(String),
}

impl CustomerId {
    /// Assign the id for an identity seeded from `source`.
    ///
    /// `backing` is the UUID of the seeding row, when there is one. Visit-seeded
    /// identities always get a synthetic id: a visit row's id names the visit,
    /// not the store.
    #[must_use]
    pub fn assign(source: IdentitySource, key: &str, backing: Option<Uuid>) -> Self {
        match (source, backing) {
            (IdentitySource::Visit, _) => Self::synthetic(ADHOC_PREFIX, key),
            (_, Some(uuid)) => Self(uuid.to_string()),
            (IdentitySource::Report, None) => Self::synthetic(REPORT_PREFIX, key),
            (IdentitySource::Customer | IdentitySource::ScheduleLocation, None) => {
                Self::synthetic(ADHOC_PREFIX, key)
            }
        }
    }

    fn synthetic(prefix: &str, key: &str) -> Self {
        Self(format!(
            "{prefix}{}",
            utf8_percent_encode(key, KEY_COMPONENT)
        ))
    }

    /// Wrap an id received from a caller (URL path, CLI argument).
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the id into the row or key it refers to.
    ///
    /// A prefix is only stripped when the remainder percent-decodes to UTF-8
    /// with a non-empty key. Anything else that is not a UUID is treated as a
    /// store name and normalized.
    #[must_use]
    pub fn parse(&self) -> CustomerRef {
        let raw = self.0.trim();
        if let Ok(uuid) = Uuid::parse_str(raw) {
            return CustomerRef::Row(uuid);
        }
        let synthetic = raw
            .strip_prefix(ADHOC_PREFIX)
            .or_else(|| raw.strip_prefix(REPORT_PREFIX))
            .and_then(|encoded| percent_decode_str(encoded).decode_utf8().ok())
            .map(|decoded| crate::normalize(Some(&decoded)))
            .filter(|key| !key.is_empty());
        match synthetic {
            Some(key) => CustomerRef::Synthetic(key),
            None => CustomerRef::Key(crate::normalize(Some(raw))),
        }
    }

    /// The whole id read as a typed store name.
    #[must_use]
    pub fn as_name_key(&self) -> String {
        crate::normalize(Some(&self.0))
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
