//! Store location parsing.

use crate::error::{Error, Result};
use percent_encoding::percent_decode_str;
use std::fmt;
use std::str::FromStr;

/// Scheme every location must carry.
pub const SCHEME: &str = "s3";

const SCHEME_MARKER: &str = "s3://";

/// The `(container, prefix)` pair scoping one encode, restore or delete.
///
/// The prefix is either empty or ends with `/`, never starts with `/`, and
/// never contains empty path segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace {
    container: String,
    prefix: String,
}

impl Namespace {
    /// Parse a location of the form `s3://container/prefix`.
    pub fn parse(location: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidLocation {
            location: location.to_string(),
            reason: reason.to_string(),
        };

        let rest = location
            .strip_prefix(SCHEME_MARKER)
            .ok_or_else(|| invalid("must start with s3://"))?;

        // Query and fragment carry no meaning for a bucket location.
        let rest = rest.find(['?', '#']).map_or(rest, |end| &rest[..end]);

        let (container, path) = rest.split_once('/').unwrap_or((rest, ""));
        if container.is_empty() {
            return Err(invalid("missing bucket name"));
        }

        if has_invalid_escape(path) {
            return Err(invalid("invalid percent-escape in path"));
        }
        let path = percent_decode_str(path)
            .decode_utf8()
            .map_err(|_| invalid("path is not valid UTF-8 once unescaped"))?;

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let prefix = if segments.is_empty() {
            String::new()
        } else {
            format!("{}/", segments.join("/"))
        };

        Ok(Self {
            container: container.to_string(),
            prefix,
        })
    }

    /// Bucket name.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Key prefix, empty or `/`-terminated.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// A `%` not followed by two hex digits.
fn has_invalid_escape(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    })
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}://{}/{}", self.container, self.prefix)
    }
}
