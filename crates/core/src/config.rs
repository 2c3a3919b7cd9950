//! Client configuration.

use crate::error::{Error, Result};
use crate::plan::S3_MAX_KEY_LENGTH;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Concurrency ceiling when none (or a non-positive one) is configured.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Keys requested per listing page, and the size of each delete batch.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// S3 accepts at most 1000 keys per DeleteObjects call.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Top-level client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Maximum number of chunk transfers in flight.
    #[serde(
        default = "default_concurrency",
        deserialize_with = "lenient_concurrency"
    )]
    pub concurrency: usize,
    /// Keys per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Store key length limit in bytes.
    #[serde(default = "default_max_key_length")]
    pub max_key_length: usize,
    /// S3 connection settings.
    #[serde(default)]
    pub s3: S3Config,
}

/// S3 connection settings. The bucket comes from the location argument.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct S3Config {
    /// Optional endpoint URL (for MinIO, etc.).
    pub endpoint: Option<String>,
    /// AWS region.
    pub region: Option<String>,
    /// Falls back to the ambient AWS credential chain when unset.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Use `endpoint/bucket/key` URLs instead of `bucket.endpoint/key`.
    #[serde(default)]
    pub force_path_style: bool,
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_key_length() -> usize {
    S3_MAX_KEY_LENGTH
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            page_size: default_page_size(),
            max_key_length: default_max_key_length(),
            s3: S3Config::default(),
        }
    }
}

impl ClientConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.max_key_length == 0 {
            return Err(Error::Config("max_key_length must be positive".to_string()));
        }
        self.s3.validate()
    }

    /// Page size clamped to what a single delete batch accepts.
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

impl S3Config {
    pub fn validate(&self) -> Result<()> {
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(Error::Config(
                "s3 config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a raw concurrency setting, falling back to the default for anything
/// missing, unparsable or not positive.
pub fn parse_concurrency(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_CONCURRENCY)
}

/// Accepts integers or strings (environment values arrive as either) and never
/// fails: bad values resolve to [`DEFAULT_CONCURRENCY`].
fn lenient_concurrency<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct ConcurrencyVisitor;

    impl<'de> de::Visitor<'de> for ConcurrencyVisitor {
        type Value = usize;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a positive integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<usize, E> {
            Ok(parse_concurrency(Some(&v.to_string())))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<usize, E> {
            Ok(parse_concurrency(Some(&v.to_string())))
        }

        fn visit_f64<E: de::Error>(self, _v: f64) -> std::result::Result<usize, E> {
            Ok(DEFAULT_CONCURRENCY)
        }

        fn visit_bool<E: de::Error>(self, _v: bool) -> std::result::Result<usize, E> {
            Ok(DEFAULT_CONCURRENCY)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<usize, E> {
            Ok(parse_concurrency(Some(v)))
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<usize, E> {
            Ok(DEFAULT_CONCURRENCY)
        }
    }

    deserializer.deserialize_any(ConcurrencyVisitor)
}
