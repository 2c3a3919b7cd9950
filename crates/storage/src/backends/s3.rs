//! S3-compatible storage backend using AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ListingOptions, ListingPage, ObjectStore, PageStream, validate_key};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::future::ProvideCredentials as ProvideCredentialsFuture;
use aws_sdk_s3::Client;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use bytes::Bytes;
use keyfs_core::{S3_MAX_KEY_LENGTH, S3Config};
use tokio::sync::OnceCell;
use tracing::instrument;

const DEFAULT_REGION: &str = "us-east-1";

/// Tag carried by lazy credential failures so they surface as configuration
/// errors rather than opaque transport errors.
const CREDENTIALS_ERROR_MARKER: &str = "keyfs-s3-credentials";

/// Builds the AWS default credential chain on the first signed request, so
/// constructing a backend has no side effects.
#[derive(Debug)]
struct LazyCredentials {
    region: String,
    chain: OnceCell<DefaultCredentialsChain>,
}

impl LazyCredentials {
    fn new(region: String) -> Self {
        Self {
            region,
            chain: OnceCell::new(),
        }
    }

    async fn credentials(&self) -> aws_credential_types::provider::Result {
        let chain = self
            .chain
            .get_or_init(|| async {
                DefaultCredentialsChain::builder()
                    .region(aws_config::Region::new(self.region.clone()))
                    .build()
                    .await
            })
            .await;

        chain.provide_credentials().await.map_err(|err| {
            CredentialsError::provider_error(format!(
                "{CREDENTIALS_ERROR_MARKER}: AWS credential resolution failed: {err}"
            ))
        })
    }
}

impl ProvideCredentials for LazyCredentials {
    fn provide_credentials<'a>(&'a self) -> ProvideCredentialsFuture<'a>
    where
        Self: 'a,
    {
        ProvideCredentialsFuture::new(self.credentials())
    }
}

fn map_s3_error<E>(err: aws_sdk_s3::error::SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    if err.to_string().contains(CREDENTIALS_ERROR_MARKER) {
        return StorageError::Config(
            "S3 credential resolution failed. Set s3.access_key_id and s3.secret_access_key or provide ambient AWS credentials."
                .to_string(),
        );
    }
    StorageError::S3(Box::new(err))
}

/// Prepend `http://` to bare `host:port` endpoints.
fn normalize_endpoint(endpoint: &str) -> String {
    let lower = endpoint.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

/// S3 object store scoped to one bucket.
pub struct S3Backend {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Create a backend for `bucket`.
    ///
    /// No network traffic happens here; credentials from the ambient chain are
    /// resolved on the first request.
    pub fn new(bucket: &str, config: &S3Config) -> StorageResult<Self> {
        config.validate()?;

        let region = config
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()));

        builder = match (&config.access_key_id, &config.secret_access_key) {
            (Some(key_id), Some(secret)) => {
                builder.credentials_provider(aws_sdk_s3::config::Credentials::new(
                    key_id.clone(),
                    secret.clone(),
                    None,
                    None,
                    "keyfs-config",
                ))
            }
            _ => builder.credentials_provider(LazyCredentials::new(region.clone())),
        };

        let endpoint = config.endpoint.as_deref().map(normalize_endpoint);
        if let Some(url) = &endpoint {
            builder = builder.endpoint_url(url);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
            region,
            endpoint,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    #[instrument(skip(self, data), fields(backend = "s3", bucket = %self.bucket, size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        validate_key(key, S3_MAX_KEY_LENGTH)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(data.into())
            .send()
            .await
            .map_err(map_s3_error)?;
        Ok(())
    }

    fn list_pages<'a>(&'a self, prefix: &str, options: ListingOptions) -> PageStream<'a> {
        let prefix = prefix.to_string();
        let page_size = options.normalized_page_size();

        let stream = async_stream::try_stream! {
            let mut continuation_token: Option<String> = None;

            loop {
                let mut request = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .prefix(&prefix)
                    .max_keys(page_size as i32);

                if let Some(token) = continuation_token.take() {
                    request = request.continuation_token(token);
                }

                let output = request.send().await.map_err(map_s3_error)?;

                let keys: Vec<String> = output
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string))
                    .collect();

                tracing::trace!(
                    backend = "s3",
                    bucket = %self.bucket,
                    keys = keys.len(),
                    "listed page"
                );

                if !keys.is_empty() {
                    yield ListingPage { keys };
                }

                if output.is_truncated() == Some(true) {
                    continuation_token = output.next_continuation_token().map(str::to_string);
                    if continuation_token.is_none() {
                        break;
                    }
                } else {
                    break;
                }
            }
        };

        Box::pin(stream)
    }

    #[instrument(skip(self, keys), fields(backend = "s3", bucket = %self.bucket, count = keys.len()))]
    async fn delete_batch(&self, keys: &[String]) -> StorageResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::S3(Box::new(e)))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| StorageError::S3(Box::new(e)))?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(map_s3_error)?;

        // Quiet mode only reports failures.
        if let Some(failure) = output.errors().first() {
            return Err(StorageError::DeleteFailed {
                key: failure.key().unwrap_or_default().to_string(),
                message: failure
                    .message()
                    .or(failure.code())
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        Ok(keys.len())
    }

    fn max_key_length(&self) -> usize {
        S3_MAX_KEY_LENGTH
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
