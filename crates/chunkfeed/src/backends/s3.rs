// ai
//! 🪣 S3 Saver: the bucket at the end of the pipeline.
//!
//! INT. AWS CONSOLE - NIGHT. A bucket sits in us-east-1, empty, hopeful. Somewhere a
//! Rust process is about to fill it with gzip files named after Unix timestamps. The
//! bucket does not know what a facility is. The bucket does not need to.
//!
//! 🧠 Knowledge graph:
//! - Transport: `aws-sdk-s3` `PutObject`, one request per object
//! - Credentials: static keys from config if both are set, else the default AWS chain
//!   (env vars → ~/.aws/config → IAM role → hope)
//! - `endpoint_url` + `force_path_style` let it talk to MinIO, LocalStack, or a mock
//! - SDK retries are disabled: a failed chunk is a failed chunk, no second chances
//! - Success is the SDK's `Ok`, which only happens on a 2xx. Everything else is `false`.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, error};

use crate::backends::{ObjectPayload, Saver};

/// 🔧 Where in S3 the feed lands.
#[derive(Deserialize, Clone)]
pub struct S3SinkConfig {
    /// 🪣 The bucket. Required. We are not guessing bucket names.
    pub bucket: String,
    /// 🌎 Defaults to us-east-1, the Florida of AWS regions.
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// 🔗 Custom endpoint (MinIO, LocalStack, a test double). `None` = real AWS.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl std::fmt::Debug for S3SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3SinkConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

/// 🪣 Writes payloads to one bucket via `PutObject`.
#[derive(Debug, Clone)]
pub(crate) struct S3Saver {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Saver {
    /// 🚀 Build the SDK client. Nothing is sent until the first `save`.
    pub(crate) async fn new(config: &S3SinkConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled());

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "chunkfeed-config",
            ));
        }
        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        debug!("🪣 S3 saver ready for bucket '{}' in {}", config.bucket, config.region);
        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl Saver for S3Saver {
    async fn save(&self, payload: ObjectPayload, name: &str) -> bool {
        let started = Instant::now();
        let content_encoding = payload.content_encoding();
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .content_type("application/json")
            .body(ByteStream::from(payload.into_bytes()));
        if let Some(encoding) = content_encoding {
            request = request.content_encoding(encoding);
        }

        match request.send().await {
            Ok(_) => {
                debug!(
                    "🪣 s3://{}/{} uploaded. Time: {:.3}s",
                    self.bucket,
                    name,
                    started.elapsed().as_secs_f64()
                );
                true
            }
            Err(err) => {
                error!(
                    "💀 PutObject s3://{}/{} was not acknowledged: {}",
                    self.bucket,
                    name,
                    DisplayErrorContext(&err)
                );
                false
            }
        }
    }
}
