use core::{future::Future, time::Duration};
use std::{io, path::Path};

use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
    error::{DisplayErrorContext, SdkError},
    operation::head_object::HeadObjectError,
    primitives::ByteStream,
};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::config::StoreConfig;

use super::{HeadOutcome, ObjectStore, StoreError};

/// An S3 (or S3 compatible) bucket.
///
/// The SDK is asynchronous, requests are driven to completion on a runtime owned by the store.
pub struct S3Store {
    client: Client,
    bucket: String,
    timeout: Duration,
    runtime: Runtime,
}

impl S3Store {
    /// Create a client for the configured bucket.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(StoreError::Runtime)?;

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        if let Some(credentials) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                None,
                None,
                "bucket-backup-config",
            ));
        }

        let sdk_config = runtime.block_on(loader.load());
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            timeout: config.timeout(),
            runtime,
        })
    }

    /// Drive `request` to completion, cancelling it once the deadline passes.
    fn with_deadline<F: Future>(
        &self,
        operation: &'static str,
        key: &str,
        request: F,
    ) -> Result<F::Output, StoreError> {
        self.runtime
            .block_on(async { tokio::time::timeout(self.timeout, request).await })
            .map_err(|_| StoreError::Timeout(operation, key.to_string(), self.timeout))
    }
}

impl ObjectStore for S3Store {
    fn head_object(&self, key: &str) -> HeadOutcome {
        let request = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send();

        match self.with_deadline("check", key, request) {
            Ok(Ok(_)) => HeadOutcome::Found,
            Ok(Err(error)) if is_not_found(&error) => HeadOutcome::NotFound,
            Ok(Err(error)) => HeadOutcome::TransportError(StoreError::Request(
                "check",
                key.to_string(),
                DisplayErrorContext(&error).to_string(),
            )),
            Err(error) => HeadOutcome::TransportError(error),
        }
    }

    fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let content_length = i64::try_from(body.len()).ok();
        debug!("Putting {} bytes at '{key}'", body.len());

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .set_content_length(content_length)
            .body(ByteStream::from(body))
            .send();

        self.with_deadline("upload", key, request)?.map_err(|error| {
            StoreError::Request(
                "upload",
                key.to_string(),
                DisplayErrorContext(&error).to_string(),
            )
        })?;

        Ok(())
    }

    fn put_file(&self, key: &str, path: &Path) -> Result<(), StoreError> {
        debug!("Streaming {path:?} to '{key}'");

        let request = async {
            let body = ByteStream::from_path(path)
                .await
                .map_err(|e| StoreError::ReadArtifact(io::Error::other(e), path.to_path_buf()))?;

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|error| {
                    StoreError::Request(
                        "upload",
                        key.to_string(),
                        DisplayErrorContext(&error).to_string(),
                    )
                })
        };

        self.with_deadline("upload", key, request)??;

        Ok(())
    }
}

/// HEAD responses carry no body, so a bare 404 is also treated as a missing object.
fn is_not_found(error: &SdkError<HeadObjectError>) -> bool {
    if error
        .as_service_error()
        .is_some_and(HeadObjectError::is_not_found)
    {
        return true;
    }

    error
        .raw_response()
        .is_some_and(|response| response.status().as_u16() == 404)
}
