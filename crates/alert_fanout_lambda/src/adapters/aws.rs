//! S3 and SQS implementations of the adapter traits.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;

use crate::adapters::chunk_store::ChunkStore;
use crate::adapters::device_repository::{device_object_key, DeviceRecord, DeviceRepository};
use crate::adapters::queue::QueuePublisher;
use crate::runtime::contract::Platform;

#[derive(Debug, Clone)]
pub struct S3ChunkStore {
    bucket: String,
    s3_client: aws_sdk_s3::Client,
}

impl S3ChunkStore {
    pub fn new(s3_client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            s3_client,
        }
    }
}

#[async_trait]
impl ChunkStore for S3ChunkStore {
    async fn put_chunk(&self, key: &str, body: &[u8]) -> Result<(), String> {
        self.s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body.to_vec()))
            .send()
            .await
            .map(|_| ())
            .map_err(|error| format!("failed to write chunk to s3: {error}"))
    }

    async fn get_chunk(&self, key: &str) -> Result<Vec<u8>, String> {
        let output = self
            .s3_client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|error| format!("failed to read chunk from s3: {error}"))?;

        output
            .body
            .collect()
            .await
            .map(|bytes| bytes.into_bytes().to_vec())
            .map_err(|error| format!("failed to read chunk body from s3: {error}"))
    }
}

#[derive(Debug, Clone)]
pub struct S3DeviceRepository {
    bucket: String,
    prefix: String,
    s3_client: aws_sdk_s3::Client,
}

impl S3DeviceRepository {
    pub fn new(
        s3_client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            s3_client,
        }
    }

    async fn device_exists(&self, key: &str) -> Result<bool, String> {
        match self
            .s3_client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(error)
                if error
                    .as_service_error()
                    .map(|service_error| service_error.is_not_found())
                    .unwrap_or(false) =>
            {
                Ok(false)
            }
            Err(error) => Err(format!("failed to look up device in s3: {error}")),
        }
    }
}

#[async_trait]
impl DeviceRepository for S3DeviceRepository {
    async fn upsert_device(&self, device: &DeviceRecord) -> Result<(), String> {
        let key = device_object_key(&self.prefix, device.platform, &device.device_token);
        let body = serde_json::to_vec(device)
            .map_err(|error| format!("failed to encode device record: {error}"))?;

        self.s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|error| format!("failed to write device to s3: {error}"))
    }

    async fn delete_device(&self, platform: Platform, device_token: &str) -> Result<bool, String> {
        let key = device_object_key(&self.prefix, platform, device_token);
        if !self.device_exists(&key).await? {
            return Ok(false);
        }

        self.s3_client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map(|_| true)
            .map_err(|error| format!("failed to delete device from s3: {error}"))
    }
}

#[derive(Debug, Clone)]
pub struct SqsQueuePublisher {
    sqs_client: aws_sdk_sqs::Client,
}

impl SqsQueuePublisher {
    pub fn new(sqs_client: aws_sdk_sqs::Client) -> Self {
        Self { sqs_client }
    }
}

#[async_trait]
impl QueuePublisher for SqsQueuePublisher {
    async fn publish(&self, queue_url: &str, body: &str) -> Result<(), String> {
        self.sqs_client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| format!("failed to enqueue message: {error}"))
    }
}
