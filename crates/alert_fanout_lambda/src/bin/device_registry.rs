use std::sync::Arc;

use alert_fanout_lambda::adapters::aws::S3DeviceRepository;
use alert_fanout_lambda::config::DeviceRegistryConfig;
use alert_fanout_lambda::error::InitError;
use alert_fanout_lambda::handlers::device::device_registry;
use alert_fanout_lambda::handlers::sqs::{handle_sqs_invocation, ProcessResources};
use alert_fanout_lambda::runtime::config::env_lookup;
use alert_fanout_lambda::telemetry::init_tracing;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tokio::sync::OnceCell;

async fn build_resources() -> Result<ProcessResources, InitError> {
    let config = DeviceRegistryConfig::from_lookup(&env_lookup)?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let repository = S3DeviceRepository::new(
        aws_sdk_s3::Client::new(&aws_config),
        config.bucket,
        config.prefix,
    );

    Ok(ProcessResources {
        registry: device_registry(Arc::new(repository))?,
        deadline_margin: config.deadline_margin,
    })
}

async fn handle_request(
    resources: &OnceCell<ProcessResources>,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let response = handle_sqs_invocation(
        resources,
        build_resources,
        &event.payload,
        event.context.deadline,
    )
    .await?;
    serde_json::to_value(response)
        .map_err(|error| Error::from(format!("failed to serialize batch response: {error}")))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    let resources = OnceCell::new();
    let resources = &resources;
    lambda_runtime::run(service_fn(move |event| handle_request(resources, event))).await
}
