use std::sync::Arc;

use alert_fanout_lambda::adapters::aws::S3ChunkStore;
use alert_fanout_lambda::adapters::push_gateway::HttpPushGateway;
use alert_fanout_lambda::config::PushSenderConfig;
use alert_fanout_lambda::error::InitError;
use alert_fanout_lambda::handlers::push::push_sender_registry;
use alert_fanout_lambda::handlers::sqs::{handle_sqs_invocation, ProcessResources};
use alert_fanout_lambda::runtime::config::env_lookup;
use alert_fanout_lambda::telemetry::init_tracing;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tokio::sync::OnceCell;

async fn build_resources() -> Result<ProcessResources, InitError> {
    let config = PushSenderConfig::from_lookup(&env_lookup)?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3ChunkStore::new(aws_sdk_s3::Client::new(&aws_config), config.chunk_bucket);
    let http_client = reqwest::Client::builder()
        .build()
        .map_err(|error| InitError::Client(format!("failed to build http client: {error}")))?;
    let gateway = HttpPushGateway::new(http_client, config.push_gateway_url);

    Ok(ProcessResources {
        registry: push_sender_registry(Arc::new(store), Arc::new(gateway))?,
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
