use async_trait::async_trait;

#[async_trait]
pub trait QueuePublisher: Send + Sync {
    async fn publish(&self, queue_url: &str, body: &str) -> Result<(), String>;
}
