use async_trait::async_trait;

#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn put_chunk(&self, key: &str, body: &[u8]) -> Result<(), String>;
    async fn get_chunk(&self, key: &str) -> Result<Vec<u8>, String>;
}
