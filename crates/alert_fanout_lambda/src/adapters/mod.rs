pub mod aws;
pub mod chunk_store;
pub mod device_repository;
pub mod push_gateway;
pub mod queue;

#[cfg(test)]
pub(crate) mod memory;
