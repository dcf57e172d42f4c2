pub mod alert;
pub mod device;
pub mod push;
pub mod sqs;
