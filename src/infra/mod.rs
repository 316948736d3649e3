pub mod http_client;
pub mod payload_store;
