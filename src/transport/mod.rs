// Transport layer
// Outbound HTTP clients used by remote venue adapters and the price oracle
//
// Numan Thabit 2025 Nov

pub mod http;

pub use http::JsonHttp;
