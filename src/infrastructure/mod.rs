//! 基础设施层（Infrastructure）
//!
//! 持有稀缺资源（HTTP 客户端、并发额度），只暴露能力

pub mod http_fetcher;
pub mod hydra;

pub use http_fetcher::{Fetch, HttpFetcher, ProbeOutcome, ProbeResponse, TransportFailure};
pub use hydra::{CompletionHandler, Hydra, PanicHandler, ProbeRequest, RunStats};
