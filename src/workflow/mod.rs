pub mod probe_ctx;
pub mod request_queue;

pub use probe_ctx::ProbeCtx;
pub use request_queue::{describe_handler_panic, describe_transport_failure, QueueContext, RequestQueue};
