pub mod content_item;
pub mod document_check;
pub mod loaders;

pub use content_item::{ContentItem, DecodeError, ObservedPayload, RedirectRoute, WithdrawnNotice};
pub use document_check::{AttachableState, DocumentCheck, Expectation, Unpublishing, UnpublishingReason};
pub use loaders::{load_checks, load_checks_file, parse_checks};
