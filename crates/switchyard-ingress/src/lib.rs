//! The Ingress Router (spec.md §4.A): the single entry point inbound
//! webhooks pass through before a work item is persisted and admitted into
//! the Session Queue.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod http;
mod router;

pub use error::{IngressError, IngressResult};
pub use http::router as http_router;
pub use router::{IngressRouter, RouteOutcome, WORK_ITEM_CREATED_EVENT_TYPE};
