//! Core types and trait definitions for request statistics.
//!
//! No HTTP or database code lives here. Storage backends implement
//! [`store::StatsStore`]; framework adapters drive
//! [`interceptor::StatsMiddleware`].

#![allow(async_fn_in_trait)]

pub mod dimension;
pub mod error;
pub mod interceptor;
pub mod record;
pub mod store;
pub mod summary;

pub use dimension::{ABSENT, DimensionId, DimensionIds, DimensionKind, Dimensions};
pub use error::{Error, Result};
pub use interceptor::{
  RecordingPolicy, RequestContext, RequestMeta, ResponseMeta, StatsMiddleware,
};
pub use record::{FactId, NewRequestRecord, ReqRespInfo};
pub use store::StatsStore;
