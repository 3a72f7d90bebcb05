//! Conversion requests: the client facing data model and its intake policy.
//!
//! Every submission path (queued push jobs, direct-stream conversions) goes
//! through [`validate_request`], which turns a loosely typed
//! [`RawConversionRequest`] into a [`ConversionRequest`] or reports the first
//! offending field as a [`ValidationError`].

mod allow_list;
mod types;
mod validate;

pub use allow_list::DomainAllowList;
pub use types::{
    AudioFormat, BitDepth, BitRateValue, ConversionRequest, Delivery, RawConversionRequest,
    ALLOWED_SAMPLE_RATES, MP3_BIT_RATE,
};
pub use validate::{validate_request, IntakeMode, ValidationError};
