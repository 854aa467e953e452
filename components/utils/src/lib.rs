pub mod env;
pub mod err;
pub mod logger;
pub mod readable_duration;
pub mod readable_size;

pub use err::ParseError;
pub use readable_duration::ReadableDuration;
pub use readable_size::ReadableSize;
