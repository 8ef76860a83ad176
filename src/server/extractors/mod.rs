mod forwarded_cookie_extractor;
mod validation_extractor;

pub use forwarded_cookie_extractor::*;
pub use validation_extractor::*;
