pub mod fixed_matcher;
#[cfg(feature = "http")]
pub mod http_matcher;
pub mod listen;
pub mod matcher_trait;
pub mod registry;

pub use fixed_matcher::FixedMatcher;
#[cfg(feature = "http")]
pub use http_matcher::HttpMatcher;
pub use listen::{listen, run_listener};
pub use matcher_trait::{Catalog, Matcher};
pub use registry::MatcherRegistry;
