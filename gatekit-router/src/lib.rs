pub mod matcher;
pub mod router;
pub mod trie;

pub use matcher::{match_pattern, MatchResult};
pub use router::{Router, RouteMatch, RouterError};
