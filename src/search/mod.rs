//! Web search: the answer-API client and the concurrent query executor.

pub mod client;
pub mod executor;
pub mod result;

pub use client::{ExaClient, SearchClient};
pub use executor::{QueryExecutor, QueryResults};
pub use result::{Citation, NO_ANSWER, SearchResult};
