pub mod config;
pub mod http;
pub mod provider;
pub mod types;

pub use config::BackendConfig;
pub use http::HttpBackend;
pub use provider::{BackendClient, BackendError, BackendResult};
pub use types::{FetchResponse, FunctionResponse, QueryResponse, Session};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::http::*;
    pub use crate::provider::*;
    pub use crate::types::*;
}
