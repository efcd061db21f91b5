//! Auth configuration and the strategy trait

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Location for API key placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Place in HTTP header
    #[default]
    Header,
    /// Place in query parameter
    Query,
}

/// Pluggable request authentication
pub trait AuthStrategy: Send + Sync + std::fmt::Debug {
    /// Attach credentials to an outbound request
    fn apply(&self, req: RequestBuilder) -> RequestBuilder;
}

/// Authentication configuration as read from the tap config
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// API key in a header or query parameter
    ApiKey {
        /// Where to place the key
        #[serde(default)]
        location: Location,
        /// Header or query parameter name
        #[serde(default = "default_key_name")]
        name: String,
        /// Prefix before the value (e.g. "Token ")
        #[serde(default)]
        prefix: Option<String>,
        /// The key itself
        value: String,
    },

    /// HTTP Basic authentication
    Basic {
        /// User name
        username: String,
        /// Password, empty when absent
        #[serde(default)]
        password: Option<String>,
    },

    /// Bearer token authentication
    Bearer {
        /// Token sent as `Authorization: Bearer <token>`
        token: String,
    },

    /// Static headers added to each request
    Headers {
        /// Header name -> value
        headers: HashMap<String, String>,
    },
}

fn default_key_name() -> String {
    "Authorization".to_string()
}

impl AuthConfig {
    /// Freeze this config into a shareable strategy
    pub fn into_strategy(self) -> Arc<dyn AuthStrategy> {
        Arc::new(self)
    }
}

const REDACTED: &str = "<redacted>";

/// Secrets are never printed; names and locations are.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::None => f.write_str("None"),
            AuthConfig::ApiKey {
                location,
                name,
                prefix,
                ..
            } => f
                .debug_struct("ApiKey")
                .field("location", location)
                .field("name", name)
                .field("prefix", prefix)
                .field("value", &REDACTED)
                .finish(),
            AuthConfig::Basic { username, password } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &password.as_ref().map(|_| REDACTED))
                .finish(),
            AuthConfig::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &REDACTED)
                .finish(),
            AuthConfig::Headers { headers } => {
                let mut names: Vec<&str> = headers.keys().map(String::as_str).collect();
                names.sort_unstable();
                f.debug_struct("Headers")
                    .field("headers", &names)
                    .finish_non_exhaustive()
            }
        }
    }
}

impl AuthStrategy for AuthConfig {
    fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            AuthConfig::None => req,

            AuthConfig::ApiKey {
                location,
                name,
                prefix,
                value,
            } => {
                let val = format!("{}{}", prefix.as_deref().unwrap_or(""), value);
                match location {
                    Location::Header => req.header(name.as_str(), val),
                    Location::Query => req.query(&[(name.as_str(), val.as_str())]),
                }
            }

            AuthConfig::Basic { username, password } => {
                req.basic_auth(username, password.as_deref())
            }

            AuthConfig::Bearer { token } => req.bearer_auth(token),

            AuthConfig::Headers { headers } => headers
                .iter()
                .fold(req, |req, (key, value)| req.header(key.as_str(), value.as_str())),
        }
    }
}
