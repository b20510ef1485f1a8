use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Header carrying the local Network application API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// The platform type of the UniFi controller.
///
/// Determines the path prefix under which the Network application lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPlatform {
    /// UniFi OS console (UDM, UCG, UDR, ...) -- `/proxy/network/` prefix.
    UnifiOs,
    /// Standalone Network Application -- no prefix.
    ClassicController,
}

impl ControllerPlatform {
    /// The path prefix for Network application endpoints.
    pub fn network_prefix(self) -> &'static str {
        match self {
            Self::UnifiOs => "/proxy/network",
            Self::ClassicController => "",
        }
    }

    /// Unauthenticated endpoint that exists only on UniFi OS consoles.
    ///
    /// Any answer other than 404 (even 401/405) means UniFi OS.
    pub fn probe_path() -> &'static str {
        "/api/auth/login"
    }
}

/// Build the default header map for API key authentication.
///
/// The key is marked sensitive so it never shows up in debug output.
pub fn api_key_headers(api_key: &SecretString) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    let mut value =
        HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::InvalidApiKey {
            reason: e.to_string(),
        })?;
    value.set_sensitive(true);
    headers.insert(API_KEY_HEADER, value);
    headers.insert("Accept", HeaderValue::from_static("application/json"));
    Ok(headers)
}
