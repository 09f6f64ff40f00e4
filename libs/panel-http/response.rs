use crate::error::{HttpError, Result};
use crate::request::RequestConfig;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Decoded response payload, chosen by content type
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
}

impl ResponseBody {
    /// Decode according to the declared content type
    ///
    /// JSON types are parsed; a body that fails to parse is logged and kept
    /// as text. `text/*` becomes a string, anything else stays binary.
    pub fn decode(content_type: Option<&str>, bytes: &[u8]) -> Self {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if mime == "application/json" || mime.ends_with("+json") {
            match serde_json::from_slice(bytes) {
                Ok(value) => ResponseBody::Json(value),
                Err(e) => {
                    warn!("Response declared JSON but failed to parse: {}", e);
                    ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned())
                }
            }
        } else if mime.starts_with("text/") {
            ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned())
        } else {
            ResponseBody::Binary(bytes.to_vec())
        }
    }

    /// Deserialize a JSON body into `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            ResponseBody::Json(value) => Ok(T::deserialize(value)?),
            ResponseBody::Text(text) => Ok(serde_json::from_str(text)?),
            ResponseBody::Binary(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ResponseBody::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// A settled response, as seen and mutated by response interceptors
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub data: ResponseBody,
    pub status: u16,
    pub headers: HeaderMap,
    pub config: RequestConfig,
}

impl HttpResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Deserialize the body into `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        self.data.json().map_err(|e| match e {
            HttpError::Serialization(msg) => {
                HttpError::Serialization(format!("{} {}: {}", self.config.method, self.config.url, msg))
            }
            other => other,
        })
    }
}
