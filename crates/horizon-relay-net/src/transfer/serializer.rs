//! Object serializers used by `post_object`.

use serde::Serialize;

use super::request::APPLICATION_XML;
use crate::error::ConfigError;

/// Converts a value into request body bytes.
pub trait ObjectSerializer {
    /// Content type of the produced bytes, used when the request sets none.
    fn content_type(&self) -> &'static str;

    /// Serialize `value`.
    fn serialize<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>, ConfigError>;
}

/// XML serialization via `quick-xml`. The root element is the type name.
#[derive(Clone, Copy, Debug, Default)]
pub struct XmlSerializer;

impl ObjectSerializer for XmlSerializer {
    fn content_type(&self) -> &'static str {
        APPLICATION_XML
    }

    fn serialize<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>, ConfigError> {
        quick_xml::se::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| ConfigError::Serialization(e.to_string()))
    }
}

/// JSON serialization via `serde_json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl ObjectSerializer for JsonSerializer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn serialize<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>, ConfigError> {
        serde_json::to_vec(value).map_err(|e| ConfigError::Serialization(e.to_string()))
    }
}
