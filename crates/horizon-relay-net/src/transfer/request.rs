//! Request descriptions for fetch and post calls.
//!
//! Requests are plain data. They are validated when handed to an engine,
//! before anything is dispatched.

use std::any::Any;

use http::header::CONTENT_TYPE;
use http::{HeaderName, HeaderValue};
use url::Url;

use super::result::CorrelatedPayload;
use crate::config::TransferConfig;
use crate::error::{ConfigError, Result};
use crate::transport::HttpMethod;

/// Content type used by `post_string` when none is given.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Content type used by `post_object` when none is given.
pub const APPLICATION_XML: &str = "application/xml";

/// A GET request.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    uri: String,
    file_name: Option<String>,
    headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// Create a request for `uri`.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            file_name: None,
            headers: Vec::new(),
        }
    }

    /// Append a file name to the URI path.
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add several request headers.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// The URI as given.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub(crate) fn prepare(&self, config: &TransferConfig) -> Result<Prepared> {
        prepare(&self.uri, self.file_name.as_deref(), &self.headers, config)
    }
}

/// A POST, PUT, DELETE or PATCH request.
#[derive(Clone, Debug)]
pub struct PostRequest {
    uri: String,
    verb: HttpMethod,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    correlated: Option<CorrelatedPayload>,
}

impl PostRequest {
    /// Create a POST request for `uri`.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            verb: HttpMethod::Post,
            content_type: None,
            headers: Vec::new(),
            correlated: None,
        }
    }

    /// Use another verb: POST, PUT, DELETE or PATCH.
    ///
    /// `HttpMethod::Get` is rejected with [`ConfigError::UnsupportedVerb`]
    /// when the request is sent; fetches go through the fetch engine.
    pub fn verb(mut self, verb: HttpMethod) -> Self {
        self.verb = verb;
        self
    }

    /// Set the body content type, overriding the operation's default.
    ///
    /// A `Content-Type` passed through [`header`](Self::header) is treated
    /// the same way; this setter wins when both are given.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add several request headers.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a value to be returned in the result's correlated payload.
    pub fn correlated<V: Any + Send + Sync>(mut self, value: V) -> Self {
        self.correlated = Some(CorrelatedPayload::new(value));
        self
    }

    /// The URI as given.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The verb that will be used.
    pub fn method(&self) -> HttpMethod {
        self.verb
    }

    pub(crate) fn correlated_payload(&self) -> Option<CorrelatedPayload> {
        self.correlated.clone()
    }

    pub(crate) fn prepare(&self, config: &TransferConfig, default_content_type: &str) -> Result<Prepared> {
        let mut prepared = prepare(&self.uri, None, &self.headers, config)?;
        if self.verb == HttpMethod::Get {
            return Err(ConfigError::UnsupportedVerb(self.verb));
        }

        // The body's content type is sent once, never alongside a caller copy.
        let mut from_headers = None;
        prepared.headers.retain(|(name, value)| {
            if name == CONTENT_TYPE {
                from_headers = Some(value.clone());
                false
            } else {
                true
            }
        });

        prepared.content_type = Some(match (&self.content_type, from_headers) {
            (Some(explicit), _) => HeaderValue::from_str(explicit)?,
            (None, Some(header)) => header,
            (None, None) => HeaderValue::from_str(default_content_type)?,
        });
        Ok(prepared)
    }
}

/// A request that passed validation.
#[derive(Debug)]
pub(crate) struct Prepared {
    pub(crate) url: Url,
    pub(crate) headers: Vec<(HeaderName, HeaderValue)>,
    pub(crate) content_type: Option<HeaderValue>,
}

fn prepare(
    uri: &str,
    file_name: Option<&str>,
    headers: &[(String, String)],
    config: &TransferConfig,
) -> Result<Prepared> {
    if let Some((name, _)) = headers.iter().find(|(name, _)| config.is_reserved_header(name)) {
        return Err(ConfigError::ReservedHeader(name.clone()));
    }

    let headers = headers
        .iter()
        .map(|(name, value)| -> Result<(HeaderName, HeaderValue)> {
            Ok((
                HeaderName::from_bytes(name.trim().as_bytes())?,
                HeaderValue::from_str(value)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut url = Url::parse(uri)?;
    if let Some(file_name) = file_name {
        url.path_segments_mut()
            .map_err(|()| ConfigError::InvalidUrl(format!("cannot append a path to `{uri}`")))?
            .pop_if_empty()
            .push(file_name);
    }

    Ok(Prepared {
        url,
        headers,
        content_type: None,
    })
}
