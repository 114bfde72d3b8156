use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use url::Url;

use crate::auth::{AuthClient, TokenSource};
use crate::error::NetError;
use crate::types::Headers;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, NetError>> + Send>>;

/// Body of a streaming response, plus the size the server advertised.
///
/// `content_length` is `None` when the server sent no Content-Length
/// header (chunked transfer). Progress reporting degrades gracefully
/// in that case.
pub struct StreamingBody {
    pub stream: ByteStream,
    pub content_length: Option<u64>,
}

#[async_trait]
pub trait Net: Send + Sync {
    /// Get all bytes from a URL
    async fn get_bytes(&self, url: Url, headers: Option<Headers>) -> Result<Bytes, NetError>;

    /// Post a body to a URL and collect the response bytes
    async fn post_bytes(
        &self,
        url: Url,
        body: Bytes,
        headers: Option<Headers>,
    ) -> Result<Bytes, NetError>;

    /// Stream bytes from a URL
    async fn stream(&self, url: Url, headers: Option<Headers>) -> Result<StreamingBody, NetError>;
}

pub trait NetExt: Net + Sized {
    /// Add a bearer-token layer that refreshes once on 401
    fn with_auth<T: TokenSource>(self, tokens: T) -> AuthClient<Self, T> {
        AuthClient::new(self, tokens)
    }
}

impl<T: Net> NetExt for T {}
