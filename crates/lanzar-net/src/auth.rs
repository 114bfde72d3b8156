use async_trait::async_trait;
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::{
    error::{NetError, NetResult},
    traits::Net,
    types::Headers,
};

/// Source of bearer tokens for [`AuthClient`].
///
/// Implementations own token storage and the refresh flow.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Currently cached access token, if any.
    async fn access_token(&self) -> Option<String>;

    /// Obtain a fresh token, replacing any cached one.
    async fn refresh(&self) -> NetResult<String>;
}

enum AuthRequest<'a> {
    Get(&'a Url),
    Post(&'a Url, &'a Bytes),
}

impl AuthRequest<'_> {
    fn url(&self) -> &Url {
        match self {
            Self::Get(url) | Self::Post(url, _) => url,
        }
    }
}

/// Bearer-token layer over any [`Net`] transport.
///
/// Every request carries `Authorization: Bearer <token>`. On a 401 the
/// token is refreshed and the request replayed exactly once; a second
/// 401 propagates to the caller.
pub struct AuthClient<N, T> {
    net: N,
    tokens: T,
}

impl<N: Net, T: TokenSource> AuthClient<N, T> {
    pub fn new(net: N, tokens: T) -> Self {
        Self { net, tokens }
    }

    /// GET a JSON document from an endpoint that requires auth.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Json`] when the body does not decode into `D`,
    /// otherwise the transport error.
    pub async fn get_json<D: DeserializeOwned>(&self, url: Url) -> NetResult<D> {
        let bytes = self.execute(AuthRequest::Get(&url)).await?;
        serde_json::from_slice(&bytes).map_err(|e| NetError::json(&url, e))
    }

    /// POST a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Json`] when either body fails to encode or
    /// decode, otherwise the transport error.
    pub async fn post_json<B, D>(&self, url: Url, body: &B) -> NetResult<D>
    where
        B: Serialize,
        D: DeserializeOwned,
    {
        let payload = Bytes::from(serde_json::to_vec(body).map_err(|e| NetError::json(&url, e))?);
        let bytes = self.execute(AuthRequest::Post(&url, &payload)).await?;
        serde_json::from_slice(&bytes).map_err(|e| NetError::json(&url, e))
    }

    async fn token(&self) -> NetResult<String> {
        match self.tokens.access_token().await {
            Some(token) => Ok(token),
            None => self.tokens.refresh().await,
        }
    }

    async fn execute(&self, req: AuthRequest<'_>) -> NetResult<Bytes> {
        let token = self.token().await?;
        match self.send(&req, &token).await {
            Err(e) if e.status_code() == Some(401) => {
                debug!(url = %req.url(), "authorized request rejected, refreshing token");
                let token = self.tokens.refresh().await?;
                self.send(&req, &token).await
            }
            other => other,
        }
    }

    async fn send(&self, req: &AuthRequest<'_>, token: &str) -> NetResult<Bytes> {
        match req {
            AuthRequest::Get(url) => {
                self.net
                    .get_bytes((*url).clone(), Some(Headers::bearer(token)))
                    .await
            }
            AuthRequest::Post(url, body) => {
                let mut headers = Headers::bearer(token);
                headers.insert("Content-Type", "application/json");
                self.net
                    .post_bytes((*url).clone(), (*body).clone(), Some(headers))
                    .await
            }
        }
    }
}
