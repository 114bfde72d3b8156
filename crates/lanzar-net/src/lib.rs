#![forbid(unsafe_code)]

mod auth;
mod client;
mod error;
mod traits;
mod types;

pub use crate::{
    auth::{AuthClient, TokenSource},
    client::HttpClient,
    error::{NetError, NetResult},
    traits::{ByteStream, Net, NetExt, StreamingBody},
    types::{Headers, NetOptions},
};
