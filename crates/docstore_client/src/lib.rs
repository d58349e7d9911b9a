//! # Docstore Client
//!
//! [`Datastore`](docstore_core::Datastore) implementation over the hosted
//! document store's v1 REST API.
//!
//! ## Connecting
//!
//! [`ClientConfig::from_env`] picks the target:
//!
//! - `DATASTORE_EMULATOR_HOST=host:port` talks plain HTTP to an emulator
//!   and sends no credentials
//! - otherwise `DATASTORE_HOST` (default `https://datastore.googleapis.com`)
//!   is used with the bearer token in `DATASTORE_ACCESS_TOKEN`
//!
//! ## Transport
//!
//! Requests go through the [`HttpClient`] trait. [`UreqClient`] is the
//! blocking production implementation; tests substitute a fake.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod datastore;
mod error;
mod http;
mod wire;

pub use config::{
    ClientConfig, ACCESS_TOKEN_ENV, DEFAULT_ENDPOINT, EMULATOR_HOST_ENV, HOST_ENV,
};
pub use datastore::RestDatastore;
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, HttpResponse, UreqClient};
