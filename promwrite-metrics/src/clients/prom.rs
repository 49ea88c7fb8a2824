// promwrite - bitdrift's prometheus remote write utility
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./prom_test.rs"]
mod prom_test;

use super::make_tls_connector;
use async_trait::async_trait;
use bd_proto::protos::prometheus::prompb::remote::WriteRequest;
use bd_time::TimeDurationExt;
use bytes::Bytes;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use promwrite_common::proto::{
  CONTENT_ENCODING_SNAPPY,
  CONTENT_TYPE_PROTOBUF,
  REMOTE_WRITE_VERSION,
  REMOTE_WRITE_VERSION_HEADER,
};
use protobuf::Message;
use time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum PromRemoteWriteError {
  #[error("invalid endpoint '{0}': {1}")]
  InvalidEndpoint(String, String),
  #[error("request error: {0}")]
  Request(#[from] http::Error),
  #[error("hyper client error: {0}")]
  HyperClient(#[from] hyper_util::client::legacy::Error),
  #[error("response body error: {0}")]
  ResponseBody(#[from] hyper::Error),
  #[error("response error: {0}: {1}")]
  Response(StatusCode, String),
  #[error("request timeout")]
  Timeout,
}

pub type Result<T> = std::result::Result<T, PromRemoteWriteError>;

#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
  #[error("cannot serialize WriteRequest: {0}")]
  Serialize(protobuf::Error),
  #[error("cannot deserialize WriteRequest: {0}")]
  Deserialize(protobuf::Error),
  #[error("cannot compress WriteRequest: {0}")]
  Compress(snap::Error),
  #[error("cannot decompress WriteRequest: {0}")]
  Decompress(snap::Error),
}

/// A thin client wrapper used for mocking in tests
#[mockall::automock]
#[async_trait]
pub trait PromRemoteWriteClient: Send + Sync {
  /// Sends an already compressed write request. Only a 204 response is considered a success.
  async fn send_write_request(&self, compressed_write_request: Bytes) -> Result<()>;
}

//
// HyperPromRemoteWriteClient
//

pub struct HyperPromRemoteWriteClient {
  inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
  endpoint: Uri,
  timeout: Option<Duration>,
}

impl HyperPromRemoteWriteClient {
  // A `timeout` of `None` waits for the endpoint indefinitely.
  pub fn new(endpoint: String, timeout: Option<Duration>) -> Result<Self> {
    let uri: Uri = endpoint
      .parse()
      .map_err(|e: http::uri::InvalidUri| {
        PromRemoteWriteError::InvalidEndpoint(endpoint.clone(), e.to_string())
      })?;
    if !matches!(uri.scheme_str(), Some("http" | "https")) || uri.authority().is_none() {
      return Err(PromRemoteWriteError::InvalidEndpoint(
        endpoint,
        "expected an absolute http or https URL".to_string(),
      ));
    }

    Ok(Self {
      inner: Client::builder(TokioExecutor::new()).build(make_tls_connector(timeout)),
      endpoint: uri,
      timeout,
    })
  }

  // Performs the request and always drains the response body so the connection is released
  // regardless of status.
  async fn exchange(&self, request: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes)> {
    let response = self.inner.request(request).await?;
    let (parts, body) = response.into_parts();
    let body = body.collect().await?.to_bytes();
    log::debug!(
      "remote write response from {}: {} ({} bytes)",
      self.endpoint,
      parts.status,
      body.len()
    );
    Ok((parts.status, body))
  }
}

#[async_trait]
impl PromRemoteWriteClient for HyperPromRemoteWriteClient {
  async fn send_write_request(&self, compressed_write_request: Bytes) -> Result<()> {
    let request = Request::builder()
      .method(Method::POST)
      .uri(self.endpoint.clone())
      .header(CONTENT_TYPE, CONTENT_TYPE_PROTOBUF)
      .header(CONTENT_ENCODING, CONTENT_ENCODING_SNAPPY)
      .header(REMOTE_WRITE_VERSION_HEADER, REMOTE_WRITE_VERSION)
      .body(Full::new(compressed_write_request))?;

    let exchange = self.exchange(request);
    let (status, body) = match self.timeout {
      Some(timeout) => timeout
        .timeout(exchange)
        .await
        .map_err(|_| PromRemoteWriteError::Timeout)??,
      None => exchange.await?,
    };

    if status == StatusCode::NO_CONTENT {
      return Ok(());
    }
    Err(PromRemoteWriteError::Response(
      status,
      String::from_utf8_lossy(&body).into_owned(),
    ))
  }
}

//
// Wire encoding
//

pub fn compress_write_request(
  write_request: &WriteRequest,
) -> std::result::Result<Vec<u8>, EncodeError> {
  let proto_encoded = write_request
    .write_to_bytes()
    .map_err(EncodeError::Serialize)?;
  let proto_compressed = snap::raw::Encoder::new()
    .compress_vec(&proto_encoded)
    .map_err(EncodeError::Compress)?;
  log::debug!(
    "compressed WriteRequest {} bytes to {} bytes",
    proto_encoded.len(),
    proto_compressed.len()
  );
  Ok(proto_compressed)
}

pub fn decompress_write_request(
  compressed_write_request: &[u8],
) -> std::result::Result<WriteRequest, EncodeError> {
  let decompressed = snap::raw::Decoder::new()
    .decompress_vec(compressed_write_request)
    .map_err(EncodeError::Decompress)?;
  log::debug!(
    "decompressed WriteRequest from {} bytes to {} bytes",
    compressed_write_request.len(),
    decompressed.len()
  );
  WriteRequest::parse_from_bytes(&decompressed).map_err(EncodeError::Deserialize)
}
