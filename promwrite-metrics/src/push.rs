// promwrite - bitdrift's prometheus remote write utility
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./push_test.rs"]
mod push_test;

use crate::clients::prom::{
  EncodeError,
  PromRemoteWriteClient,
  PromRemoteWriteError,
  compress_write_request,
};
use crate::protos::prom::{BuildError, make_write_request};
use std::time::SystemTime;

#[derive(thiserror::Error, Debug)]
pub enum PushError {
  #[error(transparent)]
  Build(#[from] BuildError),
  #[error(transparent)]
  Encode(#[from] EncodeError),
  #[error(transparent)]
  Send(#[from] PromRemoteWriteError),
}

// A single sample to write. Labels are raw `<name>=<value>` strings.
#[derive(Debug, Clone, Default)]
pub struct SampleRequest {
  pub metric_name: String,
  pub value: f64,
  pub labels: Vec<String>,
}

// Builds, encodes and sends a single sample. Malformed labels are rejected before the client is
// used.
pub async fn push_sample(
  client: &dyn PromRemoteWriteClient,
  request: &SampleRequest,
  now: SystemTime,
) -> Result<(), PushError> {
  let write_request = make_write_request(&request.metric_name, request.value, now, &request.labels)?;
  let compressed = compress_write_request(&write_request)?;
  client.send_write_request(compressed.into()).await?;
  Ok(())
}
