// promwrite - bitdrift's prometheus remote write utility
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./prom_test.rs"]
mod prom_test;

use bd_proto::protos::prometheus::prompb;
use prompb::remote::WriteRequest;
use prompb::types::{Label, Sample, TimeSeries};
use protobuf::Chars;
use std::time::{SystemTime, UNIX_EPOCH};

pub const METRIC_NAME_LABEL: &str = "__name__";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LabelError {
  #[error("malformed label '{0}': must be in the format of <name>=<value>")]
  MissingDelimiter(String),
  #[error("malformed label '{0}': value must not contain '='")]
  ExtraDelimiter(String),
  #[error("malformed label '{0}': name must not be empty")]
  EmptyName(String),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BuildError {
  #[error(transparent)]
  Label(#[from] LabelError),
  #[error("invalid timestamp: {0:?} is before the unix epoch")]
  InvalidTimestamp(SystemTime),
}

pub type Result<T> = std::result::Result<T, BuildError>;

//
// LabelPair
//

// A validated name/value pair parsed from a `<name>=<value>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPair {
  pub name: String,
  pub value: String,
}

impl LabelPair {
  #[must_use]
  pub fn into_label(self) -> Label {
    make_label(self.name.into(), self.value.into())
  }
}

// Parse a single `<name>=<value>` label. The value may be empty, the name may not. Exactly one '='
// is allowed.
pub fn parse_label(raw: &str) -> std::result::Result<LabelPair, LabelError> {
  let Some((name, value)) = raw.split_once('=') else {
    return Err(LabelError::MissingDelimiter(raw.to_string()));
  };
  if value.contains('=') {
    return Err(LabelError::ExtraDelimiter(raw.to_string()));
  }
  if name.is_empty() {
    return Err(LabelError::EmptyName(raw.to_string()));
  }

  Ok(LabelPair {
    name: name.to_string(),
    value: value.to_string(),
  })
}

#[must_use]
pub fn make_label(name: Chars, value: Chars) -> Label {
  Label {
    name,
    value,
    ..Default::default()
  }
}

// Creates a single sample timeseries. The name label always comes first, followed by `labels` in
// the order given. Labels are not sorted or deduplicated.
#[must_use]
pub fn make_timeseries(name: Chars, value: f64, timestamp: i64, labels: Vec<Label>) -> TimeSeries {
  let mut all_labels = Vec::with_capacity(labels.len() + 1);
  all_labels.push(make_label(METRIC_NAME_LABEL.into(), name));
  all_labels.extend(labels);

  TimeSeries {
    labels: all_labels,
    samples: vec![Sample {
      value,
      timestamp,
      ..Default::default()
    }],
    ..Default::default()
  }
}

// Remote write timestamps are in milliseconds. Sub-second precision is dropped so the result is
// always a whole number of seconds.
pub fn timestamp_millis(now: SystemTime) -> Result<i64> {
  let seconds = now
    .duration_since(UNIX_EPOCH)
    .map_err(|_| BuildError::InvalidTimestamp(now))?
    .as_secs();
  i64::try_from(seconds)
    .ok()
    .and_then(|seconds| seconds.checked_mul(1000))
    .ok_or(BuildError::InvalidTimestamp(now))
}

// Builds a write request holding exactly one timeseries with one sample. Labels are parsed in order
// and the first malformed label fails the whole request.
pub fn make_write_request<S: AsRef<str>>(
  metric_name: &str,
  value: f64,
  now: SystemTime,
  raw_labels: &[S],
) -> Result<WriteRequest> {
  let labels = raw_labels
    .iter()
    .map(|raw| parse_label(raw.as_ref()).map(LabelPair::into_label))
    .collect::<std::result::Result<Vec<_>, _>>()?;
  let timeseries = make_timeseries(metric_name.into(), value, timestamp_millis(now)?, labels);

  log::trace!("built timeseries: {timeseries}");
  Ok(WriteRequest {
    timeseries: vec![timeseries],
    ..Default::default()
  })
}
