// promwrite - bitdrift's prometheus remote write utility
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
mod test;

use anyhow::Context;
use clap::Parser;
use promwrite_metrics::clients::prom::HyperPromRemoteWriteClient;
use promwrite_metrics::push::{SampleRequest, push_sample};
use std::time::SystemTime;
use time::ext::NumericalDuration;

pub const DEFAULT_METRIC: &str = "example_metric";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:9090/api/v1/write";

// Long flags that are also accepted with a single leading dash (e.g. `-metric foo`).
const SINGLE_DASH_FLAGS: &[&str] = &["metric", "value", "url", "label", "timeout-ms", "help"];

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Write a single sample to a Prometheus remote write endpoint")]
pub struct Options {
  /// Metric name to write.
  #[arg(long, default_value = DEFAULT_METRIC, allow_hyphen_values = true)]
  pub metric: String,

  /// Metric value to write.
  #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
  pub value: f64,

  /// Prometheus remote write endpoint to write to.
  #[arg(long, default_value = DEFAULT_ENDPOINT, allow_hyphen_values = true)]
  pub url: String,

  /// Metric labels in the format <name>=<value>. Can be repeated.
  #[arg(long, allow_hyphen_values = true)]
  pub label: Vec<String>,

  /// Request timeout in milliseconds. If unset, waits for the endpoint indefinitely.
  #[arg(long)]
  pub timeout_ms: Option<u32>,
}

impl Options {
  #[must_use]
  pub fn sample_request(&self) -> SampleRequest {
    SampleRequest {
      metric_name: self.metric.clone(),
      value: self.value,
      labels: self.label.clone(),
    }
  }
}

// Rewrites `-flag` and `-flag=value` into their `--` forms. The token following a flag that takes a
// value is that flag's value and is never rewritten, so `-metric -label` names a metric "-label".
// Anything after a bare `--` is left alone, as are unknown flags and negative numbers.
pub fn normalize_args<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
  let mut past_terminator = false;
  let mut expects_value = false;
  args
    .into_iter()
    .enumerate()
    .map(|(i, arg)| {
      if i == 0 || past_terminator {
        return arg;
      }
      if expects_value {
        expects_value = false;
        return arg;
      }
      if arg == "--" {
        past_terminator = true;
        return arg;
      }

      let Some(flag) = arg.strip_prefix('-') else {
        return arg;
      };
      let double_dash = flag.starts_with('-');
      let flag = flag.strip_prefix('-').unwrap_or(flag);
      let (name, inline_value) = match flag.split_once('=') {
        Some((name, _)) => (name, true),
        None => (flag, false),
      };
      if !SINGLE_DASH_FLAGS.contains(&name) {
        return arg;
      }

      expects_value = !inline_value && name != "help";
      if double_dash { arg } else { format!("-{arg}") }
    })
    .collect()
}

pub async fn run(options: Options) -> anyhow::Result<()> {
  let request = options.sample_request();
  let client = HyperPromRemoteWriteClient::new(
    options.url.clone(),
    options.timeout_ms.map(|ms| i64::from(ms).milliseconds()),
  )
  .with_context(|| format!("can't create remote write client for {}", options.url))?;

  log::debug!("writing {request:?} to {}", options.url);
  push_sample(&client, &request, SystemTime::now())
    .await
    .with_context(|| format!("failed to write metric {}", request.metric_name))?;

  log::info!("wrote metric: {}={}", request.metric_name, request.value);
  Ok(())
}
