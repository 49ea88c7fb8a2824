// promwrite - bitdrift's prometheus remote write utility
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use crate::{DEFAULT_ENDPOINT, DEFAULT_METRIC, Options, normalize_args, run};
use clap::Parser;
use http::StatusCode;
use pretty_assertions::assert_eq;
use promwrite_metrics::test::{FakeRemoteWriteEndpoint, unused_port};

#[ctor::ctor]
fn global_init() {
  promwrite_common::global_initialize();
}

fn args(args: &[&str]) -> Vec<String> {
  std::iter::once("promwrite")
    .chain(args.iter().copied())
    .map(ToString::to_string)
    .collect()
}

fn parse(raw: &[&str]) -> Options {
  Options::try_parse_from(normalize_args(args(raw))).unwrap()
}

#[test]
fn defaults() {
  let options = parse(&[]);
  assert_eq!(DEFAULT_METRIC, options.metric);
  assert_eq!(0.0, options.value);
  assert_eq!(DEFAULT_ENDPOINT, options.url);
  assert!(options.label.is_empty());
  assert_eq!(None, options.timeout_ms);
}

#[test]
fn single_dash_flags() {
  assert_eq!(
    args(&[
      "--metric",
      "cpu_usage",
      "--value=42.5",
      "--label",
      "host=server1",
      "--",
      "-label",
    ]),
    normalize_args(args(&[
      "-metric",
      "cpu_usage",
      "-value=42.5",
      "--label",
      "host=server1",
      "--",
      "-label",
    ]))
  );

  // Unknown flags and negative values pass through untouched.
  assert_eq!(
    args(&["-x", "--value", "-3"]),
    normalize_args(args(&["-x", "-value", "-3"]))
  );
}

#[test]
fn labels_accumulate_in_order() {
  let options = parse(&[
    "-metric",
    "cpu_usage",
    "-value",
    "42.5",
    "-label",
    "host=server1",
    "--label",
    "env=prod",
    "-url=http://127.0.0.1:9009/api/v1/push",
    "-timeout-ms",
    "250",
  ]);
  assert_eq!("cpu_usage", options.metric);
  assert_eq!(42.5, options.value);
  assert_eq!(vec!["host=server1", "env=prod"], options.label);
  assert_eq!("http://127.0.0.1:9009/api/v1/push", options.url);
  assert_eq!(Some(250), options.timeout_ms);

  let request = options.sample_request();
  assert_eq!("cpu_usage", request.metric_name);
  assert_eq!(42.5, request.value);
  assert_eq!(options.label, request.labels);
}

#[test]
fn flag_values_are_not_rewritten() {
  assert_eq!(
    args(&["--metric", "-label", "--label", "-url", "--url", "-x"]),
    normalize_args(args(&["-metric", "-label", "-label", "-url", "-url", "-x"]))
  );

  let options = parse(&["-metric", "-label", "-label", "-url=x", "-value", "-2"]);
  assert_eq!("-label", options.metric);
  assert_eq!(vec!["-url=x"], options.label);
  assert_eq!(-2.0, options.value);
  assert_eq!(DEFAULT_ENDPOINT, options.url);
}

#[test]
fn negative_value() {
  assert_eq!(-1.5, parse(&["-value", "-1.5"]).value);
}

#[test]
fn invalid_value() {
  assert!(Options::try_parse_from(normalize_args(args(&["-value", "abc"]))).is_err());
}

#[tokio::test]
async fn run_success() {
  let mut endpoint = FakeRemoteWriteEndpoint::start(StatusCode::NO_CONTENT, None).await;
  let url = endpoint.endpoint();
  run(parse(&[
    "-metric",
    "cpu_usage",
    "-value",
    "42.5",
    "-label",
    "host=server1",
    "-label",
    "env=prod",
    "-url",
    &url,
  ]))
  .await
  .unwrap();

  let (_, write_request) = endpoint.wait_for_request().await;
  let timeseries = &write_request.timeseries[0];
  assert_eq!(
    vec![
      ("__name__", "cpu_usage"),
      ("host", "server1"),
      ("env", "prod"),
    ],
    timeseries
      .labels
      .iter()
      .map(|label| (&*label.name, &*label.value))
      .collect::<Vec<_>>()
  );
  assert_eq!(42.5, timeseries.samples[0].value);
  assert_eq!(0, timeseries.samples[0].timestamp % 1000);
}

#[tokio::test]
async fn run_unexpected_status() {
  let mut endpoint =
    FakeRemoteWriteEndpoint::start(StatusCode::BAD_REQUEST, Some("bad sample".to_string())).await;
  let url = endpoint.endpoint();
  let error = run(parse(&["-url", &url])).await.unwrap_err();
  assert_eq!(
    "failed to write metric example_metric: response error: 400 Bad Request: bad sample",
    format!("{error:#}")
  );
  endpoint.wait_for_request().await;
}

#[tokio::test]
async fn run_malformed_label() {
  let mut endpoint = FakeRemoteWriteEndpoint::start(StatusCode::NO_CONTENT, None).await;
  let url = endpoint.endpoint();
  let error = run(parse(&["-label", "foo", "-url", &url]))
    .await
    .unwrap_err();
  assert_eq!(
    "failed to write metric example_metric: malformed label 'foo': must be in the format of \
     <name>=<value>",
    format!("{error:#}")
  );
  assert!(endpoint.no_requests());
}

#[tokio::test]
async fn run_invalid_url() {
  let error = run(parse(&["-url", "not a url"])).await.unwrap_err();
  assert!(
    format!("{error:#}").starts_with("can't create remote write client for not a url"),
    "{error:#}"
  );
}

#[tokio::test]
async fn run_connection_refused() {
  let port = unused_port().await;
  let url = format!("http://127.0.0.1:{port}/api/v1/write");
  assert!(run(parse(&["-url", &url])).await.is_err());
}
