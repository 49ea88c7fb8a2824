// promwrite - bitdrift's prometheus remote write utility
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use clap::Parser;
use promwrite_cli::{Options, normalize_args, run};
use promwrite_common::global_initialize;

#[tokio::main(flavor = "current_thread")]
async fn main() {
  global_initialize();
  let options = Options::parse_from(normalize_args(std::env::args()));

  if let Err(e) = run(options).await {
    log::error!("{e:#}");
    std::process::exit(1);
  }
}
