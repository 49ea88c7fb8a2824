// promwrite - bitdrift's prometheus remote write utility
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

pub mod proto;

use bd_log::SwapLogger;

pub fn global_initialize() {
  SwapLogger::initialize();

  // Both the binary and test harnesses call this, so a provider may already be installed.
  if rustls::crypto::aws_lc_rs::default_provider()
    .install_default()
    .is_err()
  {
    log::debug!("rustls crypto provider already installed");
  }
}
