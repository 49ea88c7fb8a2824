// promwrite - bitdrift's prometheus remote write utility
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

pub mod prom;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use time::Duration;

// Plain http endpoints are allowed alongside https. There is no connect timeout unless one is
// given.
#[must_use]
pub fn make_tls_connector(connect_timeout: Option<Duration>) -> HttpsConnector<HttpConnector> {
  let mut connector = HttpConnector::new();
  connector.set_connect_timeout(connect_timeout.map(Duration::unsigned_abs));
  connector.enforce_http(false);

  HttpsConnectorBuilder::new()
    .with_webpki_roots()
    .https_or_http()
    .enable_http1()
    .wrap_connector(connector)
}
