//! Helpers shared by infra integration tests.

#![allow(dead_code)]

use authdesk_domain::CatcherConfig;

/// Catcher config on a loopback port that was free a moment ago.
pub fn free_catcher_config() -> CatcherConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    CatcherConfig { host: "127.0.0.1".into(), port, ..CatcherConfig::default() }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
