// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Listener binding tests

use freqle_api::api::bind_listener;

#[tokio::test]
async fn test_bind_resolves_localhost() {
    let listener = bind_listener("localhost", 0).await.unwrap();
    let addr = listener.local_addr().unwrap();

    assert!(addr.ip().is_loopback(), "bound to {}", addr);
    assert_ne!(addr.port(), 0);
}

#[tokio::test]
async fn test_bind_ip_literal() {
    let listener = bind_listener("127.0.0.1", 0).await.unwrap();
    assert_eq!(listener.local_addr().unwrap().ip().to_string(), "127.0.0.1");
}

#[tokio::test]
async fn test_bind_invalid_host_reported() {
    let error = bind_listener("not a host", 0).await.unwrap_err();
    assert!(error.to_string().contains("Failed to bind not a host:0"), "{}", error);
}
