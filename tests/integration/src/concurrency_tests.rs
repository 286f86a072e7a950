//! Concurrency Tests - Blocking Calls From Async Code
//!
//! Native calls block. These tests run many fetches through `run_blocking`
//! at once, sharing one `BufferProtocol` and its counters, and check that
//! timeouts surface as `Aborted` without poisoning later calls.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;

use common::*;
use native_call::{
    codes, operation, run_blocking, ErrorKind, Fill, MarshalError, Sizing, StatusCode,
};
use native_layout::{LayoutOptions, RawBuffer, StructCodec, TextMode};

/// Test: Many concurrent enumerations share one protocol
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enumerations() {
    init_logging();

    const TASKS: usize = 32;

    let protocol = test_protocol();
    let stats = Arc::new(ConcurrentStats::new());

    let mut handles = Vec::new();
    for task in 0..TASKS {
        let protocol = protocol.clone();
        let stats = stats.clone();
        handles.push(tokio::spawn(async move {
            let population = 100 + task * 37;
            let start = Instant::now();
            let result = run_blocking("EnumProcesses", Duration::from_secs(10), move || {
                let mock = MockEnumeration::new(population);
                let codec = StructCodec::<u32>::new(&LayoutOptions::native())?;
                let ids = protocol.query_then_fetch(
                    &mut mock.operation(),
                    Sizing::Grow {
                        initial: 64,
                        increment: 64,
                    },
                    &codec,
                )?;
                Ok(ids.len() == population && ids == mock.ids())
            })
            .await;

            match result {
                Ok(true) => stats.record_success(start.elapsed()),
                _ => stats.record_failure(),
            }
        }));
    }
    join_all(handles).await;

    let snapshot = protocol.stats().snapshot();
    println!("\n=== Concurrent Enumerations ===");
    println!("Successful: {}", stats.success_count());
    println!("Failed: {}", stats.failure_count());
    println!("Avg latency: {:?}", stats.avg_latency());
    println!("Max latency: {:?}", stats.max_latency());
    println!("Protocol stats: {:?}", snapshot);

    assert_eq!(stats.success_count(), TASKS as u64);
    assert_eq!(snapshot.failures, 0);
    assert_eq!(snapshot.calls, snapshot.growths + TASKS as u64);
}

/// Test: Concurrent probed text fetches from one store
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_text_fetches() {
    init_logging();

    let registry = Arc::new(MockRegistry::new());
    for i in 0..16 {
        registry.set(&format!("Value{}", i), &"x".repeat(i * 50));
    }

    let protocol = test_protocol();
    let tasks = (0..16).map(|i| {
        let registry = registry.clone();
        let protocol = protocol.clone();
        run_blocking("RegQueryValueExW", Duration::from_secs(10), move || {
            let name = format!("Value{}", i);
            let mut query = registry.query(&name);
            protocol.fetch_text(&mut query, Sizing::Probe, TextMode::Wide)
        })
    });

    let values = join_all(tasks).await;
    for (i, value) in values.into_iter().enumerate() {
        assert_eq!(value.unwrap().len(), i * 50);
    }
}

/// Test: A hung call times out as Aborted and later calls still work
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_then_recovery() {
    init_logging();

    let protocol = test_protocol();

    let slow = protocol.clone();
    let err = run_blocking("WaitForSingleObject", Duration::from_millis(50), move || {
        let mut op = operation("WaitForSingleObject", |buf: &mut RawBuffer| {
            std::thread::sleep(Duration::from_millis(400));
            Fill::ok(buf.len())
        });
        slow.fetch_with(&mut op, Sizing::Guess(4), 1, |valid| Ok(valid.len()))
    })
    .await
    .unwrap_err();

    assert_eq!(err.native_kind(), Some(ErrorKind::Aborted));
    match &err {
        MarshalError::Native(native) => {
            assert_eq!(native.status(), StatusCode::win32(codes::ERROR_TIMEOUT));
            assert_eq!(native.operation(), "WaitForSingleObject");
        }
        other => panic!("unexpected error: {}", other),
    }

    let fast = protocol.clone();
    let len = run_blocking("GetTickCount", Duration::from_secs(5), move || {
        let mut op = operation("GetTickCount", |buf: &mut RawBuffer| Fill::ok(buf.len()));
        fast.fetch_with(&mut op, Sizing::Guess(8), 1, |valid| Ok(valid.len()))
    })
    .await
    .unwrap();
    assert_eq!(len, 8);
}

/// Test: Failures inside the blocking pool keep their classification
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failure_classification_across_threads() {
    init_logging();

    let protocol = test_protocol();
    let err = run_blocking("OpenSCManagerW", Duration::from_secs(5), move || {
        let mut op = operation("OpenSCManagerW", |_: &mut RawBuffer| {
            Fill::failed(StatusCode::win32(codes::ERROR_ACCESS_DENIED))
        });
        protocol.fetch_with(&mut op, Sizing::Probe, 1, |valid| Ok(valid.to_vec()))
    })
    .await
    .unwrap_err();

    assert_eq!(err.native_kind(), Some(ErrorKind::AccessDenied));
}
