//! Throughput benchmarks for the tool-output manager's serialized log.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use tokio::runtime::Runtime;

use convocache::ToolOutputManager;

fn bench_add_tool_output(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("add_tool_output_serial_100", |b| {
        b.to_async(&rt).iter(|| async {
            let manager = ToolOutputManager::new();
            manager.start_session().await;
            for i in 0..100 {
                manager
                    .add_tool_output(format!("call-{i}"), json!({"i": i}))
                    .await;
            }
        });
    });

    c.bench_function("add_tool_output_contended_100", |b| {
        b.to_async(&rt).iter(|| async {
            let manager = Arc::new(ToolOutputManager::new());
            manager.start_session().await;
            let tasks: Vec<_> = (0..100)
                .map(|i| {
                    let manager = Arc::clone(&manager);
                    tokio::spawn(async move {
                        manager
                            .add_tool_output(format!("call-{i}"), json!({"i": i}))
                            .await;
                    })
                })
                .collect();
            for task in tasks {
                let _ = task.await;
            }
        });
    });
}

fn bench_session_queries(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("last_from_current_session_1000_history", |b| {
        let manager = rt.block_on(async {
            let manager = ToolOutputManager::new();
            for i in 0..1000 {
                manager.start_session().await;
                manager
                    .add_tool_output(format!("call-{i}"), json!({"i": i}))
                    .await;
            }
            manager.start_session().await;
            manager
        });
        b.to_async(&rt).iter(|| async {
            // Worst case: current session has no outputs, full backward scan.
            manager.last_tool_output_from_current_session().await
        });
    });
}

criterion_group!(benches, bench_add_tool_output, bench_session_queries);
criterion_main!(benches);
