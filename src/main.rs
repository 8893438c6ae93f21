//! Two-replica sync demo.
//!
//! Replica A and replica B each own a document behind their own bridge, on a
//! shared in-memory host. A burst of edits on A coalesces into a single host
//! update; B's edit flows back the same way.

use dsb_bridge::dispatch::RateLimited;
use dsb_bridge::{BridgeConfigBuilder, MemoryHost, UpdateBridge};
use dsb_core::SetDocument;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("tokio runtime");
    rt.block_on(demo());
}

async fn demo() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Larimar two-replica sync demo ===\n");

    let host = MemoryHost::new();

    let doc_a = Arc::new(RwLock::new(SetDocument::new()));
    let bridge_a = UpdateBridge::initialize(
        doc_a.clone(),
        Arc::new(host.endpoint()),
        BridgeConfigBuilder::new()
            .dispatch(RateLimited::new(Duration::from_millis(300)))
            .update_descr("Replica A edit")
            .build(),
    );
    bridge_a.restored().wait().await;

    let doc_b = Arc::new(RwLock::new(SetDocument::new()));
    let bridge_b = UpdateBridge::initialize(
        doc_b.clone(),
        Arc::new(host.endpoint()),
        BridgeConfigBuilder::new()
            .dispatch(RateLimited::new(Duration::from_millis(300)))
            .update_descr("Replica B edit")
            .build(),
    );
    bridge_b.restored().wait().await;

    // A burst of edits on A: one coalesced host update.
    for item in ["apples", "bread", "coffee"] {
        doc_a.write().insert(item).expect("insert");
    }
    tokio::time::sleep(Duration::from_millis(400)).await;

    println!("replica B sees:  {:?}", doc_b.read().entries());
    println!("host log holds:  {} update(s)", host.stored());

    // An edit on B flows back to A.
    doc_b.write().insert("tea").expect("insert");
    tokio::time::sleep(Duration::from_millis(400)).await;

    println!("replica A sees:  {:?}", doc_a.read().entries());
    println!("host log holds:  {} update(s)", host.stored());

    // Teardown: flush anything still pending before cancelling timers.
    bridge_a.flush_now().await.expect("final flush");
    bridge_b.flush_now().await.expect("final flush");
    bridge_a.shutdown();
    bridge_b.shutdown();

    let converged = doc_a.read().entries() == doc_b.read().entries();
    println!("\nconverged: {}", converged);
}
