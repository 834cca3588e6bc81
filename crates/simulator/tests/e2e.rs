//! End-to-end runs of the simulated network.

use smesher_simulator::{SimulationRunner, SimulatorConfig};
use smesher_storage::{LocalStore, MemoryLocalStore, RocksLocalStore};
use smesher_types::{AtxId, EpochId};
use std::sync::Arc;
use std::time::Duration;
use tracing_test::traced_test;

/// Four full cycles with the default timing: ATXs go out at 130s, 230s,
/// 330s and 430s.
const FOUR_CYCLES: Duration = Duration::from_secs(450);

fn memory_store() -> Arc<dyn LocalStore> {
    Arc::new(MemoryLocalStore::new())
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_every_identity_publishes_a_linked_chain() {
    let config = SimulatorConfig::default().with_identities(3);
    let runner = SimulationRunner::new(config, memory_store()).await.unwrap();

    let report = runner.run_for(FOUR_CYCLES).await.unwrap();

    assert_eq!(report.final_epoch, EpochId(4));
    assert_eq!(report.identities.len(), 3);
    for identity in &report.identities {
        let sequences: Vec<u64> = identity.atxs.iter().map(|a| a.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3], "identity {}", identity.node);
        assert_eq!(identity.atxs[0].prev_atx_id, AtxId::EMPTY);
        for pair in identity.atxs.windows(2) {
            assert_eq!(pair[1].prev_atx_id, pair[0].id);
            assert_eq!(pair[1].publish_epoch, pair[0].publish_epoch.next());
        }
    }
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_lossy_network_still_publishes() {
    let config = SimulatorConfig::default()
        .with_identities(2)
        .with_publish_loss_rate(0.5)
        .with_seed(7);
    let runner = SimulationRunner::new(config, memory_store()).await.unwrap();

    let report = runner.run_for(FOUR_CYCLES).await.unwrap();

    assert_eq!(report.total_atxs(), 8);
    assert!(report.broadcast_attempts >= 8);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_regossip_rebroadcasts_current_atx() {
    let config = SimulatorConfig::default()
        .with_identities(1)
        .with_regossip_interval(Duration::from_secs(30));
    let runner = SimulationRunner::new(config, memory_store()).await.unwrap();

    let report = runner.run_for(FOUR_CYCLES).await.unwrap();

    assert_eq!(report.total_atxs(), 4);
    assert!(report.broadcast_attempts > report.total_atxs());
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_runs_on_rocksdb_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(RocksLocalStore::open(dir.path()).unwrap());
    let runner = SimulationRunner::new(SimulatorConfig::default(), store.clone())
        .await
        .unwrap();

    let report = runner.run_for(Duration::from_secs(250)).await.unwrap();
    assert_eq!(report.total_atxs(), 4);

    // Both identities created their initial post and keep it.
    for node in runner.nodes() {
        assert!(store.initial_post(node).unwrap().is_some());
    }
}
