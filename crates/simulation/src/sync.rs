use async_trait::async_trait;
use smesher_core::AtxSyncer;
use tokio::sync::watch;

/// [`AtxSyncer`] toggled by the test or runner.
pub struct SimSyncer {
    synced: watch::Sender<bool>,
}

impl SimSyncer {
    pub fn new(synced: bool) -> Self {
        let (synced, _) = watch::channel(synced);
        Self { synced }
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.send_replace(synced);
    }
}

#[async_trait]
impl AtxSyncer for SimSyncer {
    async fn wait_atx_synced(&self) {
        let mut rx = self.synced.subscribe();
        // The sender lives as long as self, so this only returns once synced.
        let _ = rx.wait_for(|synced| *synced).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_waits_until_synced() {
        let syncer = Arc::new(SimSyncer::new(false));
        let waiter = tokio::spawn({
            let syncer = syncer.clone();
            async move { syncer.wait_atx_synced().await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!waiter.is_finished());

        syncer.set_synced(true);
        waiter.await.unwrap();
        syncer.wait_atx_synced().await;
    }
}
