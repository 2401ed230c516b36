use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use crate::api::error;
use crate::modules::card::{model::UpsertCardSet, repository::CardCatalogWriter};
use crate::modules::card_sync::{
    model::{SyncReport, to_upsert_card},
    source::CardSource,
};

/// Clears the running flag however the run ends.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CatalogSyncService<S, W>
where
    S: CardSource + Send + Sync,
    W: CardCatalogWriter + Send + Sync,
{
    source: Arc<S>,
    writer: Arc<W>,
    running: Arc<AtomicBool>,
}

impl<S, W> Clone for CatalogSyncService<S, W>
where
    S: CardSource + Send + Sync,
    W: CardCatalogWriter + Send + Sync,
{
    fn clone(&self) -> Self {
        CatalogSyncService {
            source: self.source.clone(),
            writer: self.writer.clone(),
            running: self.running.clone(),
        }
    }
}

impl<S, W> CatalogSyncService<S, W>
where
    S: CardSource + Send + Sync + 'static,
    W: CardCatalogWriter + Send + Sync + 'static,
{
    pub fn with_dependencies(source: Arc<S>, writer: Arc<W>) -> Self {
        CatalogSyncService { source, writer, running: Arc::new(AtomicBool::new(false)) }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Pulls every set and its cards from the source and upserts them.
    /// A failing set is recorded in the report and skipped.
    pub async fn run(&self) -> Result<SyncReport, error::SystemError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(error::SystemError::state_conflict("Card sync is already running"));
        }
        let _guard = RunGuard(self.running.clone());

        let mut report = SyncReport::start();
        tracing::info!("Card sync started");

        let sets = self.source.fetch_sets().await?;
        report.sets_total = sets.len();

        for set in &sets {
            if let Err(e) = self.writer.upsert_set(&UpsertCardSet::from(set)).await {
                tracing::error!("Failed to store set {}: {}", set.id, e);
                report.fail_set(&set.id, &e);
                continue;
            }

            let cards = match self.source.fetch_cards_for_set(&set.id).await {
                Ok(cards) => cards,
                Err(e) => {
                    tracing::error!("Failed to fetch cards of set {}: {}", set.id, e);
                    report.fail_set(&set.id, &e);
                    continue;
                }
            };

            for card in &cards {
                let Some(upsert) = to_upsert_card(card) else {
                    tracing::warn!("Skipping card {} with supertype {}", card.id, card.supertype);
                    report.cards_failed += 1;
                    continue;
                };

                match self.writer.upsert_card(&upsert).await {
                    Ok(true) => report.cards_inserted += 1,
                    Ok(false) => report.cards_updated += 1,
                    Err(e) => {
                        tracing::warn!("Failed to upsert card {}: {}", card.id, e);
                        report.cards_failed += 1;
                    }
                }
            }

            report.sets_synced += 1;
            tracing::debug!("Set {} synced ({} cards)", set.id, cards.len());
        }

        report.finished_at = Some(chrono::Utc::now());
        tracing::info!(
            "Card sync finished: {}/{} sets, {} inserted, {} updated, {} failed",
            report.sets_synced,
            report.sets_total,
            report.cards_inserted,
            report.cards_updated,
            report.cards_failed
        );
        Ok(report)
    }

    /// Runs the sync every `every`, first run after one interval.
    pub fn spawn_periodic(&self, every: Duration) {
        let service = self.clone();
        actix_web::rt::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            loop {
                ticker.tick().await;
                match service.run().await {
                    Ok(_) => {}
                    Err(error::SystemError::StateConflict(_)) => {
                        tracing::info!("Scheduled card sync skipped, a run is in progress");
                    }
                    Err(e) => tracing::error!("Scheduled card sync failed: {}", e),
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::card::model::UpsertCard;
    use crate::modules::card_sync::dto::{ApiCard, ApiSet};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    fn api_set(id: &str) -> ApiSet {
        serde_json::from_value(serde_json::json!({"id": id, "name": id, "series": "Test"})).unwrap()
    }

    fn api_card(set_id: &str, number: u32, supertype: &str) -> ApiCard {
        serde_json::from_value(serde_json::json!({
            "id": format!("{set_id}-{number}"),
            "name": format!("Card {number}"),
            "supertype": supertype,
            "set": {"id": set_id, "name": set_id, "series": "Test"},
            "number": number.to_string(),
        }))
        .unwrap()
    }

    struct FakeSource {
        cards: HashMap<String, Vec<ApiCard>>,
        broken_sets: HashSet<String>,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl CardSource for FakeSource {
        async fn fetch_sets(&self) -> Result<Vec<ApiSet>, error::SystemError> {
            tokio::time::sleep(self.delay).await;
            let mut ids: Vec<_> = self.cards.keys().cloned().collect();
            ids.sort();
            Ok(ids.iter().map(|id| api_set(id)).collect())
        }

        async fn fetch_cards_for_set(
            &self,
            set_id: &str,
        ) -> Result<Vec<ApiCard>, error::SystemError> {
            if self.broken_sets.contains(set_id) {
                return Err(error::SystemError::Upstream { status: 500, body: "boom".into() });
            }
            Ok(self.cards.get(set_id).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct MemoryCatalog {
        sets: Mutex<HashMap<String, UpsertCardSet>>,
        cards: Mutex<HashMap<String, UpsertCard>>,
    }

    #[async_trait::async_trait]
    impl CardCatalogWriter for MemoryCatalog {
        async fn upsert_set(&self, set: &UpsertCardSet) -> Result<(), error::SystemError> {
            self.sets.lock().unwrap().insert(set.id.clone(), set.clone());
            Ok(())
        }

        async fn upsert_card(&self, card: &UpsertCard) -> Result<bool, error::SystemError> {
            Ok(self.cards.lock().unwrap().insert(card.pokemon_tcg_id.clone(), card.clone()).is_none())
        }
    }

    fn source(broken: &[&str], delay: Duration) -> FakeSource {
        let mut cards = HashMap::new();
        cards.insert("base1".to_string(), (1..=3).map(|n| api_card("base1", n, "Pokémon")).collect());
        cards.insert("jungle".to_string(), vec![api_card("jungle", 1, "Trainer")]);
        cards.insert("fossil".to_string(), vec![api_card("fossil", 1, "Energy")]);
        FakeSource {
            cards,
            broken_sets: broken.iter().map(|s| s.to_string()).collect(),
            delay,
        }
    }

    #[actix_web::test]
    async fn test_rerun_is_idempotent() {
        let catalog = Arc::new(MemoryCatalog::default());
        let svc = CatalogSyncService::with_dependencies(
            Arc::new(source(&[], Duration::ZERO)),
            catalog.clone(),
        );

        let first = svc.run().await.unwrap();
        assert_eq!(first.sets_total, 3);
        assert_eq!(first.sets_synced, 3);
        assert_eq!(first.cards_inserted, 5);
        assert_eq!(first.cards_updated, 0);
        assert!(first.finished_at.is_some());

        let second = svc.run().await.unwrap();
        assert_eq!(second.cards_inserted, 0);
        assert_eq!(second.cards_updated, 5);
        assert_eq!(catalog.cards.lock().unwrap().len(), 5);
        assert_eq!(catalog.sets.lock().unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn test_failing_set_does_not_stop_the_run() {
        let catalog = Arc::new(MemoryCatalog::default());
        let svc = CatalogSyncService::with_dependencies(
            Arc::new(source(&["jungle"], Duration::ZERO)),
            catalog.clone(),
        );

        let report = svc.run().await.unwrap();
        assert_eq!(report.sets_synced, 2);
        assert_eq!(report.failed_sets.len(), 1);
        assert_eq!(report.failed_sets[0].set_id, "jungle");
        assert_eq!(report.cards_inserted, 4);
        assert!(!catalog.cards.lock().unwrap().contains_key("jungle-1"));
    }

    #[actix_web::test]
    async fn test_unknown_supertype_counts_as_failed_card() {
        let mut src = source(&[], Duration::ZERO);
        src.cards.insert("promo".into(), vec![api_card("promo", 1, "Token")]);
        let svc = CatalogSyncService::with_dependencies(
            Arc::new(src),
            Arc::new(MemoryCatalog::default()),
        );

        let report = svc.run().await.unwrap();
        assert_eq!(report.cards_failed, 1);
        assert_eq!(report.sets_synced, 4);
    }

    #[actix_web::test]
    async fn test_concurrent_run_is_rejected() {
        let svc = CatalogSyncService::with_dependencies(
            Arc::new(source(&[], Duration::from_millis(100))),
            Arc::new(MemoryCatalog::default()),
        );

        let second = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            svc.run().await
        };
        let (first, second) = tokio::join!(svc.run(), second);

        assert!(first.is_ok());
        assert!(matches!(second, Err(error::SystemError::StateConflict(_))));
        assert!(!svc.is_running());
        assert!(svc.run().await.is_ok());
    }
}
