use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::api::SwapiClient;
use crate::db::Database;
use crate::error::LoaderError;
use crate::error::Result;
use crate::model::Person;

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Where people come from.
#[async_trait]
pub trait PeopleSource: Send + Sync {
    async fn fetch_count(&self) -> Result<i64>;

    async fn fetch_person(&self, person_id: i64) -> Result<Option<Person>>;
}

/// Where fetched windows go.
#[async_trait]
pub trait PeopleSink: Send + Sync + 'static {
    async fn persist(&self, people: Vec<Option<Person>>) -> Result<u64>;
}

#[async_trait]
impl PeopleSource for SwapiClient {
    async fn fetch_count(&self) -> Result<i64> {
        SwapiClient::fetch_count(self).await
    }

    async fn fetch_person(&self, person_id: i64) -> Result<Option<Person>> {
        SwapiClient::fetch_person(self, person_id).await
    }
}

#[async_trait]
impl PeopleSink for Database {
    async fn persist(&self, people: Vec<Option<Person>>) -> Result<u64> {
        self.insert_people(&people).await
    }
}

/// Lazily splits `[1, count)` into consecutive windows of at most `size` IDs.
pub fn id_windows(count: i64, size: usize) -> impl Iterator<Item = Range<i64>> {
    let size = i64::try_from(size.max(1)).unwrap_or(i64::MAX);
    let mut start = 1_i64;
    std::iter::from_fn(move || {
        if start >= count {
            return None;
        }
        let end = start.saturating_add(size).min(count);
        let window = start..end;
        start = end;
        Some(window)
    })
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub count: i64,
    pub windows: usize,
    pub fetched: usize,
    pub missing: usize,
    pub persisted: u64,
}

pub struct Ingestor<S, K> {
    source: S,
    sink: Arc<K>,
    batch_size: usize,
}

impl<S, K> Ingestor<S, K>
where
    S: PeopleSource,
    K: PeopleSink,
{
    pub fn new(source: S, sink: Arc<K>, batch_size: usize) -> Self {
        Ingestor {
            source,
            sink,
            batch_size: batch_size.max(1),
        }
    }

    /// Discovers the count, then fetches and stores every window.
    pub async fn run(&self) -> Result<IngestReport> {
        let count = self.source.fetch_count().await?;
        info!(count, "people count discovered");
        self.run_windows(count).await
    }

    /// Fetches each window in ID order and hands it to a spawned persistence
    /// task. Returns only after every spawned task has finished, even when a
    /// fetch fails part way through.
    pub async fn run_windows(&self, count: i64) -> Result<IngestReport> {
        let mut report = IngestReport {
            count,
            ..Default::default()
        };
        let mut tasks: Vec<JoinHandle<Result<u64>>> = Vec::new();

        let mut fetch_result = Ok(());
        for window in id_windows(count, self.batch_size) {
            let people = match self.fetch_window(window.clone()).await {
                Ok(people) => people,
                Err(e) => {
                    error!(start = window.start, end = window.end, error = %e, "window fetch failed");
                    fetch_result = Err(e);
                    break;
                }
            };

            report.windows += 1;
            let found = people.iter().flatten().count();
            report.fetched += found;
            report.missing += people.len() - found;
            debug!(start = window.start, end = window.end, found, "window fetched");

            let sink = self.sink.clone();
            tasks.push(tokio::spawn(async move { sink.persist(people).await }));
        }

        let total = tasks.len();
        let mut failed = 0;
        for task in tasks {
            match task.await {
                Ok(Ok(rows)) => report.persisted += rows,
                Ok(Err(e)) => {
                    failed += 1;
                    error!(error = %e, "persistence batch failed");
                }
                Err(e) => {
                    failed += 1;
                    error!(error = %e, "persistence task panicked or was cancelled");
                }
            }
        }

        fetch_result?;
        if failed > 0 {
            return Err(LoaderError::PersistFailed { failed, total });
        }

        info!(
            windows = report.windows,
            fetched = report.fetched,
            missing = report.missing,
            persisted = report.persisted,
            "ingestion finished"
        );
        Ok(report)
    }

    async fn fetch_window(&self, window: Range<i64>) -> Result<Vec<Option<Person>>> {
        futures::future::try_join_all(window.map(|person_id| self.source.fetch_person(person_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    struct FakeSource {
        count: i64,
        missing: HashSet<i64>,
        broken: HashSet<i64>,
    }

    impl FakeSource {
        fn new(count: i64) -> Self {
            FakeSource {
                count,
                missing: HashSet::new(),
                broken: HashSet::new(),
            }
        }
    }

    #[async_trait]
    impl PeopleSource for FakeSource {
        async fn fetch_count(&self) -> Result<i64> {
            Ok(self.count)
        }

        async fn fetch_person(&self, person_id: i64) -> Result<Option<Person>> {
            if self.broken.contains(&person_id) {
                return Err(LoaderError::Database(sqlx::Error::RowNotFound));
            }
            if self.missing.contains(&person_id) {
                return Ok(None);
            }
            Ok(Some(Person {
                id: person_id,
                name: format!("person {person_id}"),
                ..Default::default()
            }))
        }
    }

    /// Records each batch once it finishes; batches sleep by their position
    /// in `delays_ms`, so later windows can finish first.
    #[derive(Default)]
    struct SlowSink {
        delays_ms: Vec<u64>,
        started: Mutex<usize>,
        finished: Mutex<Vec<Vec<i64>>>,
        fail_batch: Option<usize>,
    }

    #[async_trait]
    impl PeopleSink for SlowSink {
        async fn persist(&self, people: Vec<Option<Person>>) -> Result<u64> {
            let position = {
                let mut started = self.started.lock().unwrap();
                *started += 1;
                *started - 1
            };
            let delay = self.delays_ms.get(position).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if self.fail_batch == Some(position) {
                return Err(LoaderError::Database(sqlx::Error::PoolClosed));
            }

            let ids: Vec<i64> = people.iter().flatten().map(|p| p.id).collect();
            let rows = ids.len() as u64;
            self.finished.lock().unwrap().push(ids);
            Ok(rows)
        }
    }

    #[test]
    fn windows_cover_id_space_in_order() {
        let windows: Vec<_> = id_windows(23, 10).collect();
        assert_eq!(windows, vec![1..11, 11..21, 21..23]);

        let ids: Vec<i64> = windows.into_iter().flatten().collect();
        assert_eq!(ids, (1..23).collect::<Vec<_>>());
    }

    #[test]
    fn window_count_is_ceil_of_remaining_ids() {
        for count in [2_i64, 10, 11, 12, 21, 88] {
            let expected = ((count - 1) as usize).div_ceil(10);
            assert_eq!(id_windows(count, 10).count(), expected, "count {count}");
        }
    }

    #[test]
    fn no_windows_for_tiny_counts() {
        assert!(id_windows(1, 10).next().is_none());
        assert!(id_windows(0, 10).next().is_none());
        assert!(id_windows(-5, 10).next().is_none());
    }

    #[test]
    fn huge_counts_and_sizes_do_not_overflow() {
        let mut windows = id_windows(i64::MAX, 10);
        assert_eq!(windows.next(), Some(1..11));
        assert_eq!(windows.next(), Some(11..21));

        let windows: Vec<_> = id_windows(i64::MAX, usize::MAX).collect();
        assert_eq!(windows, vec![1..i64::MAX]);

        let windows: Vec<_> = id_windows(i64::MAX, (i64::MAX - 1) as usize).collect();
        assert_eq!(windows, vec![1..i64::MAX]);
    }

    #[tokio::test]
    async fn missing_people_are_dropped() {
        let mut source = FakeSource::new(23);
        source.missing.extend([5, 17]);
        let sink = Arc::new(SlowSink::default());

        let report = Ingestor::new(source, sink.clone(), DEFAULT_BATCH_SIZE)
            .run()
            .await
            .unwrap();

        assert_eq!(report.windows, 3);
        assert_eq!(report.fetched, 20);
        assert_eq!(report.missing, 2);
        assert_eq!(report.persisted, 20);
        assert_eq!(sink.finished.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn waits_for_every_persistence_task() {
        let sink = Arc::new(SlowSink {
            delays_ms: vec![150, 75, 0],
            ..Default::default()
        });

        let report = Ingestor::new(FakeSource::new(23), sink.clone(), DEFAULT_BATCH_SIZE)
            .run()
            .await
            .unwrap();

        let finished = sink.finished.lock().unwrap();
        assert_eq!(finished.len(), 3);
        assert_eq!(report.persisted, 22);
        // The slowest batch was the first one fetched.
        assert_eq!(finished.last().unwrap().first(), Some(&1));
    }

    #[tokio::test]
    async fn zero_windows_return_immediately() {
        let sink = Arc::new(SlowSink::default());
        let report = Ingestor::new(FakeSource::new(1), sink.clone(), DEFAULT_BATCH_SIZE)
            .run()
            .await
            .unwrap();

        assert_eq!(report.windows, 0);
        assert_eq!(*sink.started.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn fetch_error_still_waits_for_spawned_batches() {
        let mut source = FakeSource::new(30);
        source.broken.insert(15);
        let sink = Arc::new(SlowSink {
            delays_ms: vec![100],
            ..Default::default()
        });

        let result = Ingestor::new(source, sink.clone(), DEFAULT_BATCH_SIZE)
            .run()
            .await;

        assert!(result.is_err());
        assert_eq!(*sink.started.lock().unwrap(), 1);
        assert_eq!(sink.finished.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_is_reported_after_barrier() {
        let sink = Arc::new(SlowSink {
            fail_batch: Some(0),
            delays_ms: vec![0, 50, 50],
            ..Default::default()
        });

        let result = Ingestor::new(FakeSource::new(23), sink.clone(), DEFAULT_BATCH_SIZE)
            .run()
            .await;

        match result {
            Err(LoaderError::PersistFailed { failed, total }) => {
                assert_eq!(failed, 1);
                assert_eq!(total, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(sink.finished.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn stores_into_database() {
        let mut source = FakeSource::new(12);
        source.missing.insert(3);
        let db = Arc::new(Database::in_memory().await.unwrap());

        let report = Ingestor::new(source, db.clone(), DEFAULT_BATCH_SIZE)
            .run()
            .await
            .unwrap();

        assert_eq!(report.persisted, 10);
        assert_eq!(db.count_people().await.unwrap(), 10);

        db.close().await;
        assert!(db.is_closed());
    }
}
