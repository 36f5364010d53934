/// Integration tests for the seeding pipeline
/// These drive the orchestrator end to end against the in-memory store

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use seeder::config::{EntityToggles, SeedConfig, SeedOptions};
    use seeder::images::ImageService;
    use seeder::loader::{FileLoader, LoaderError};
    use seeder::orchestrator::{Phase, RunReport, SeedOrchestrator};
    use seeder::password::{PasswordError, PasswordHasher};
    use seeder::store::{MemoryStore, SeedStore};
    use seeder::{BatchError, SeedError};
    use serde_json::json;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingImages {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageService for CountingImages {
        async fn process_image_url(&self, url: &str, folder: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = url.rsplit('/').next()?;
            Some(format!("/uploads/{}/{}", folder, name))
        }
    }

    struct FastHasher;

    #[async_trait]
    impl PasswordHasher for FastHasher {
        async fn hash(&self, plaintext: &str, _cost: u32) -> Result<String, PasswordError> {
            Ok(format!("test-hash-{}", plaintext.len()))
        }
    }

    fn write_json(dir: &Path, name: &str, value: serde_json::Value) {
        std::fs::write(dir.join(name), value.to_string()).unwrap();
    }

    fn fixtures() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_json(
            dir.path(),
            "users.json",
            json!([
                {"name": "Ada", "email": "ada@example.com", "password": "password1", "role": "admin"},
                {"name": "Bob", "email": "bob@example.com"}
            ]),
        );
        write_json(
            dir.path(),
            "comicsdata1.json",
            json!([
                {
                    "title": "Solo Leveling",
                    "coverImage": "https://cdn.example.com/sl.jpg",
                    "status": "Completed",
                    "author": "Chugong",
                    "genres": ["Action", "Fantasy"]
                }
            ]),
        );
        write_json(
            dir.path(),
            "comicsdata2.json",
            json!({"title": "Tower of God", "type": "Manhwa", "genres": ["Fantasy"]}),
        );
        write_json(
            dir.path(),
            "chapters.json",
            json!([
                {"comic": "solo-leveling", "chapterNumber": 1, "images": ["https://cdn.example.com/1.jpg"]},
                {"comicTitle": "Tower of God", "name": "Chapter 2"},
                {"comicSlug": "not-seeded", "chapterNumber": 1}
            ]),
        );
        dir
    }

    fn config(dir: &Path) -> SeedConfig {
        SeedConfig {
            data_dir: dir.to_path_buf(),
            in_memory: true,
            options: SeedOptions {
                batch_size: 2,
                image_download_concurrency: 2,
                ..SeedOptions::default()
            },
            ..SeedConfig::default()
        }
    }

    fn orchestrator(
        config: SeedConfig,
        store: Arc<MemoryStore>,
        images: Arc<CountingImages>,
    ) -> SeedOrchestrator {
        let loader = FileLoader::new(config.data_dir.clone());
        SeedOrchestrator::new(config, store, images, Arc::new(FastHasher), loader)
    }

    fn counts(report: &RunReport, phase: Phase) -> (usize, usize, usize, usize) {
        let snapshot = report
            .phase(phase)
            .and_then(|p| p.snapshot.clone())
            .unwrap();
        (snapshot.created, snapshot.updated, snapshot.skipped, snapshot.errors)
    }

    #[tokio::test]
    async fn test_users_only_run() {
        let dir = tempfile::tempdir().unwrap();
        write_json(
            dir.path(),
            "users.json",
            json!([
                {"name": "Ada", "email": "ada@example.com", "image": "https://cdn.example.com/ada.png"},
                {"name": "Bob", "email": "bob@example.com"}
            ]),
        );

        let mut config = config(dir.path());
        config.enabled = EntityToggles {
            users: true,
            comics: false,
            chapters: false,
        };
        config.options.skip_image_download = true;

        let store = Arc::new(MemoryStore::new());
        let images = Arc::new(CountingImages::default());
        let report = orchestrator(config, store.clone(), images.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(counts(&report, Phase::Users), (2, 0, 0, 0));
        assert_eq!(report.phase(Phase::Users).unwrap().loaded, 2);
        assert!(report.phase(Phase::Comics).unwrap().skipped);
        assert!(report.phase(Phase::Chapters).unwrap().skipped);
        assert_eq!(report.executed().count(), 1);
        assert_eq!(store.users().len(), 2);
        assert_eq!(images.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_full_run_in_dependency_order() {
        let dir = fixtures();
        let store = Arc::new(MemoryStore::new());
        let images = Arc::new(CountingImages::default());
        let report = orchestrator(config(dir.path()), store.clone(), images.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(counts(&report, Phase::Users), (2, 0, 0, 0));
        assert_eq!(counts(&report, Phase::Comics), (2, 0, 0, 0));
        // the chapter of an unknown comic is skipped, not failed
        assert_eq!(counts(&report, Phase::Chapters), (2, 0, 1, 0));
        assert_eq!(report.total_errors(), 0);

        let phases: Vec<Phase> = report.phases.iter().map(|p| p.phase).collect();
        assert_eq!(phases, Phase::ALL.to_vec());

        let chapters = store.chapters();
        assert_eq!(chapters.len(), 2);
        let first = chapters.iter().find(|c| c.chapter_number == 1).unwrap();
        assert_eq!(
            store.chapter_images(first.id),
            vec!["/uploads/chapters/solo-leveling/1.jpg".to_string()]
        );
        assert_eq!(images.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_run_creates_nothing() {
        let dir = fixtures();
        let store = Arc::new(MemoryStore::new());
        let images = Arc::new(CountingImages::default());

        orchestrator(config(dir.path()), store.clone(), images.clone())
            .run()
            .await
            .unwrap();
        let second = orchestrator(config(dir.path()), store.clone(), images)
            .run()
            .await
            .unwrap();

        for phase in Phase::ALL {
            let (created, updated, skipped, errors) = counts(&second, phase);
            assert_eq!(created, 0, "{} created on second run", phase);
            assert_eq!(errors, 0);
            let loaded = second.phase(phase).unwrap().loaded;
            assert_eq!(updated + skipped, loaded);
        }
        assert_eq!(store.users().len(), 2);
        assert_eq!(store.comics().len(), 2);
        assert_eq!(store.chapters().len(), 2);
    }

    #[tokio::test]
    async fn test_one_bad_record_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        write_json(
            dir.path(),
            "users.json",
            json!([
                {"name": "One", "email": "one@example.com"},
                {"name": "Two", "email": "two-at-example.com"},
                {"name": "Three", "email": "three@example.com"},
                {"name": "Four", "email": "four@example.com"},
                {"name": "Five", "email": "five@example.com"}
            ]),
        );
        let mut config = config(dir.path());
        config.enabled.comics = false;
        config.enabled.chapters = false;

        let store = Arc::new(MemoryStore::new());
        let report = orchestrator(config, store.clone(), Arc::new(CountingImages::default()))
            .run()
            .await
            .unwrap();

        assert_eq!(counts(&report, Phase::Users), (4, 0, 0, 1));
        let mut emails: Vec<String> = store.users().into_iter().map(|u| u.email).collect();
        emails.sort();
        assert_eq!(
            emails,
            vec![
                "five@example.com",
                "four@example.com",
                "one@example.com",
                "three@example.com"
            ]
        );
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = fixtures();
        let mut config = config(dir.path());
        config.options.dry_run = true;

        let store = Arc::new(MemoryStore::new());
        let images = Arc::new(CountingImages::default());
        let report = orchestrator(config, store.clone(), images.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(counts(&report, Phase::Users), (2, 0, 0, 0));
        assert_eq!(counts(&report, Phase::Comics), (2, 0, 0, 0));
        // no comic was written, so every chapter's comic is missing
        assert_eq!(counts(&report, Phase::Chapters), (0, 0, 3, 0));
        assert!(store.users().is_empty());
        assert!(store.comics().is_empty());
        assert_eq!(images.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreachable_store_aborts_before_seeding() {
        let dir = fixtures();
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);

        let result = orchestrator(
            config(dir.path()),
            store.clone(),
            Arc::new(CountingImages::default()),
        )
        .run()
        .await;

        assert!(matches!(result, Err(SeedError::Connectivity(_))));
        store.set_offline(false);
        assert!(store.ping().await.is_ok());
        assert!(store.users().is_empty());
    }

    #[tokio::test]
    async fn test_loader_failure_aborts_run() {
        let dir = fixtures();
        let mut config = config(dir.path());
        config.files.comics = vec!["*/comics.json".to_string()];

        let store = Arc::new(MemoryStore::new());
        let result = orchestrator(config, store.clone(), Arc::new(CountingImages::default()))
            .run()
            .await;

        assert!(matches!(
            result,
            Err(SeedError::Loader(LoaderError::InvalidPattern { .. }))
        ));
        // the users phase had already completed
        assert_eq!(store.users().len(), 2);
        assert!(store.comics().is_empty());
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_rejected() {
        let dir = fixtures();
        let mut config = config(dir.path());
        config.options.batch_size = 0;

        let result = orchestrator(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(CountingImages::default()),
        )
        .run()
        .await;

        assert!(matches!(
            result,
            Err(SeedError::Batch(BatchError::ZeroBatchSize))
        ));
    }

    #[tokio::test]
    async fn test_missing_fixture_files_seed_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let report = orchestrator(
            config(dir.path()),
            store.clone(),
            Arc::new(CountingImages::default()),
        )
        .run()
        .await
        .unwrap();

        for phase in Phase::ALL {
            assert_eq!(report.phase(phase).unwrap().loaded, 0);
            assert_eq!(counts(&report, phase), (0, 0, 0, 0));
        }
    }
}
