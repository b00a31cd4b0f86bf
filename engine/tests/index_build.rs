use engine::builder::SinkError;
use engine::{
    Archive, ArticleRef, BuildOptions, BuildProgress, EngineError, FullTextIndex, IndexBuilder, IndexPaths,
    MemoryArchive, NoProgress, ReaderConfig, Result, SearchSource, SessionController,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::tempdir;

const ARTICLES: usize = 37;

fn corpus() -> MemoryArchive {
    MemoryArchive::new((0..ARTICLES).map(|i| {
        let parity = if i % 2 == 0 { "even" } else { "odd" };
        (
            format!("Article {i:03}"),
            format!("<p>Shared heading text. Marker{i} appears once; numbers are {parity}.</p>"),
        )
    }))
}

fn options(batch_size: usize) -> BuildOptions {
    BuildOptions { batch_size, ..BuildOptions::default() }
}

fn full_build(paths: &IndexPaths, archive: &MemoryArchive) -> Vec<(String, u64, u32)> {
    let builder = IndexBuilder::open(paths, BuildOptions { resume: false, ..options(5) }).unwrap();
    let state = builder.build(archive, &mut NoProgress).unwrap();
    assert!(state.is_complete());
    builder.store().all_postings().unwrap()
}

#[test]
fn cancelled_build_resumes_to_the_same_index() {
    let archive = corpus();
    let reference_dir = tempdir().unwrap();
    let expected = full_build(&IndexPaths::new(reference_dir.path()), &archive);

    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    {
        let builder = IndexBuilder::open(&paths, options(5)).unwrap();
        let cancel = builder.cancel_flag();
        let mut batches = 0;
        let mut sink = |_: &BuildProgress| -> std::result::Result<(), SinkError> {
            batches += 1;
            if batches == 2 {
                cancel.cancel();
            }
            Ok(())
        };
        let state = builder.build(&archive, &mut sink).unwrap();
        assert_eq!(state.last_processed_ordinal, Some(9));
        assert!(!state.is_complete());
    }

    let builder = IndexBuilder::open(&paths, options(5)).unwrap();
    let mut first: Option<BuildProgress> = None;
    let mut sink = |p: &BuildProgress| -> std::result::Result<(), SinkError> {
        first.get_or_insert(*p);
        Ok(())
    };
    let state = builder.build(&archive, &mut sink).unwrap();
    assert!(state.is_complete());
    let first = first.unwrap();
    assert_eq!(first.resumed_from, 10);
    assert_eq!(first.processed, 15);
    assert_eq!(first.total, ARTICLES as u64);
    assert_eq!(builder.store().all_postings().unwrap(), expected);
    assert_eq!(builder.store().document_count(), ARTICLES);
}

/// Fails to read one article the first time it is asked for.
struct FlakyArchive {
    inner: MemoryArchive,
    fail_at: u64,
    armed: AtomicBool,
}

impl Archive for FlakyArchive {
    fn resolve_title(&self, title: &str) -> Result<Option<ArticleRef>> {
        self.inner.resolve_title(title)
    }

    fn titles(&self) -> Box<dyn Iterator<Item = Result<ArticleRef>> + '_> {
        self.inner.titles()
    }

    fn read_body(&self, article: &ArticleRef) -> Result<Vec<u8>> {
        if article.locator == self.fail_at && self.armed.swap(false, Ordering::SeqCst) {
            return Err(EngineError::ArchiveIo("simulated read failure".into()));
        }
        self.inner.read_body(article)
    }

    fn article_count(&self) -> u64 {
        self.inner.article_count()
    }
}

#[test]
fn archive_failure_keeps_only_whole_batches() {
    let archive = FlakyArchive { inner: corpus(), fail_at: 12, armed: AtomicBool::new(true) };
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    {
        let builder = IndexBuilder::open(&paths, options(5)).unwrap();
        let err = builder.build(&archive, &mut NoProgress).unwrap_err();
        assert!(matches!(err, EngineError::ArchiveIo(_)));
        let state = builder.store().load_state().unwrap().unwrap();
        assert_eq!(state.last_processed_ordinal, Some(9));
        let postings = builder.store().all_postings().unwrap();
        assert!(postings.iter().all(|(_, ordinal, _)| *ordinal < 10));
        assert_eq!(builder.store().document_count(), 10);
    }

    let builder = IndexBuilder::open(&paths, options(5)).unwrap();
    assert!(builder.build(&archive, &mut NoProgress).unwrap().is_complete());

    let reference_dir = tempdir().unwrap();
    let expected = full_build(&IndexPaths::new(reference_dir.path()), &archive.inner);
    assert_eq!(builder.store().all_postings().unwrap(), expected);
}

#[test]
fn misbehaving_sinks_do_not_abort_the_build() {
    let archive = corpus();
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());

    let builder = IndexBuilder::open(&paths, BuildOptions { resume: false, ..options(10) }).unwrap();
    let mut failing = |_: &BuildProgress| -> std::result::Result<(), SinkError> { Err("sink is full".into()) };
    assert!(builder.build(&archive, &mut failing).unwrap().is_complete());
    drop(builder);

    let builder = IndexBuilder::open(&paths, BuildOptions { resume: false, ..options(10) }).unwrap();
    let mut calls = 0;
    let mut panicking = |_: &BuildProgress| -> std::result::Result<(), SinkError> {
        calls += 1;
        panic!("sink exploded");
    };
    assert!(builder.build(&archive, &mut panicking).unwrap().is_complete());
    assert_eq!(calls, 4);
}

#[test]
fn concurrent_search_sees_a_committed_prefix() {
    let archive = corpus();
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let builder = IndexBuilder::open(&paths, options(3)).unwrap();
    let reader = FullTextIndex::new(builder.store().clone());

    std::thread::scope(|scope| {
        let handle = scope.spawn(|| builder.build(&archive, &mut NoProgress));
        for _ in 0..50 {
            let before = processed(&reader);
            let found = reader.search("shared", ARTICLES).unwrap();
            let after = processed(&reader);
            assert!(found.total as u64 >= before && found.total as u64 <= after);
            assert!(found.results.iter().all(|r| r.article.locator < after));
        }
        assert!(handle.join().unwrap().unwrap().is_complete());
    });

    assert_eq!(reader.search("shared", ARTICLES).unwrap().total, ARTICLES);
}

fn processed(index: &FullTextIndex) -> u64 {
    index.store().load_state().unwrap().map_or(0, |s| s.processed())
}

#[test]
fn fulltext_ranks_by_distinct_matches() {
    let archive = corpus();
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let builder = IndexBuilder::open(&paths, options(8)).unwrap();
    builder.build(&archive, &mut NoProgress).unwrap();
    let index = FullTextIndex::new(builder.store().clone());

    let found = index.search("marker7 even odd", 5).unwrap();
    assert_eq!(found.total, ARTICLES);
    assert_eq!(found.results.len(), 5);
    assert_eq!(found.results[0].title, "Article 007");
    assert_eq!(found.results[0].score, Some(2.0));
    assert_eq!(found.results[1].title, "Article 000");
    assert_eq!(found.results.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn tokenizer_mismatch_refuses_to_resume() {
    let archive = corpus();
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    {
        let builder = IndexBuilder::open(&paths, options(50)).unwrap();
        builder.build(&archive, &mut NoProgress).unwrap();
    }
    let mut unstemmed = options(50);
    unstemmed.tokenizer.stem = false;
    assert!(matches!(IndexBuilder::open(&paths, unstemmed), Err(EngineError::ConstraintViolation(_))));
    unstemmed.resume = false;
    assert!(IndexBuilder::open(&paths, unstemmed).is_ok());
}

#[test]
fn resuming_against_a_different_archive_is_corrupt() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    {
        let builder = IndexBuilder::open(&paths, options(5)).unwrap();
        builder.build(&corpus(), &mut NoProgress).unwrap();
    }
    let smaller = MemoryArchive::new([("Only", "<p>one</p>")]);
    let builder = IndexBuilder::open(&paths, options(5)).unwrap();
    assert!(matches!(builder.build(&smaller, &mut NoProgress), Err(EngineError::IndexCorrupt(_))));
}

#[test]
fn corrupt_meta_falls_back_to_title_search() {
    let archive = corpus();
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    {
        let builder = IndexBuilder::open(&paths, options(20)).unwrap();
        builder.build(&archive, &mut NoProgress).unwrap();
    }
    std::fs::write(dir.path().join("meta.json"), b"{ not json").unwrap();

    let mut session = SessionController::new(archive, ReaderConfig::default()).unwrap();
    assert!(!session.attach_index(&paths));
    assert!(!session.has_fulltext());
    let found = session.search("article 01", 20).unwrap();
    assert_eq!(found.source, SearchSource::Title);
    assert_eq!(found.total_matches, 10);
}
