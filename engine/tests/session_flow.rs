use engine::{
    ArticleRef, BuildOptions, EngineError, IndexBuilder, IndexPaths, MemoryArchive, NoProgress, ReaderConfig,
    SearchResult, SearchSession, SearchSource, SessionController, SessionState,
};
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

fn long_body(topic: &str, paragraphs: usize) -> String {
    (1..=paragraphs).map(|i| format!("<p>Paragraph {i} is about the {topic}.</p>")).collect()
}

fn archive() -> MemoryArchive {
    MemoryArchive::new([
        ("Alpha".to_string(), long_body("volcano", 30)),
        ("Beta".to_string(), long_body("volcano and the glacier", 6)),
        ("Gamma".to_string(), long_body("glacier", 3)),
        ("Quokka".to_string(), "<p>A small marsupial.</p>".to_string()),
    ])
}

fn config() -> ReaderConfig {
    ReaderConfig { page_size: 5, ..ReaderConfig::default() }
}

fn indexed_session() -> (TempDir, SessionController<MemoryArchive>) {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let archive = archive();
    {
        let builder = IndexBuilder::open(&paths, BuildOptions { batch_size: 2, ..BuildOptions::default() }).unwrap();
        builder.build(&archive, &mut NoProgress).unwrap();
    }
    let mut session = SessionController::new(archive, config()).unwrap();
    assert!(session.attach_index(&paths));
    (dir, session)
}

#[test]
fn fulltext_results_rank_by_matched_words() {
    let (_dir, mut session) = indexed_session();
    let found = session.search("volcano glacier", 10).unwrap();
    assert_eq!(found.source, SearchSource::FullText);
    assert_eq!(found.total_matches, 3);
    let titles: Vec<&str> = found.results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Beta", "Alpha", "Gamma"]);
}

#[test]
fn words_only_in_titles_fall_back_to_title_search() {
    let (_dir, mut session) = indexed_session();
    let found = session.search("quokk", 10).unwrap();
    assert_eq!(found.source, SearchSource::Title);
    assert_eq!(found.results[0].title, "Quokka");
    assert!(session.has_fulltext());
}

#[test]
fn back_and_forward_restore_saved_pages() {
    let mut session = SessionController::new(archive(), config()).unwrap();
    let view = session.read_direct("Alpha").unwrap();
    assert!(view.page_count() > 3);
    session.next_page().unwrap();
    session.next_page().unwrap();
    assert_eq!(session.view().unwrap().current_page_index(), 2);

    session.read_direct("beta").unwrap();
    session.next_page().unwrap();

    let view = session.back().unwrap();
    assert_eq!(view.article.title, "Alpha");
    assert_eq!(view.current_page_index(), 2);

    let view = session.forward().unwrap();
    assert_eq!(view.article.title, "Beta");
    assert_eq!(view.current_page_index(), 1);
    assert!(matches!(session.forward(), Err(EngineError::NoHistory)));
    assert_eq!(session.view().unwrap().article.title, "Beta");
}

#[test]
fn a_fresh_visit_discards_forward_history() {
    let mut session = SessionController::new(archive(), config()).unwrap();
    session.read_direct("Alpha").unwrap();
    session.read_direct("Beta").unwrap();
    session.back().unwrap();
    session.read_direct("Gamma").unwrap();
    assert!(matches!(session.forward(), Err(EngineError::NoHistory)));
    assert_eq!(session.back().unwrap().article.title, "Alpha");
    assert!(matches!(session.back(), Err(EngineError::NoHistory)));
}

#[test]
fn paging_stops_at_both_ends() {
    let mut session = SessionController::new(archive(), config()).unwrap();
    assert!(session.next_page().is_err());
    let last = session.read_direct("Alpha").unwrap().page_count() - 1;
    assert_eq!(session.prev_page().unwrap().current_page_index(), 0);
    for _ in 0..last + 3 {
        session.next_page().unwrap();
    }
    assert_eq!(session.view().unwrap().current_page_index(), last);
}

#[test]
fn resize_keeps_position_and_history() {
    let mut session = SessionController::new(archive(), config()).unwrap();
    session.read_direct("Alpha").unwrap();
    for _ in 0..4 {
        session.next_page().unwrap();
    }
    session.resize(10).unwrap();
    assert_eq!(session.view().unwrap().current_page_index(), 2);
    assert_eq!(session.history().current().unwrap().saved_page, 2);
    assert!(session.resize(0).is_err());
}

#[test]
fn adopted_sessions_survive_serialization() {
    let mut first = SessionController::new(archive(), config()).unwrap();
    let saved = serde_json::to_string(first.search("a", 10).unwrap()).unwrap();

    let mut second = SessionController::new(archive(), config()).unwrap();
    let restored: SearchSession = serde_json::from_str(&saved).unwrap();
    second.adopt_session(restored).unwrap();
    assert_eq!(second.state(), SessionState::ShowingResults);
    let title = second.search_session().unwrap().get(2).unwrap().title.clone();
    assert_eq!(second.open_result(2).unwrap().article.title, title);
}

#[test]
fn stale_results_fail_without_losing_state() {
    let mut session = SessionController::new(archive(), config()).unwrap();
    let stale = SearchSession {
        query: "old".into(),
        source: SearchSource::FullText,
        results: vec![SearchResult {
            rank: 1,
            title: "Removed".into(),
            article: ArticleRef::new("Removed", 99),
            score: Some(1.0),
        }],
        total_matches: 1,
    };
    session.adopt_session(stale).unwrap();
    assert!(matches!(session.open_result(1), Err(EngineError::ArchiveIo(_))));
    assert_eq!(session.state(), SessionState::ShowingResults);
    assert!(session.history().is_empty());
}

#[test]
fn quick_opens_the_best_hit() {
    let mut session = SessionController::new(archive(), config()).unwrap();
    assert_eq!(session.quick("gam").unwrap().article.title, "Gamma");
    assert!(matches!(session.quick("nothing here"), Err(EngineError::NotFound(_))));
    assert!(matches!(session.read_direct("Delta"), Err(EngineError::NotFound(_))));
}
