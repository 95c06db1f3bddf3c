use chess_corpus::chess::{
    CorpusStore, FilterPredicate, PieceColor, PrepContext, PrepEngine, QueryConfig, QueryExecutor,
    QueryResponse, QueryWorker, SearchRequest, StoreConfig,
};
use std::fs;
use std::path::PathBuf;

const WHITE_REPERTOIRE: &str = r#"[Event "Club"]
[White "Hero"]
[Black "Rival"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 1-0

[Event "Club"]
[White "Hero"]
[Black "Rival"]
[Result "1/2-1/2"]

1. e4 c5 2. Nf3 d6 3. d4 cxd4 1/2-1/2
"#;

const RIVAL_GAMES: &str = r#"[Event "Open"]
[White "Someone"]
[Black "Rival"]
[Result "0-1"]

1. e4 e5 2. Nf3 Nc6 0-1

[Event "Open"]
[White "Another"]
[Black "Rival"]
[Result "1-0"]

1. e4 c5 2. Nf3 Nc6 1-0
"#;

const APPENDED: &str = r#"[Event "Blitz"]
[White "Hero"]
[Black "Rival"]
[Result "0-1"]

1. d4 Nf6 2. c4 e6 0-1"#;

fn search(request_id: u64, path: &PathBuf, prefix: &[&str]) -> SearchRequest {
    SearchRequest {
        request_id,
        corpus_paths: vec![path.clone()],
        move_prefix: prefix.iter().map(|s| s.to_string()).collect(),
        filter: None,
    }
}

fn done(response: QueryResponse) -> chess_corpus::chess::SearchResult {
    match response {
        QueryResponse::Done { result, .. } => result,
        QueryResponse::Failed { error, .. } => panic!("search failed: {}", error),
    }
}

#[test]
fn test_store_query_and_prep_flow() {
    let sources = tempfile::tempdir().unwrap();
    let hero_src = sources.path().join("hero.pgn");
    let rival_src = sources.path().join("rival.pgn");
    fs::write(&hero_src, WHITE_REPERTOIRE).unwrap();
    fs::write(&rival_src, RIVAL_GAMES).unwrap();

    let root = tempfile::tempdir().unwrap();
    let mut store = CorpusStore::open(&StoreConfig::new(root.path())).unwrap();
    let hero = store.add_from_file(&hero_src, Some("Hero")).unwrap();
    let rival = store.add_from_file(&rival_src, Some("Rival")).unwrap();
    assert_eq!(hero.game_count, 2);
    assert_eq!(rival.game_count, 2);

    let worker = QueryWorker::spawn(QueryExecutor::new(QueryConfig::default())).unwrap();

    worker.submit(search(1, &hero.path, &["e4"])).unwrap();
    let result = done(worker.recv().unwrap());
    assert_eq!(result.total_games, 2);
    assert_eq!(result.white_win_percent, 50.0);
    assert_eq!(result.draw_percent, 50.0);

    // Mutate, then invalidate before the next search.
    store.append_game(&hero.id, APPENDED).unwrap();
    worker.invalidate(&hero.path).unwrap();
    worker.submit(search(2, &hero.path, &[])).unwrap();
    let result = done(worker.recv().unwrap());
    assert_eq!(result.total_games, 3);
    assert_eq!(result.games[2].index, 2);
    assert_eq!(result.games[2].game.moves, vec!["d4", "Nf6", "c4", "e6"]);

    let reconciled = store.reconcile(&hero.id).unwrap();
    assert_eq!(reconciled.game_count, 3);

    // Drop the appended game again by its search index.
    let trimmed = store.remove_games(&hero.id, &[result.games[2].index]).unwrap();
    assert_eq!(trimmed.game_count, 2);

    let engine = PrepEngine::default();
    let hero_games = store.load_games(&hero.id).unwrap();
    let rival_games = store.load_games(&rival.id).unwrap();
    let context = PrepContext {
        hero_color: PieceColor::White,
    };

    let mut layers = 0;
    let scenarios = engine.scenarios(&hero_games, &rival_games, &["e4"], 3, Some(context), |p| {
        layers = p.layer;
    });
    assert_eq!(layers, 3);
    assert!(!scenarios.is_empty());
    for scenario in &scenarios {
        assert!(scenario.opportunity_probability <= 1.0);
        assert!(scenario.probability <= scenario.opportunity_probability);
    }
    assert!(scenarios.iter().any(|s| s.line.join(" ") == "e5 Nf3 Nc6"));

    let comparison = engine.compare(&hero_games, &rival_games, &["e4"], Some(context));
    assert_eq!(comparison.len(), 2);
}

#[test]
fn test_merge_then_filtered_search() {
    let sources = tempfile::tempdir().unwrap();
    let a_src = sources.path().join("a.pgn");
    let b_src = sources.path().join("b.pgn");
    fs::write(&a_src, WHITE_REPERTOIRE).unwrap();
    fs::write(&b_src, RIVAL_GAMES).unwrap();

    let root = tempfile::tempdir().unwrap();
    let mut store = CorpusStore::open(&StoreConfig::new(root.path())).unwrap();
    let a = store.add_from_file(&a_src, None).unwrap();
    let b = store.add_from_file(&b_src, None).unwrap();
    let merged = store.merge(&[a.id.as_str(), b.id.as_str()], "Everything").unwrap();
    assert_eq!(merged.game_count, a.game_count + b.game_count);

    let mut executor = QueryExecutor::default();
    let request = SearchRequest {
        request_id: 1,
        corpus_paths: vec![merged.path.clone()],
        move_prefix: vec!["e4".to_string()],
        filter: Some(FilterPredicate {
            white: Some("hero".to_string()),
            ..FilterPredicate::default()
        }),
    };
    let result = executor.search(&request).unwrap();
    assert_eq!(result.total_games, 2);
    assert!(result.games.iter().all(|hit| hit.corpus_path == merged.path));

    // The catalog survives a reopen.
    drop(store);
    let store = CorpusStore::open(&StoreConfig::new(root.path())).unwrap();
    assert_eq!(store.list().len(), 3);
    assert_eq!(store.get(&merged.id).unwrap().name, "Everything");
}
