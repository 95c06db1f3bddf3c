//! Chess game corpora: PGN parsing, prefix and position search, a managed
//! corpus catalog, and opening preparation scenarios.

pub mod chess;

pub use chess::parser::parse;
pub use chess::{
    CorpusError, CorpusStore, FilterPredicate, Game, PrepEngine, QueryExecutor, QueryWorker,
    SearchRequest, StoreConfig,
};
