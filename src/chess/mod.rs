pub mod config;
pub mod eco;
pub mod error;
pub mod filter;
pub mod log;
pub mod moves;
pub mod parser;
pub mod prep;
pub mod query;
pub mod reader;
pub mod store;
pub mod types;

pub use config::{PrepConfig, QueryConfig, StoreConfig};
pub use error::{CorpusError, CorpusResult, QueryError};
pub use filter::{FilterPredicate, MaterialCriteria, SquareRequirement};
pub use moves::{NextMove, NextMoveStats, PrefixMatch, match_prefix};
pub use prep::{MoveComparison, PoolStats, PrepContext, PrepEngine, PrepProgress, Scenario};
pub use query::{
    Command, CorpusCache, QueryExecutor, QueryResponse, QueryWorker, RequestId, SearchHit,
    SearchRequest, SearchResult,
};
pub use store::{CorpusEntry, CorpusStore};
pub use types::{Game, Line, MoveStat, Outcome, PieceColor, PieceRole, Tags};
