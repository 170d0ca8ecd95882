pub mod consensus;
pub mod parse;
pub mod types;

pub use consensus::{
    compute_consensus, ConsensusOutcome, ConsensusReport, MentionCount,
};
pub use parse::parse_judgment;
pub use types::{
    JudgmentRecord, JudgmentReply, Likelihood, ParseError, RawJudgment, RecommendedAction,
};
