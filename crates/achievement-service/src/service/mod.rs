//! 服务层

pub mod dto;
mod scoring_service;

pub use dto::{ActivityResult, UserScoreSummary};
pub use scoring_service::ScoringService;
