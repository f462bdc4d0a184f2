//! # friend-finder
//!
//! Personality-based friend matching. Every user is a point in a
//! five-dimensional trait space (extraversion, agreeableness,
//! conscientiousness, emotional stability, intellect/imagination), each
//! component on [0,100]. Finding friends means finding nearby points, then
//! scoring, filtering and paginating them.
//!
//! ## Quick Start
//!
//! ```ignore
//! use friend_finder::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> MatchResult<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let alice = store.register_user("alice")?;
//!     let bob = store.register_user("bob")?;
//!     store.save_results(alice, TraitVector::new([80.0, 50.0, 70.0, 60.0, 40.0])?, "1.0")?;
//!     store.save_results(bob, TraitVector::new([50.0, 60.0, 70.0, 60.0, 60.0])?, "1.0")?;
//!
//!     let pipeline = DiscoveryPipeline::new(store);
//!     let page = pipeline
//!         .discover_for(alice, &DiscoveryFilters::new(), PageRequest::default())
//!         .await?;
//!     for record in page.records {
//!         println!("{}: {}", record.candidate_id, record.compatibility_score);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! 1. **Vector index** (`vector`) - exact k-NN over a per-request pool
//! 2. **Scorer** (`scoring`) - inverse-distance similarity plus bonus rules
//! 3. **Discovery** (`discovery`) - ranking, filtering, enrichment, pages
//! 4. **Store** (`store`) - the read port discovery needs and an in-memory
//!    implementation
//! 5. **HTTP** (`http`, feature `http`) - JSON API over the store
//!
//! The index and the scorer are pure. Discovery only touches the outside
//! world through [`RelationshipStore`].

// Internal modules
mod error;
mod types;

pub mod config;
pub mod discovery;
pub mod quiz;
pub mod scoring;
pub mod store;
pub mod vector;

// HTTP API (optional)
#[cfg(feature = "http")]
pub mod http;

pub use config::ServerConfig;
pub use discovery::{
    CompatibilityRecord, DiscoveryFilters, DiscoveryPage, DiscoveryPipeline, PageRequest,
    PartialDataWarning, PersonalityInsights, SkippedCandidate, personality_insights,
};
pub use error::{MatchError, MatchResult};
pub use quiz::{Keying, LikertScores, QuestionItem, Questionnaire};
pub use scoring::{Bonus, CompatibilityScorer, ScoreBreakdown};
pub use store::{
    AgeBucket, Candidate, CandidateFilter, CandidatePool, MemoryStore, RelationshipStore,
};
pub use types::{
    DIMENSIONS, FriendStatus, RawTraits, TRAIT_MAX, TRAIT_MIN, Trait, TraitVector, UserId,
    UserProfile,
};
pub use vector::{DistanceMetric, Neighbor, VectorIndex};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::ServerConfig;
    pub use crate::discovery::{DiscoveryFilters, DiscoveryPage, DiscoveryPipeline, PageRequest};
    pub use crate::error::{MatchError, MatchResult};
    pub use crate::scoring::CompatibilityScorer;
    pub use crate::store::{CandidateFilter, MemoryStore, RelationshipStore};
    pub use crate::types::{Trait, TraitVector, UserId};
    pub use crate::vector::{DistanceMetric, VectorIndex};
}
