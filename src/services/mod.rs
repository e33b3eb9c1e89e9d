pub mod catalog_index;
pub mod collaborative;
pub mod content;
pub mod deadline;
pub mod engine;
pub mod hybrid;

pub use catalog_index::{CatalogIndex, SimilarityMatrix};
pub use collaborative::{CollaborativeRecommender, CorrelationMode, RatingMatrix};
pub use content::ContentRecommender;
pub use deadline::Deadline;
pub use engine::{EngineSettings, EngineStats, RecommendationEngine};
pub use hybrid::{BlendWeights, HybridBlender};
