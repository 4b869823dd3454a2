pub mod recommendations;
pub mod similarity;

pub use recommendations::RecommendationService;
