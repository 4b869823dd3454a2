pub mod movie;

pub use movie::{
    CreateMovieRequest, Movie, RateMovieRequest, RecommendationQuery, RecommendationResponse,
    UpdateMovieRequest,
};
