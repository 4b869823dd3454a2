use std::fmt::Display;

use crate::models::Movie;

/// Joins description, tags and cast (in that order) into one space-separated string
pub fn compose_query<D, T, C>(description: &[D], tags: &[T], cast: &[C]) -> String
where
    D: Display,
    T: Display,
    C: Display,
{
    let tokens: Vec<String> = description
        .iter()
        .map(ToString::to_string)
        .chain(tags.iter().map(ToString::to_string))
        .chain(cast.iter().map(ToString::to_string))
        .collect();

    tokens.join(" ")
}

/// True when at least one description line has visible text
pub fn has_description<D: AsRef<str>>(description: &[D]) -> bool {
    description.iter().any(|line| !line.as_ref().trim().is_empty())
}

/// Query text for a movie, or `None` when it is too thinly described to rank
pub fn movie_query(movie: &Movie) -> Option<String> {
    if !has_description(&movie.description) {
        return None;
    }
    Some(compose_query(&movie.description, &movie.tags, &movie.cast))
}
