use super::animestream::{AnimeStream, AnimeStreamOptions};
use super::{SiteProfile, SourceAdapter, SourceContext};
use crate::models::ContentType;

const BASE_URL: &str = "https://x1.sokuja.uk";

pub fn profile() -> SiteProfile {
    SiteProfile {
        name: "sokuja",
        base_url: BASE_URL,
        content_type: ContentType::Series,
        rendered: false,
    }
}

/// Sokuja lists series under `/anime/` but paginates with path segments.
pub fn build(ctx: SourceContext) -> Box<dyn SourceAdapter> {
    Box::new(AnimeStream::new(
        ctx,
        AnimeStreamOptions {
            latest_path: "/anime/page/{page}/?order=update",
            genre_path: "/genres/{genre}/page/{page}/?order=update",
            ..AnimeStreamOptions::default()
        },
    ))
}
