use super::animestream::{AnimeStream, AnimeStreamOptions};
use super::{SiteProfile, SourceAdapter, SourceContext};
use crate::models::ContentType;

const BASE_URL: &str = "https://anoboy.be";

pub fn profile() -> SiteProfile {
    SiteProfile {
        name: "anoboy",
        base_url: BASE_URL,
        content_type: ContentType::Series,
        rendered: false,
    }
}

pub fn build(ctx: SourceContext) -> Box<dyn SourceAdapter> {
    Box::new(AnimeStream::new(ctx, AnimeStreamOptions::default()))
}
