use super::madara::{Madara, MadaraOptions};
use super::{SiteProfile, SourceAdapter, SourceContext};
use crate::models::ContentType;

const BASE_URL: &str = "https://sakuranovel.id";

pub fn profile() -> SiteProfile {
    SiteProfile {
        name: "sakuranovel",
        base_url: BASE_URL,
        content_type: ContentType::Novel,
        rendered: false,
    }
}

pub fn build(ctx: SourceContext) -> Box<dyn SourceAdapter> {
    let options = MadaraOptions {
        latest_path: "/series/page/{page}/?m_orderby=latest",
        detail_path: "/series/{slug}/",
        unit_path: "/series/{slug}/",
        genre_index_path: "/series/",
        genre_path: "/genre/{genre}/page/{page}/",
        ..MadaraOptions::default()
    };
    Box::new(Madara::new(ctx, options))
}
