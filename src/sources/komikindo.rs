use super::madara::{Madara, MadaraOptions};
use super::{SiteProfile, SourceAdapter, SourceContext};
use crate::models::ContentType;

const BASE_URL: &str = "https://komikindo.ch";

pub fn profile() -> SiteProfile {
    SiteProfile {
        name: "komikindo",
        base_url: BASE_URL,
        content_type: ContentType::Comic,
        rendered: false,
    }
}

pub fn build(ctx: SourceContext) -> Box<dyn SourceAdapter> {
    let options = MadaraOptions {
        latest_path: "/komik/page/{page}/?m_orderby=latest",
        detail_path: "/komik/{slug}/",
        unit_path: "/komik/{slug}/",
        genre_index_path: "/komik/",
        genre_path: "/genre/{genre}/page/{page}/",
        ..MadaraOptions::default()
    };
    Box::new(Madara::new(ctx, options))
}
