use super::dooplay::{DooPlay, DooPlayOptions};
use super::{SiteProfile, SourceAdapter, SourceContext};
use crate::extract::SlugRule;
use crate::models::ContentType;

const BASE_URL: &str = "https://samehadaku.email";

pub fn profile() -> SiteProfile {
    SiteProfile {
        name: "samehadaku",
        base_url: BASE_URL,
        content_type: ContentType::Series,
        rendered: false,
    }
}

pub fn build(ctx: SourceContext) -> Box<dyn SourceAdapter> {
    let options = DooPlayOptions {
        latest_path: "/anime-terbaru/page/{page}/",
        latest_slug_rule: SlugRule::SeriesFromUnit,
        detail_path: "/anime/{slug}/",
        unit_path: "/{slug}/",
        genre_index_path: "/daftar-anime-2/",
        schedule_path: Some("/jadwal-rilis/"),
        ..DooPlayOptions::default()
    };
    Box::new(DooPlay::new(ctx, options))
}
