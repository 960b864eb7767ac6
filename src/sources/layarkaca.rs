use super::dooplay::{DooPlay, DooPlayOptions};
use super::{SiteProfile, SourceAdapter, SourceContext};
use crate::extract::SlugRule;
use crate::models::ContentType;

const BASE_URL: &str = "https://tv.lk21official.cc";

pub fn profile() -> SiteProfile {
    SiteProfile {
        name: "layarkaca",
        base_url: BASE_URL,
        content_type: ContentType::Film,
        rendered: false,
    }
}

/// Films are their own unit, so details and streams share a page.
pub fn build(ctx: SourceContext) -> Box<dyn SourceAdapter> {
    let options = DooPlayOptions {
        latest_path: "/movies/page/{page}/",
        latest_slug_rule: SlugRule::Path,
        detail_path: "/movies/{slug}/",
        unit_path: "/movies/{slug}/",
        ..DooPlayOptions::default()
    };
    Box::new(DooPlay::new(ctx, options))
}
