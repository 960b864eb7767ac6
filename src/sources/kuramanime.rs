use super::spa::{Spa, SpaOptions};
use super::{SiteProfile, SourceAdapter, SourceContext};
use crate::models::ContentType;

const BASE_URL: &str = "https://v6.kuramanime.run";

pub fn profile() -> SiteProfile {
    SiteProfile {
        name: "kuramanime",
        base_url: BASE_URL,
        content_type: ContentType::Series,
        rendered: true,
    }
}

pub fn options() -> SpaOptions {
    SpaOptions {
        latest_path: "/quick/ongoing?order_by=updated&page={page}",
        search_path: "/anime?search={query}&order_by=latest&page={page}",
        detail_path: "/anime/{slug}",
        unit_path: "/anime/{slug}",
        genre_index_path: "/properties/genre?genre_type=all",
        genre_path: "/properties/genre/{genre}?order_by=latest&page={page}",
        slug_prefix: "/anime/",
        item_selector: "div.product__item",
        link_selector: "h5 a",
        load_more_selector: "#loadMoreButton",
        server_option_selector: "#changeServer option",
        player_frame_selector: "div#animeVideoPlayer iframe",
    }
}

pub fn build(ctx: SourceContext) -> Box<dyn SourceAdapter> {
    Box::new(Spa::new(ctx, options()))
}
