//! Catalog listings (latest, search, genre pages)
//!
//! Listing markup is tried against an ordered list of (container, link)
//! patterns; the first pattern that yields items wins. Items are
//! de-duplicated by slug within one pass.

use super::chain::{FieldChain, ListChain};
use super::slug::{series_slug_from_url, slug_after, slug_from_url};
use super::text::absolute_url;
use crate::models::{CatalogItem, ContentType};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Container and link selectors used by the WordPress themes most sources
/// run on. Most specific first.
pub const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("div.page-item-detail", "h3 a"),
    ("div.page-listing-item", "h3 a"),
    ("div.listupd article.bs", "a"),
    ("div.listupd .bsx", "a"),
    ("div.items article.item", "a"),
    ("article.animpost", "a"),
    ("div.post-show li", "a"),
    ("div.c-tabs-item__content", "h3 a"),
    ("article.bs", "a"),
    ("div.bsx", "a"),
    ("div.post-item", "h2 a"),
];

const NEXT_PAGE_SELECTORS: &[&str] = &[
    "a.next.page-numbers",
    "div.pagination a.next",
    "div.hpage a.r",
    "a.nextpostslink",
    "div.nav-links a.next",
    "a[rel='next']",
    "link[rel='next']",
    "ul.pagination li.next a",
    "a.arrow_pag[href]",
];

const NAVIGATION_WORDS: &[&str] = &[
    "next", "prev", "previous", "home", "menu", "search", "login", "register", "selanjutnya",
    "sebelumnya", "lihat semua", "view all",
];

/// How an item's slug is derived from its link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugRule {
    /// Last path segment of the link
    Path,
    /// The link points at a unit page; strip the episode/chapter suffix
    SeriesFromUnit,
    /// Everything after the given path prefix, e.g. `123/one-piece`
    PathAfter(&'static str),
}

#[derive(Debug, Clone)]
pub struct ListingContext<'a> {
    pub source: &'a str,
    pub base_url: &'a str,
    pub content_type: ContentType,
    pub slug_rule: SlugRule,
}

/// `None` when the text is empty or a navigation label.
pub fn clean_title(raw: &str) -> Option<String> {
    let title = super::text::clean_text(raw);
    if title.is_empty() || title.chars().all(|c| !c.is_alphanumeric()) {
        return None;
    }
    if NAVIGATION_WORDS.contains(&title.to_lowercase().as_str()) {
        return None;
    }
    Some(title)
}

fn title_chain(link_sel: &str) -> FieldChain {
    FieldChain::new("title")
        .text("div.tt h2")
        .text("h2.entry-title")
        .text("div.title h2")
        .text(link_sel)
        .text("h3")
        .text("h2")
        .attr("a[title]", "title")
        .attr("img[alt]", "alt")
}

fn poster_chain() -> FieldChain {
    FieldChain::new("poster").attrs("img", &["data-src", "data-lazy-src", "src"])
}

fn latest_unit_chain() -> FieldChain {
    FieldChain::new("latest_unit")
        .text("span.epx")
        .text("div.epz")
        .text("span.episode")
        .text("span.chapter")
        .text("div.chapter-item a")
        .text("div.adds .epxs")
}

fn rating_chain() -> FieldChain {
    FieldChain::new("rating")
        .text("div.numscore")
        .text("span.score")
        .text("div.rating span")
        .text("div.score")
}

fn status_chain() -> FieldChain {
    FieldChain::new("status")
        .text("div.status")
        .text("span.status")
        .text("div.limit .status")
}

fn item_from_container(
    ctx: &ListingContext<'_>,
    container: ElementRef<'_>,
    link_sel: &Selector,
    link_label: &str,
) -> Option<CatalogItem> {
    let link = container.select(link_sel).next()?;
    let href = link.value().attr("href").map(str::trim).filter(|h| !h.is_empty())?;
    let url = absolute_url(ctx.base_url, href);

    let slug = match ctx.slug_rule {
        SlugRule::Path => slug_from_url(&url),
        SlugRule::SeriesFromUnit => series_slug_from_url(&url),
        SlugRule::PathAfter(marker) => slug_after(&url, marker),
    };
    if slug.is_empty() {
        return None;
    }

    let title = clean_title(&title_chain(link_label).resolve(container))?;

    let mut item = CatalogItem::new(ctx.source, slug, ctx.content_type);
    item.title = title;
    item.source_url = url;
    item.poster = poster_chain()
        .find(container)
        .map(|p| absolute_url(ctx.base_url, &p))
        .unwrap_or_default();
    item.latest_unit = latest_unit_chain().resolve(container);
    item.rating = rating_chain().resolve(container);
    item.status = status_chain().resolve(container);
    item.genres = ListChain::new("genres").text("a[rel='tag']").resolve(container);
    Some(item)
}

/// Items found with the first matching pattern, de-duplicated by slug.
pub fn extract_listing(
    doc: &Html,
    ctx: &ListingContext<'_>,
    patterns: &[(&str, &str)],
) -> Vec<CatalogItem> {
    for (container_sel, link_sel) in patterns {
        let (Ok(container), Ok(link)) = (Selector::parse(container_sel), Selector::parse(link_sel))
        else {
            log::warn!(
                "[{}] Skipping invalid listing pattern {} / {}",
                ctx.source,
                container_sel,
                link_sel
            );
            continue;
        };

        let mut seen = HashSet::new();
        let items: Vec<CatalogItem> = doc
            .select(&container)
            .filter_map(|el| item_from_container(ctx, el, &link, link_sel))
            .filter(|item| seen.insert(item.slug.clone()))
            .collect();

        if !items.is_empty() {
            log::debug!(
                "[{}] {} items using pattern {} / {}",
                ctx.source,
                items.len(),
                container_sel,
                link_sel
            );
            return items;
        }
    }
    log::debug!("[{}] No listing pattern matched", ctx.source);
    Vec::new()
}

/// Whether the page shows a "next page" affordance.
pub fn has_next_page(doc: &Html) -> bool {
    let structural = NEXT_PAGE_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .any(|sel| doc.select(&sel).next().is_some());
    if structural {
        return true;
    }

    // Pagination without classes: look for a labelled link inside a pager.
    let pager = ".pagination a, .page-numbers, .nav-links a, .hpage a";
    let Ok(pager_links) = Selector::parse(pager) else {
        return false;
    };
    doc.select(&pager_links).any(|a| {
        let label = super::text::element_text(a).to_lowercase();
        label.starts_with("next")
            || label.starts_with("selanjutnya")
            || label == "»"
            || label == "›"
    })
}
