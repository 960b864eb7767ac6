//! Client-rendered sites
//!
//! Listings and detail pages only contain their items after scripts run, so
//! they go through the [`RenderingDriver`](crate::browser::RenderingDriver):
//! "load more" is clicked until it disappears, then the page is scrolled
//! until the item count stops growing. Episode pages are fetched statically
//! first; the player is only filled in by scripts, so servers usually come
//! from rendered server switching.

use super::{expand, SourceAdapter, SourceContext};
use crate::browser::Interaction;
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::text::{element_text, extract_number};
use crate::extract::{
    absolute_url, extract_listing, has_next_page, slug_after, slug_from_url, sort_units_ascending,
    unit_number, FieldChain, ListChain, ListingContext, SlugRule,
};
use crate::models::{CatalogItem, ContentDetail, Genre, PagedResult, SourceInfo, Unit, UnitStream};
use crate::stream::{RenderedServers, StreamResolver};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SpaOptions {
    pub latest_path: &'static str,
    pub search_path: &'static str,
    /// Receives multi-segment slugs such as `123/one-piece`
    pub detail_path: &'static str,
    pub unit_path: &'static str,
    pub genre_index_path: &'static str,
    pub genre_path: &'static str,
    /// Path prefix that starts every series and episode slug
    pub slug_prefix: &'static str,
    pub item_selector: &'static str,
    pub link_selector: &'static str,
    pub load_more_selector: &'static str,
    pub server_option_selector: &'static str,
    pub player_frame_selector: &'static str,
}

pub struct Spa {
    ctx: SourceContext,
    options: SpaOptions,
    resolver: StreamResolver,
}

impl Spa {
    pub fn new(ctx: SourceContext, options: SpaOptions) -> Self {
        let resolver = StreamResolver::new(&ctx.name).with_rendered(RenderedServers {
            option_selector: options.server_option_selector.to_string(),
            frame_selector: options.player_frame_selector.to_string(),
        });
        Self {
            ctx,
            options,
            resolver,
        }
    }

    fn listing_interactions(&self) -> Vec<Interaction> {
        vec![
            Interaction::LoadMore {
                button: self.options.load_more_selector.to_string(),
            },
            Interaction::ScrollUntilStable {
                item_selector: self.options.item_selector.to_string(),
            },
        ]
    }

    async fn fetch_listing(&self, path: String) -> ScrapeResult<PagedResult<CatalogItem>> {
        let url = self.ctx.url(&path);
        let html = self
            .ctx
            .renderer()?
            .render_html(&url, self.listing_interactions())
            .await?;

        let doc = Html::parse_document(&html);
        let ctx = ListingContext {
            source: &self.ctx.name,
            base_url: &self.ctx.base_url,
            content_type: self.ctx.content_type,
            slug_rule: SlugRule::PathAfter(self.options.slug_prefix),
        };
        let pattern = (self.options.item_selector, self.options.link_selector);
        let items = extract_listing(&doc, &ctx, &[pattern]);
        log::debug!("[{}] rendered listing {} has {} items", self.ctx.name, url, items.len());
        Ok(PagedResult::new(items, has_next_page(&doc)))
    }

    async fn fetch_detail(&self, slug: &str) -> ScrapeResult<ContentDetail> {
        let url = self.ctx.url(&expand(self.options.detail_path, &[("slug", slug)]));
        let html = self.ctx.renderer()?.render_html(&url, Vec::new()).await?;
        parse_detail(&self.ctx, self.options.slug_prefix, slug, &url, &html)
    }

    async fn fetch_stream(&self, unit_slug: &str) -> ScrapeResult<UnitStream> {
        let driver = self.ctx.renderer()?;
        let url = self.ctx.url(&expand(self.options.unit_path, &[("slug", unit_slug)]));
        let html = self.ctx.get_html(&url).await?;

        let title = {
            let doc = Html::parse_document(&html);
            FieldChain::new("title")
                .text("div.breadcrumb__links h6")
                .text("h1")
                .text("title")
                .resolve_doc(&doc)
        };
        let servers = self
            .resolver
            .resolve(&html, &url, &self.ctx.base_url, &self.ctx.fetcher, Some(driver))
            .await;

        let mut stream = UnitStream::empty(&self.ctx.name, unit_slug);
        stream.title = title;
        stream.servers = servers;
        Ok(stream)
    }

    async fn fetch_genres(&self) -> ScrapeResult<Vec<Genre>> {
        let html = self.ctx.get_html(&self.ctx.url(self.options.genre_index_path)).await?;
        Ok(parse_genres(&html))
    }
}

pub(crate) fn parse_detail(
    ctx: &SourceContext,
    slug_prefix: &str,
    slug: &str,
    url: &str,
    html: &str,
) -> ScrapeResult<ContentDetail> {
    let doc = Html::parse_document(html);

    let title = FieldChain::new("title")
        .text("div.anime__details__title h3")
        .attr("meta[property='og:title']", "content")
        .text("h1")
        .resolve_doc(&doc);
    if title.is_empty() {
        log::warn!("[{}] no title on {}", ctx.name, url);
        return Err(ScrapeError::NotFound(format!("{} has no title", url)));
    }

    let info = "div.anime__details__widget ul li";
    let mut item = CatalogItem::new(&ctx.name, slug.to_string(), ctx.content_type);
    item.title = title;
    item.source_url = url.to_string();
    item.poster = FieldChain::new("poster")
        .attr("div.anime__details__pic", "data-setbg")
        .attr("meta[property='og:image']", "content")
        .find_doc(&doc)
        .map(|p| absolute_url(&ctx.base_url, &p))
        .unwrap_or_default();
    item.status = FieldChain::new("status").labelled(info, &["status"]).resolve_doc(&doc);
    item.rating = FieldChain::new("rating")
        .labelled(info, &["skor", "score"])
        .text("div.anime__details__rating span")
        .find_doc(&doc)
        .and_then(|r| extract_number(&r))
        .unwrap_or_default();
    item.genres = ListChain::new("genres")
        .text("div.anime__details__widget a[href*='/genre/']")
        .resolve_doc(&doc);

    let units = parse_units(ctx, slug_prefix, &doc);
    item.latest_unit = units.last().map(|u| u.number.clone()).unwrap_or_default();

    Ok(ContentDetail {
        synopsis: FieldChain::new("synopsis")
            .text("div.anime__details__text p")
            .attr("meta[name='description']", "content")
            .or_default("No synopsis available")
            .resolve_doc(&doc),
        alternate_titles: FieldChain::new("alternate_titles")
            .text("div.anime__details__title span")
            .labelled(info, &["sinonim", "synonyms"])
            .find_doc(&doc)
            .map(|t| t.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default(),
        studio: FieldChain::new("studio").labelled(info, &["studio"]).resolve_doc(&doc),
        author: String::new(),
        release_info: FieldChain::new("release_info")
            .labelled(info, &["tayang", "aired", "musim"])
            .resolve_doc(&doc),
        units,
        item,
    })
}

/// Episode links anywhere on the rendered page
fn parse_units(ctx: &SourceContext, slug_prefix: &str, doc: &Html) -> Vec<Unit> {
    let Ok(sel) = Selector::parse("a[href*='/episode/']") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut units: Vec<Unit> = doc
        .select(&sel)
        .filter_map(|a| {
            let url = absolute_url(&ctx.base_url, a.value().attr("href")?);
            if !seen.insert(url.clone()) {
                return None;
            }
            let title = element_text(a);
            Some(Unit {
                source: ctx.name.clone(),
                slug: slug_after(&url, slug_prefix),
                number: unit_number(&title, &url),
                title,
                source_url: url,
                date: None,
            })
        })
        .collect();
    sort_units_ascending(&mut units);
    units
}

pub(crate) fn parse_genres(html: &str) -> Vec<Genre> {
    let doc = Html::parse_document(html);
    let Ok(links) = Selector::parse("a[href*='/properties/genre/']") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    doc.select(&links)
        .filter_map(|a| {
            let slug = slug_from_url(a.value().attr("href")?);
            let name = element_text(a);
            (!slug.is_empty() && !name.is_empty() && seen.insert(slug.clone()))
                .then_some(Genre { name, slug })
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for Spa {
    fn info(&self) -> SourceInfo {
        self.ctx.info()
    }

    async fn list_latest(&self, page: u32) -> ScrapeResult<PagedResult<CatalogItem>> {
        let path = expand(self.options.latest_path, &[("page", page.to_string().as_str())]);
        let key = self.ctx.key("latest").arg(page);
        self.ctx
            .cached(key, self.ctx.ttls.latest, || self.fetch_listing(path))
            .await
    }

    async fn search(&self, query: &str, page: u32) -> ScrapeResult<PagedResult<CatalogItem>> {
        let path = expand(
            self.options.search_path,
            &[("page", page.to_string().as_str()), ("query", &*urlencoding::encode(query))],
        );
        let key = self.ctx.key("search").arg(query).arg(page);
        self.ctx
            .cached(key, self.ctx.ttls.search, || self.fetch_listing(path))
            .await
    }

    async fn get_detail(&self, slug: &str) -> ScrapeResult<ContentDetail> {
        let key = self.ctx.key("detail").arg(slug);
        self.ctx
            .cached(key, self.ctx.ttls.detail, || self.fetch_detail(slug))
            .await
    }

    async fn get_stream(&self, unit_slug: &str) -> ScrapeResult<UnitStream> {
        let key = self.ctx.key("stream").arg(unit_slug);
        self.ctx
            .cached(key, self.ctx.ttls.stream, || self.fetch_stream(unit_slug))
            .await
    }

    async fn list_genres(&self) -> ScrapeResult<Vec<Genre>> {
        let key = self.ctx.key("genres");
        self.ctx
            .cached(key, self.ctx.ttls.genre, || self.fetch_genres())
            .await
    }

    async fn list_by_genre(
        &self,
        genre: &str,
        page: u32,
    ) -> ScrapeResult<PagedResult<CatalogItem>> {
        let path = expand(
            self.options.genre_path,
            &[("genre", genre), ("page", page.to_string().as_str())],
        );
        let key = self.ctx.key("genre").arg(genre).arg(page);
        self.ctx
            .cached(key, self.ctx.ttls.genre, || self.fetch_listing(path))
            .await
    }
}
