//! WordPress "AnimeStream" theme
//!
//! Listings use `div.listupd article.bs`, detail pages an `eplister` with
//! newest episodes first, and episode pages a `select.mirror` whose options
//! hold base64-encoded iframes.

use super::{expand, SourceAdapter, SourceContext};
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::text::{element_text, extract_number};
use crate::extract::{
    absolute_url, extract_listing, has_next_page, slug_from_url, sort_units_ascending, unit_number,
    FieldChain, ListChain, ListingContext, SlugRule, DEFAULT_PATTERNS,
};
use crate::models::{
    CatalogItem, ContentDetail, Genre, PagedResult, SourceInfo, Unit, UnitStream,
};
use crate::stream::StreamResolver;
use async_trait::async_trait;
use scraper::{Html, Selector};

/// Site-relative URL templates
#[derive(Debug, Clone)]
pub struct AnimeStreamOptions {
    pub latest_path: &'static str,
    pub search_path: &'static str,
    pub detail_path: &'static str,
    pub unit_path: &'static str,
    pub genre_index_path: &'static str,
    pub genre_path: &'static str,
}

impl Default for AnimeStreamOptions {
    fn default() -> Self {
        Self {
            latest_path: "/anime/?order=update&page={page}",
            search_path: "/page/{page}/?s={query}",
            detail_path: "/anime/{slug}/",
            unit_path: "/{slug}/",
            genre_index_path: "/anime/",
            genre_path: "/genres/{genre}/page/{page}/",
        }
    }
}

pub struct AnimeStream {
    ctx: SourceContext,
    options: AnimeStreamOptions,
    resolver: StreamResolver,
}

impl AnimeStream {
    pub fn new(ctx: SourceContext, options: AnimeStreamOptions) -> Self {
        let resolver = StreamResolver::new(&ctx.name);
        Self {
            ctx,
            options,
            resolver,
        }
    }

    fn listing_context(&self) -> ListingContext<'_> {
        ListingContext {
            source: &self.ctx.name,
            base_url: &self.ctx.base_url,
            content_type: self.ctx.content_type,
            slug_rule: SlugRule::Path,
        }
    }

    async fn fetch_listing(&self, path: String) -> ScrapeResult<PagedResult<CatalogItem>> {
        let html = self.ctx.get_html(&self.ctx.url(&path)).await?;
        let doc = Html::parse_document(&html);
        let items = extract_listing(&doc, &self.listing_context(), DEFAULT_PATTERNS);
        Ok(PagedResult::new(items, has_next_page(&doc)))
    }

    async fn fetch_detail(&self, slug: &str) -> ScrapeResult<ContentDetail> {
        let url = self.ctx.url(&expand(self.options.detail_path, &[("slug", slug)]));
        let html = self.ctx.get_html(&url).await?;
        parse_detail(&self.ctx, slug, &url, &html)
    }

    async fn fetch_stream(&self, unit_slug: &str) -> ScrapeResult<UnitStream> {
        let url = self.ctx.url(&expand(self.options.unit_path, &[("slug", unit_slug)]));
        let html = self.ctx.get_html(&url).await?;

        let title = {
            let doc = Html::parse_document(&html);
            FieldChain::new("title")
                .text("h1.entry-title")
                .text("div.title-section h1")
                .text("title")
                .resolve_doc(&doc)
        };
        let servers = self
            .resolver
            .resolve(&html, &url, &self.ctx.base_url, &self.ctx.fetcher, None)
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
    slug: &str,
    url: &str,
    html: &str,
) -> ScrapeResult<ContentDetail> {
    let doc = Html::parse_document(html);

    let title = FieldChain::new("title")
        .text("h1.entry-title")
        .text("div.infox h1")
        .attr("meta[property='og:title']", "content")
        .resolve_doc(&doc);
    if title.is_empty() {
        log::warn!("[{}] no title on {}", ctx.name, url);
        return Err(ScrapeError::NotFound(format!("{} has no title", url)));
    }

    let mut item = CatalogItem::new(&ctx.name, slug.to_string(), ctx.content_type);
    item.title = title;
    item.source_url = url.to_string();
    item.poster = FieldChain::new("poster")
        .attrs("div.thumb img", &["data-src", "src"])
        .attrs("div.bigcontent img", &["data-src", "src"])
        .attr("meta[property='og:image']", "content")
        .find_doc(&doc)
        .map(|p| absolute_url(&ctx.base_url, &p))
        .unwrap_or_default();
    item.status = FieldChain::new("status")
        .labelled("div.spe span", &["status"])
        .resolve_doc(&doc);
    item.rating = FieldChain::new("rating")
        .text("div.rating strong")
        .text("span.ratingValue")
        .find_doc(&doc)
        .and_then(|r| extract_number(&r))
        .unwrap_or_default();
    item.genres = ListChain::new("genres")
        .text("div.genxed a")
        .text("span.mgen a")
        .resolve_doc(&doc);

    let units = parse_units(ctx, &doc);
    item.latest_unit = units.last().map(|u| u.number.clone()).unwrap_or_default();

    Ok(ContentDetail {
        synopsis: FieldChain::new("synopsis")
            .text("div.entry-content[itemprop='description']")
            .text("div.synp div.entry-content")
            .text("div.desc")
            .or_default("No synopsis available")
            .resolve_doc(&doc),
        alternate_titles: FieldChain::new("alternate_titles")
            .text("span.alter")
            .find_doc(&doc)
            .map(|alt| {
                alt.split([',', ';'])
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        studio: FieldChain::new("studio")
            .labelled("div.spe span", &["studio", "studios"])
            .resolve_doc(&doc),
        author: String::new(),
        release_info: FieldChain::new("release_info")
            .labelled("div.spe span", &["released", "dirilis", "aired", "tayang"])
            .resolve_doc(&doc),
        units,
        item,
    })
}

fn parse_units(ctx: &SourceContext, doc: &Html) -> Vec<Unit> {
    let Ok(rows) = Selector::parse("div.eplister ul li, div.episodelist ul li") else {
        return Vec::new();
    };
    let Ok(link) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut units: Vec<Unit> = doc
        .select(&rows)
        .filter_map(|row| {
            let a = row.select(&link).next()?;
            let href = absolute_url(&ctx.base_url, a.value().attr("href")?);
            let title = FieldChain::new("unit_title")
                .text("div.epl-title")
                .text("span.lchx")
                .resolve(row);
            let number = FieldChain::new("unit_number")
                .text("div.epl-num")
                .find(row)
                .and_then(|n| extract_number(&n))
                .unwrap_or_else(|| unit_number(&title, &href));
            let date = FieldChain::new("unit_date")
                .text("div.epl-date")
                .text("span.date")
                .find(row);
            Some(Unit {
                source: ctx.name.clone(),
                slug: slug_from_url(&href),
                number,
                title: if title.is_empty() { element_text(a) } else { title },
                source_url: href,
                date,
            })
        })
        .collect();
    sort_units_ascending(&mut units);
    units
}

pub(crate) fn parse_genres(html: &str) -> Vec<Genre> {
    let doc = Html::parse_document(html);
    let mut genres = Vec::new();

    if let (Ok(rows), Ok(input), Ok(label)) = (
        Selector::parse("ul.genrez li"),
        Selector::parse("input[value]"),
        Selector::parse("label"),
    ) {
        for row in doc.select(&rows) {
            let slug = row.select(&input).next().and_then(|i| i.value().attr("value"));
            let name = row.select(&label).next().map(element_text);
            if let (Some(slug), Some(name)) = (slug, name) {
                genres.push(Genre {
                    name,
                    slug: slug.to_string(),
                });
            }
        }
    }

    if genres.is_empty() {
        if let Ok(links) = Selector::parse("a[href*='/genres/']") {
            let mut seen = std::collections::HashSet::new();
            for a in doc.select(&links) {
                let slug = a.value().attr("href").map(slug_from_url).unwrap_or_default();
                let name = element_text(a);
                if !slug.is_empty() && !name.is_empty() && seen.insert(slug.clone()) {
                    genres.push(Genre { name, slug });
                }
            }
        }
    }
    genres
}

#[async_trait]
impl SourceAdapter for AnimeStream {
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
