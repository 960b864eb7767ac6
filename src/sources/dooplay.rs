//! DooPlay theme
//!
//! Player buttons carry `data-post`/`data-nume`/`data-type` and are resolved
//! through `admin-ajax.php` (`doo_player_ajax`). Films have no episode list;
//! the film page itself is their only unit.

use super::{expand, SourceAdapter, SourceContext};
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::listing::clean_title;
use crate::extract::text::{element_text, extract_number};
use crate::extract::{
    absolute_url, extract_listing, has_next_page, series_slug_from_url, slug_from_url,
    sort_units_ascending, unit_number, FieldChain, ListChain, ListingContext, SlugRule,
    DEFAULT_PATTERNS,
};
use crate::models::{
    CatalogItem, ContentDetail, ContentType, DaySchedule, Genre, PagedResult, ScheduleEntry,
    SourceInfo, Unit, UnitStream,
};
use crate::stream::{DeferredEndpoint, StreamResolver};
use async_trait::async_trait;
use chrono::Weekday;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

static CLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2})[:.](\d{2})").unwrap());

const PATTERNS: &[(&str, &str)] = &[
    ("div.items article.item", "div.data h3 a"),
    ("div.result-item article", "div.title a"),
    ("div.post-show li", "h2.entry-title a"),
    ("div.animepost", "a"),
];

#[derive(Debug, Clone)]
pub struct DooPlayOptions {
    pub latest_path: &'static str,
    /// Latest-release pages often link to episodes rather than series
    pub latest_slug_rule: SlugRule,
    pub search_path: &'static str,
    pub detail_path: &'static str,
    pub unit_path: &'static str,
    pub genre_index_path: &'static str,
    pub genre_path: &'static str,
    pub schedule_path: Option<&'static str>,
}

impl Default for DooPlayOptions {
    fn default() -> Self {
        Self {
            latest_path: "/episodes/page/{page}/",
            latest_slug_rule: SlugRule::SeriesFromUnit,
            search_path: "/page/{page}/?s={query}",
            detail_path: "/tvshows/{slug}/",
            unit_path: "/episodes/{slug}/",
            genre_index_path: "/",
            genre_path: "/genre/{genre}/page/{page}/",
            schedule_path: None,
        }
    }
}

pub struct DooPlay {
    ctx: SourceContext,
    options: DooPlayOptions,
    resolver: StreamResolver,
}

impl DooPlay {
    pub fn new(ctx: SourceContext, options: DooPlayOptions) -> Self {
        let resolver = StreamResolver::new(&ctx.name).with_deferred(DeferredEndpoint::dooplay());
        Self {
            ctx,
            options,
            resolver,
        }
    }

    async fn fetch_listing(
        &self,
        path: String,
        slug_rule: SlugRule,
    ) -> ScrapeResult<PagedResult<CatalogItem>> {
        let html = self.ctx.get_html(&self.ctx.url(&path)).await?;
        let doc = Html::parse_document(&html);
        let ctx = ListingContext {
            source: &self.ctx.name,
            base_url: &self.ctx.base_url,
            content_type: self.ctx.content_type,
            slug_rule,
        };
        let mut items = extract_listing(&doc, &ctx, PATTERNS);
        if items.is_empty() {
            items = extract_listing(&doc, &ctx, DEFAULT_PATTERNS);
        }
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
                .text("h1.epih1")
                .text("div.data h1")
                .text("h1.entry-title")
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

    async fn fetch_schedule(&self, path: &str) -> ScrapeResult<Vec<DaySchedule>> {
        let html = self.ctx.get_html(&self.ctx.url(path)).await?;
        Ok(parse_schedule(&self.ctx.name, &self.ctx.base_url, &html))
    }

    async fn fetch_genres(&self) -> ScrapeResult<Vec<Genre>> {
        let html = self.ctx.get_html(&self.ctx.url(self.options.genre_index_path)).await?;
        Ok(parse_genres(&html))
    }
}

/// `Label value` pairs of DooPlay's `div.custom_fields` blocks
fn custom_field(
    labels: &'static [&'static str],
) -> impl for<'a> Fn(ElementRef<'a>) -> Option<String> + Send + Sync {
    move |scope| {
        let rows = Selector::parse("div.custom_fields").ok()?;
        let key = Selector::parse("b.variante").ok()?;
        let value = Selector::parse("span.valor").ok()?;
        scope.select(&rows).find_map(|row| {
            let name = row.select(&key).next().map(element_text)?.to_lowercase();
            labels
                .iter()
                .any(|l| name == *l)
                .then(|| row.select(&value).next().map(element_text))
                .flatten()
        })
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
        .text("div.sheader div.data h1")
        .text("div.infox h1.entry-title")
        .text("h1.entry-title")
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
        .attrs("div.sheader div.poster img", &["data-src", "src"])
        .attrs("div.thumb img", &["data-src", "src"])
        .attr("meta[property='og:image']", "content")
        .find_doc(&doc)
        .map(|p| absolute_url(&ctx.base_url, &p))
        .unwrap_or_default();
    item.status = FieldChain::new("status")
        .with_fn("custom_fields[status]", custom_field(&["status"]))
        .labelled("div.spe span", &["status"])
        .resolve_doc(&doc);
    item.rating = FieldChain::new("rating")
        .text("span.dt_rating_vgs")
        .text("div.starstruck-rating span.rating-number")
        .text("span[itemprop='ratingValue']")
        .find_doc(&doc)
        .and_then(|r| extract_number(&r))
        .unwrap_or_default();
    item.genres = ListChain::new("genres")
        .text("div.sgeneros a")
        .text("div.genre-info a")
        .resolve_doc(&doc);

    let mut units = parse_units(ctx, &doc);
    if units.is_empty() && ctx.content_type == ContentType::Film {
        units.push(Unit {
            source: ctx.name.clone(),
            slug: slug.to_string(),
            number: "1".to_string(),
            title: item.title.clone(),
            source_url: url.to_string(),
            date: None,
        });
    }
    item.latest_unit = units.last().map(|u| u.number.clone()).unwrap_or_default();

    Ok(ContentDetail {
        synopsis: FieldChain::new("synopsis")
            .text("div#info div.wp-content")
            .text("div.wp-content")
            .text("div[itemprop='description']")
            .text("div.entry-content.entry-content-single")
            .or_default("No synopsis available")
            .resolve_doc(&doc),
        alternate_titles: FieldChain::new("alternate_titles")
            .with_fn(
                "custom_fields[original title]",
                custom_field(&["original title", "judul alternatif"]),
            )
            .labelled("div.spe span", &["japanese", "english", "synonyms"])
            .find_doc(&doc)
            .map(|t| vec![t])
            .unwrap_or_default(),
        studio: FieldChain::new("studio")
            .labelled("div.spe span", &["studio", "studios"])
            .with_fn("custom_fields[studio]", custom_field(&["studio"]))
            .resolve_doc(&doc),
        author: FieldChain::new("director")
            .text("div#cast div.person[itemprop='director'] div.name a")
            .resolve_doc(&doc),
        release_info: FieldChain::new("release_info")
            .text("div.extra span.date")
            .labelled("div.spe span", &["released", "rilis", "aired"])
            .with_fn(
                "custom_fields[first air date]",
                custom_field(&["first air date", "release date"]),
            )
            .resolve_doc(&doc),
        units,
        item,
    })
}

fn parse_units(ctx: &SourceContext, doc: &Html) -> Vec<Unit> {
    let Ok(rows) = Selector::parse("ul.episodios li, div.lstepsiode ul li") else {
        return Vec::new();
    };
    let link_chain = FieldChain::new("unit_link")
        .attr("div.episodiotitle a", "href")
        .attr("span.lchx a", "href")
        .attr("a[href]", "href");

    let mut units: Vec<Unit> = doc
        .select(&rows)
        .filter_map(|row| {
            let href = absolute_url(&ctx.base_url, &link_chain.find(row)?);
            let title = FieldChain::new("unit_title")
                .text("div.episodiotitle a")
                .text("span.lchx a")
                .resolve(row);
            // "1 - 12" is season 1, episode 12
            let number = FieldChain::new("unit_number")
                .text("div.numerando")
                .text("span.eps")
                .find(row)
                .and_then(|n| n.rsplit('-').next().and_then(extract_number))
                .unwrap_or_else(|| unit_number(&title, &href));
            let date = FieldChain::new("unit_date").text("span.date").find(row);
            Some(Unit {
                source: ctx.name.clone(),
                slug: slug_from_url(&href),
                number,
                title,
                source_url: href,
                date,
            })
        })
        .collect();
    sort_units_ascending(&mut units);
    units
}

pub fn parse_weekday(label: &str) -> Option<Weekday> {
    let l = label.to_lowercase();
    let table: &[(&[&str], Weekday)] = &[
        (&["senin", "monday"], Weekday::Mon),
        (&["selasa", "tuesday"], Weekday::Tue),
        (&["rabu", "wednesday"], Weekday::Wed),
        (&["kamis", "thursday"], Weekday::Thu),
        (&["jumat", "jum'at", "friday"], Weekday::Fri),
        (&["sabtu", "saturday"], Weekday::Sat),
        (&["minggu", "ahad", "sunday"], Weekday::Sun),
    ];
    table
        .iter()
        .find(|(names, _)| names.iter().any(|n| l.contains(n)))
        .map(|(_, day)| *day)
}

fn clock(text: &str) -> String {
    CLOCK
        .captures(text)
        .and_then(|c| {
            let h: u32 = c[1].parse().ok()?;
            let m: u32 = c[2].parse().ok()?;
            (h < 24 && m < 60).then(|| format!("{:02}:{:02}", h, m))
        })
        .unwrap_or_default()
}

/// Release schedule grouped by day, Monday first. Days without entries are
/// left out.
pub(crate) fn parse_schedule(source: &str, base_url: &str, html: &str) -> Vec<DaySchedule> {
    let doc = Html::parse_document(html);
    let (Ok(blocks), Ok(entries), Ok(link)) = (
        Selector::parse("div.schedule-day, div.tab-pane, div.schedule_block"),
        Selector::parse("div.animepost, div.schedule-item, li"),
        Selector::parse("a[href]"),
    ) else {
        return Vec::new();
    };

    let heading = FieldChain::new("day")
        .attr("*[data-day]", "data-day")
        .text("h2")
        .text("h3")
        .text("span.day-name");
    let title = FieldChain::new("schedule_title")
        .text("div.title")
        .text("h4")
        .attr("a[title]", "title")
        .text("a");
    let time = FieldChain::new("release_time")
        .text("span.time")
        .text("div.ltseps")
        .text("span.btime");
    let poster = FieldChain::new("poster").attrs("img", &["data-src", "src"]);

    let mut days: BTreeMap<u32, DaySchedule> = BTreeMap::new();
    for block in doc.select(&blocks) {
        let label = block
            .value()
            .attr("data-day")
            .or_else(|| block.value().attr("id"))
            .map(str::to_string)
            .or_else(|| heading.find(block))
            .unwrap_or_default();
        let Some(day) = parse_weekday(&label) else {
            continue;
        };

        let mut seen = HashSet::new();
        for entry in block.select(&entries) {
            let Some(href) = entry.select(&link).next().and_then(|a| a.value().attr("href")) else {
                continue;
            };
            let url = absolute_url(base_url, href);
            let slug = series_slug_from_url(&url);
            let Some(name) = clean_title(&title.resolve(entry)) else {
                continue;
            };
            if slug.is_empty() || !seen.insert(slug.clone()) {
                continue;
            }
            days.entry(day.num_days_from_monday())
                .or_insert_with(|| DaySchedule {
                    day,
                    entries: Vec::new(),
                })
                .entries
                .push(ScheduleEntry {
                    source: source.to_string(),
                    title: name,
                    slug,
                    release_time: clock(&time.resolve(entry)),
                    day,
                    poster: poster
                        .find(entry)
                        .map(|p| absolute_url(base_url, &p))
                        .unwrap_or_default(),
                });
        }
    }
    days.into_values().collect()
}

pub(crate) fn parse_genres(html: &str) -> Vec<Genre> {
    let doc = Html::parse_document(html);
    let Ok(links) = Selector::parse("nav.genres ul li a, ul.genres li a, a[href*='/genre/']") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    doc.select(&links)
        .filter_map(|a| {
            let slug = slug_from_url(a.value().attr("href")?);
            // Genre links often carry a post count: "Action 120"
            let name = element_text(a)
                .trim_end_matches(|c: char| c.is_ascii_digit() || c.is_whitespace())
                .to_string();
            (!slug.is_empty() && !name.is_empty() && seen.insert(slug.clone()))
                .then_some(Genre { name, slug })
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for DooPlay {
    fn info(&self) -> SourceInfo {
        self.ctx.info()
    }

    async fn list_latest(&self, page: u32) -> ScrapeResult<PagedResult<CatalogItem>> {
        let path = expand(self.options.latest_path, &[("page", page.to_string().as_str())]);
        let key = self.ctx.key("latest").arg(page);
        self.ctx
            .cached(key, self.ctx.ttls.latest, || {
                self.fetch_listing(path, self.options.latest_slug_rule)
            })
            .await
    }

    async fn search(&self, query: &str, page: u32) -> ScrapeResult<PagedResult<CatalogItem>> {
        let path = expand(
            self.options.search_path,
            &[("page", page.to_string().as_str()), ("query", &*urlencoding::encode(query))],
        );
        let key = self.ctx.key("search").arg(query).arg(page);
        self.ctx
            .cached(key, self.ctx.ttls.search, || self.fetch_listing(path, SlugRule::Path))
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

    async fn get_schedule(&self) -> ScrapeResult<Vec<DaySchedule>> {
        let Some(path) = self.options.schedule_path else {
            return Ok(Vec::new());
        };
        let key = self.ctx.key("schedule");
        self.ctx
            .cached(key, self.ctx.ttls.schedule, || self.fetch_schedule(path))
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
            .cached(key, self.ctx.ttls.genre, || self.fetch_listing(path, SlugRule::Path))
            .await
    }
}
