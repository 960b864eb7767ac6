//! Madara (WP-Manga) theme, used by comic and novel sites.
//!
//! Chapter lists come in several shapes depending on theme version and
//! plugin settings, so they are tried in order:
//!
//! 1. known chapter list selectors
//! 2. the "read first / read last" buttons, expanded into a range
//! 3. the `manga_get_chapters` AJAX endpoint
//! 4. a scan of every chapter-like anchor on the page
//!
//! Unit slugs are `series/chapter` so a chapter can be fetched without
//! knowing its series page.

use super::{expand, SourceAdapter, SourceContext};
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::listing::clean_title;
use crate::extract::text::{element_text, extract_number, first_attr};
use crate::extract::{
    absolute_url, extract_listing, has_next_page, slug_from_url, sort_units_ascending,
    unit_number, FieldChain, ListChain, ListingContext, SlugRule, DEFAULT_PATTERNS,
};
use crate::models::{
    CatalogItem, ContentDetail, ContentType, Genre, PagedResult, SourceInfo, Unit, UnitStream,
};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

static CHAPTER_IN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"chapter[-/](\d+(?:[.-]\d+)?)").unwrap());
static VOLUME_IN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vol(?:ume)?[-/](\d+)").unwrap());
static MANGA_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"manga_id\s*=\s*(\d+)").unwrap());

/// Widest read-first/read-last span expanded into chapters. Wider spans mean
/// the URLs carry post ids or dates rather than chapter numbers.
const MAX_RANGE_CHAPTERS: u32 = 2000;

const PATTERNS: &[(&str, &str)] = &[
    ("div.page-item-detail", "div.post-title a"),
    ("div.page-item-detail", "h3 a"),
    ("div.c-tabs-item__content", "div.post-title a"),
];

const CHAPTER_SELECTORS: &[&str] = &[
    "li.wp-manga-chapter a",
    "ul.main.version-chap li a",
    "div.listing-chapters_wrap a",
    "div.eplister ul li a",
    "div.bxcl a",
    "div#chapterlist a",
    "div.chapter-list a",
    "ul.chapter-list a",
    "li.chapter a",
    "div.chbox a",
    "ul.clstyle a",
    "ul.version-chap a",
    "div.page-content-listing a[href*='chapter']",
];

const PAGE_SELECTORS: &[&str] = &[
    "div.reading-content div.page-break img",
    "div.reading-content img",
    "div#readerarea img",
    "div.chapter-content img",
];

const TEXT_SELECTORS: &[&str] = &[
    "div.reading-content div.text-left p",
    "div.reading-content p",
    "div.entry-content p",
    "div.chapter-content p",
];

#[derive(Debug, Clone)]
pub struct MadaraOptions {
    pub latest_path: &'static str,
    pub search_path: &'static str,
    pub detail_path: &'static str,
    /// Receives the `series/chapter` unit slug
    pub unit_path: &'static str,
    pub genre_index_path: &'static str,
    pub genre_path: &'static str,
}

impl Default for MadaraOptions {
    fn default() -> Self {
        Self {
            latest_path: "/manga/page/{page}/?m_orderby=latest",
            search_path: "/page/{page}/?s={query}&post_type=wp-manga",
            detail_path: "/manga/{slug}/",
            unit_path: "/manga/{slug}/",
            genre_index_path: "/manga/",
            genre_path: "/manga-genre/{genre}/page/{page}/",
        }
    }
}

pub struct Madara {
    ctx: SourceContext,
    options: MadaraOptions,
}

impl Madara {
    pub fn new(ctx: SourceContext, options: MadaraOptions) -> Self {
        Self { ctx, options }
    }

    async fn fetch_listing(&self, path: String) -> ScrapeResult<PagedResult<CatalogItem>> {
        let html = self.ctx.get_html(&self.ctx.url(&path)).await?;
        let doc = Html::parse_document(&html);
        let ctx = ListingContext {
            source: &self.ctx.name,
            base_url: &self.ctx.base_url,
            content_type: self.ctx.content_type,
            slug_rule: SlugRule::Path,
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
        let (mut detail, manga_id) = parse_detail(&self.ctx, slug, &url, &html)?;

        if detail.units.is_empty() {
            if let Some(id) = manga_id {
                detail.units = self.fetch_ajax_chapters(&url, &id).await;
            }
        }
        if detail.units.is_empty() {
            detail.units = scan_chapter_anchors(&self.ctx, &url, &html);
        }
        if detail.units.is_empty() {
            log::warn!("[{}] no chapters found for {} after all fallbacks", self.ctx.name, url);
        }
        sort_units_ascending(&mut detail.units);
        detail.item.latest_unit = detail.units.last().map(|u| u.number.clone()).unwrap_or_default();
        Ok(detail)
    }

    /// Failures are logged and yield no chapters so the anchor scan still runs.
    async fn fetch_ajax_chapters(&self, series_url: &str, manga_id: &str) -> Vec<Unit> {
        let endpoint = self.ctx.url("/wp-admin/admin-ajax.php");
        let form = [
            ("action".to_string(), "manga_get_chapters".to_string()),
            ("manga".to_string(), manga_id.to_string()),
        ];
        match self.ctx.fetcher.post_form(&endpoint, &form).await {
            Ok(body) => {
                let fragment = Html::parse_fragment(&body);
                let units =
                    chapters_from_anchors(&self.ctx, fragment.root_element(), "a", series_url);
                log::debug!(
                    "[{}] AJAX returned {} chapters for {}",
                    self.ctx.name,
                    units.len(),
                    series_url
                );
                units
            }
            Err(e) => {
                log::warn!("[{}] chapter AJAX failed for {}: {}", self.ctx.name, series_url, e);
                Vec::new()
            }
        }
    }

    async fn fetch_chapter(&self, unit_slug: &str) -> ScrapeResult<UnitStream> {
        let url = self.ctx.url(&expand(self.options.unit_path, &[("slug", unit_slug)]));
        let html = self.ctx.get_html(&url).await?;
        Ok(parse_chapter(&self.ctx, unit_slug, &html))
    }

    async fn fetch_genres(&self) -> ScrapeResult<Vec<Genre>> {
        let html = self.ctx.get_html(&self.ctx.url(self.options.genre_index_path)).await?;
        Ok(parse_genres(&html))
    }
}

/// `series/chapter` from a chapter URL
pub fn chapter_slug(url: &str) -> String {
    let path = Url::parse(url).map(|u| u.path().to_string()).unwrap_or_else(|_| url.to_string());
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., series, chapter] => format!("{}/{}", series, chapter).to_lowercase(),
        [only] => only.to_lowercase(),
        [] => String::new(),
    }
}

fn chapter_label(text: &str, href: &str) -> String {
    let t = text.trim();
    if !t.is_empty() && t != "#" {
        return t.to_string();
    }
    let lower = href.to_lowercase();
    if let Some(cap) = CHAPTER_IN_URL.captures(&lower) {
        return format!("Chapter {}", &cap[1]);
    }
    if let Some(cap) = VOLUME_IN_URL.captures(&lower) {
        return format!("Vol. {}", &cap[1]);
    }
    href.to_string()
}

fn chapter_from_anchor(ctx: &SourceContext, a: ElementRef<'_>, series_url: &str) -> Option<Unit> {
    let href = first_attr(a, &["href", "data-href"])?;
    let url = absolute_url(series_url, &href);
    let label = chapter_label(&element_text(a), &url);
    Some(Unit {
        source: ctx.name.clone(),
        slug: chapter_slug(&url),
        number: unit_number(&label, &url),
        title: label,
        source_url: url,
        date: None,
    })
}

fn chapters_from_anchors(
    ctx: &SourceContext,
    scope: ElementRef<'_>,
    selector: &str,
    series_url: &str,
) -> Vec<Unit> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    scope
        .select(&sel)
        .filter_map(|a| chapter_from_anchor(ctx, a, series_url))
        .filter(|u| seen.insert(u.source_url.clone()))
        .collect()
}

/// Chapters listed directly on the series page, or the range implied by the
/// "read first"/"read last" buttons.
fn listed_chapters(ctx: &SourceContext, doc: &Html, series_url: &str) -> Vec<Unit> {
    for selector in CHAPTER_SELECTORS {
        let units = chapters_from_anchors(ctx, doc.root_element(), selector, series_url);
        if !units.is_empty() {
            log::debug!("[{}] {} chapters via {}", ctx.name, units.len(), selector);
            return units;
        }
    }
    chapter_range(ctx, doc, series_url)
}

fn chapter_range(ctx: &SourceContext, doc: &Html, series_url: &str) -> Vec<Unit> {
    let button_number = |id: &str| -> Option<u32> {
        let sel = Selector::parse(&format!("a#{}", id)).ok()?;
        let href = doc.select(&sel).next()?.value().attr("href")?;
        CHAPTER_IN_URL.captures(&href.to_lowercase())?[1].parse().ok()
    };
    let first = button_number("btn-read-first");
    let last = button_number("btn-read-last");
    let (Some(a), Some(b)) = (first, last) else {
        return Vec::new();
    };
    let (first, last) = if a <= b { (a, b) } else { (b, a) };
    if last - first >= MAX_RANGE_CHAPTERS {
        log::warn!(
            "[{}] read buttons span chapters {}..={} on {}; not expanding",
            ctx.name,
            first,
            last,
            series_url
        );
        return Vec::new();
    }
    let base = series_url.trim_end_matches('/');
    (first..=last)
        .map(|n| {
            let url = format!("{}/chapter-{}/", base, n);
            Unit {
                source: ctx.name.clone(),
                slug: chapter_slug(&url),
                number: n.to_string(),
                title: format!("Chapter {}", n),
                source_url: url,
                date: None,
            }
        })
        .collect()
}

fn manga_id(doc: &Html) -> Option<String> {
    let holder = Selector::parse("div#manga-chapters-holder").ok()?;
    if let Some(id) = doc.select(&holder).next().and_then(|d| d.value().attr("data-id")) {
        return Some(id.to_string());
    }
    let scripts = Selector::parse("script").ok()?;
    doc.select(&scripts)
        .find_map(|s| MANGA_ID.captures(&s.text().collect::<String>()).map(|c| c[1].to_string()))
}

/// Last resort: every anchor whose URL looks like a chapter of this site.
pub(crate) fn scan_chapter_anchors(ctx: &SourceContext, series_url: &str, html: &str) -> Vec<Unit> {
    let doc = Html::parse_document(html);
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    doc.select(&sel)
        .filter(|a| {
            let lower = a.value().attr("href").unwrap_or_default().to_lowercase();
            let chapter_like = ["/chapter", "-chapter-", "/read/", "/ch-", "/chap-"]
                .iter()
                .any(|p| lower.contains(p));
            let navigation = [
                "/page/",
                "/category/",
                "/tag/",
                "/author/",
                "/genre/",
                "?s=",
                "/search",
            ]
            .iter()
            .any(|p| lower.contains(p));
            chapter_like && !navigation
        })
        .filter_map(|a| chapter_from_anchor(ctx, a, series_url))
        .filter(|u| u.source_url.starts_with("http") && seen.insert(u.source_url.clone()))
        .collect()
}

/// `div.post-content_item` rows: heading in `summary-heading`, value in
/// `summary-content`
fn summary_field(
    labels: &'static [&'static str],
) -> impl for<'a> Fn(ElementRef<'a>) -> Option<String> + Send + Sync {
    move |scope| {
        let rows = Selector::parse("div.post-content_item").ok()?;
        let heading = Selector::parse("div.summary-heading").ok()?;
        let content = Selector::parse("div.summary-content").ok()?;
        scope.select(&rows).find_map(|row| {
            let name = row.select(&heading).next().map(element_text)?.to_lowercase();
            labels
                .iter()
                .any(|l| name.starts_with(l))
                .then(|| row.select(&content).next().map(element_text))
                .flatten()
        })
    }
}

/// Parses the series page. Also returns the manga id used by the chapter
/// AJAX endpoint when the page lists no chapters itself.
pub(crate) fn parse_detail(
    ctx: &SourceContext,
    slug: &str,
    url: &str,
    html: &str,
) -> ScrapeResult<(ContentDetail, Option<String>)> {
    let doc = Html::parse_document(html);

    let title = FieldChain::new("title")
        .text("div.post-title h1")
        .text("h1.entry-title")
        .attr("meta[property='og:title']", "content")
        .resolve_doc(&doc);
    if title.is_empty() {
        log::warn!("[{}] no title on {}", ctx.name, url);
        return Err(ScrapeError::NotFound(format!("{} has no title", url)));
    }

    let mut item = CatalogItem::new(&ctx.name, slug.to_string(), ctx.content_type);
    item.title = clean_title(&title).unwrap_or(title);
    item.source_url = url.to_string();
    item.poster = FieldChain::new("poster")
        .attrs("div.summary_image img", &["data-src", "data-lazy-src", "src"])
        .attrs("div.thumb img", &["data-src", "src"])
        .attr("meta[property='og:image']", "content")
        .find_doc(&doc)
        .map(|p| absolute_url(&ctx.base_url, &p))
        .unwrap_or_default();
    item.status = FieldChain::new("status")
        .with_fn("summary[status]", summary_field(&["status"]))
        .labelled("div.spe span", &["status"])
        .resolve_doc(&doc);
    item.rating = FieldChain::new("rating")
        .text("div.post-total-rating span.score")
        .text("span#averagerate")
        .text("div.rtg i")
        .find_doc(&doc)
        .and_then(|r| extract_number(&r))
        .unwrap_or_default();
    item.genres = ListChain::new("genres")
        .text("div.genres-content a")
        .text("div.genxed a")
        .text("div.mgen a")
        .resolve_doc(&doc);

    let units = listed_chapters(ctx, &doc, url);
    let manga_id = if units.is_empty() { manga_id(&doc) } else { None };

    let detail = ContentDetail {
        synopsis: FieldChain::new("synopsis")
            .text("div.summary__content")
            .text("div.description-summary")
            .text("div.manga-excerpt")
            .text("div.entry-content.entry-content-single")
            .or_default("No synopsis available")
            .resolve_doc(&doc),
        alternate_titles: FieldChain::new("alternate_titles")
            .with_fn("summary[alternative]", summary_field(&["alternative", "alternatif"]))
            .labelled("div.spe span", &["judul alternatif", "alternative"])
            .find_doc(&doc)
            .map(|t| {
                t.split([',', ';', '/'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        studio: String::new(),
        author: FieldChain::new("author")
            .text("div.author-content a")
            .with_fn("summary[author]", summary_field(&["author", "pengarang"]))
            .labelled("div.spe span", &["author", "pengarang", "pengarang/author"])
            .resolve_doc(&doc),
        release_info: FieldChain::new("release_info")
            .with_fn("summary[release]", summary_field(&["release", "rilis"]))
            .labelled("div.spe span", &["released", "rilis"])
            .resolve_doc(&doc),
        units,
        item,
    };
    Ok((detail, manga_id))
}

/// Page images for comics, joined paragraphs for novels.
pub(crate) fn parse_chapter(ctx: &SourceContext, unit_slug: &str, html: &str) -> UnitStream {
    let doc = Html::parse_document(html);
    let mut stream = UnitStream::empty(&ctx.name, unit_slug);
    stream.title = FieldChain::new("chapter_title")
        .text("h1#chapter-heading")
        .text("ol.breadcrumb li.active")
        .text("h1.entry-title")
        .text("title")
        .resolve_doc(&doc);

    match ctx.content_type {
        ContentType::Novel => {
            let text = TEXT_SELECTORS.iter().find_map(|s| {
                let sel = Selector::parse(s).ok()?;
                let paragraphs: Vec<String> = doc
                    .select(&sel)
                    .map(element_text)
                    .filter(|p| !p.is_empty())
                    .collect();
                (!paragraphs.is_empty()).then(|| paragraphs.join("\n\n"))
            });
            if text.is_none() {
                log::warn!("[{}] no chapter text for {}", ctx.name, unit_slug);
            }
            stream.text = text;
        }
        _ => {
            stream.pages = PAGE_SELECTORS
                .iter()
                .find_map(|s| {
                    let sel = Selector::parse(s).ok()?;
                    let pages: Vec<String> = doc
                        .select(&sel)
                        .filter_map(|img| first_attr(img, &["data-src", "data-lazy-src", "src"]))
                        .filter(|src| !src.starts_with("data:"))
                        .map(|src| absolute_url(&ctx.base_url, &src))
                        .collect();
                    (!pages.is_empty()).then_some(pages)
                })
                .unwrap_or_default();
            if stream.pages.is_empty() {
                log::warn!("[{}] no page images for {}", ctx.name, unit_slug);
            }
        }
    }
    stream
}

pub(crate) fn parse_genres(html: &str) -> Vec<Genre> {
    let doc = Html::parse_document(html);
    let links = "div.genres_wrap ul li a, a[href*='-genre/'], ul.genre li a";
    let Ok(links) = Selector::parse(links) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    doc.select(&links)
        .filter_map(|a| {
            let slug = slug_from_url(a.value().attr("href")?);
            // "Action (120)"
            let name = element_text(a)
                .trim_end_matches(|c: char| {
                    c.is_ascii_digit() || c.is_whitespace() || c == '(' || c == ')'
                })
                .to_string();
            (!slug.is_empty() && !name.is_empty() && seen.insert(slug.clone()))
                .then_some(Genre { name, slug })
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for Madara {
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
            .cached(key, self.ctx.ttls.stream, || self.fetch_chapter(unit_slug))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{komikindo, sakuranovel, testing};

    const SERIES_URL: &str = "https://comic.test/manga/solo-leveling/";

    #[test]
    fn test_chapter_slug() {
        assert_eq!(
            chapter_slug("https://comic.test/manga/solo-leveling/chapter-12/"),
            "solo-leveling/chapter-12"
        );
        assert_eq!(chapter_slug("https://comic.test/chapter-3/"), "chapter-3");
    }

    #[test]
    fn test_chapter_label_falls_back_to_url() {
        assert_eq!(chapter_label("  Chapter 5 ", "x"), "Chapter 5");
        assert_eq!(chapter_label("", "https://c.test/manga/a/chapter-7/"), "Chapter 7");
        assert_eq!(chapter_label("#", "https://c.test/manga/a/vol-2/"), "Vol. 2");
    }

    #[test]
    fn test_listed_chapters_sorted_ascending() {
        let ctx = testing::context(&komikindo::profile(), "https://comic.test", None);
        let html = r#"
            <div class="post-title"><h1>Solo Leveling</h1></div>
            <div class="post-content_item"><div class="summary-heading"><h5>Status</h5></div><div class="summary-content">OnGoing</div></div>
            <div class="post-content_item"><div class="summary-heading"><h5>Alternative</h5></div><div class="summary-content">Na Honjaman Level Up; 나 혼자만 레벨업</div></div>
            <ul class="main version-chap">
              <li class="wp-manga-chapter"><a href="https://comic.test/manga/solo-leveling/chapter-3/">Chapter 3</a> <span>3 days ago</span></li>
              <li class="wp-manga-chapter"><a href="https://comic.test/manga/solo-leveling/chapter-2/">Chapter 2</a></li>
              <li class="wp-manga-chapter"><a href="https://comic.test/manga/solo-leveling/chapter-1/">Chapter 1</a></li>
            </ul>"#;
        let (mut detail, manga_id) = parse_detail(&ctx, "solo-leveling", SERIES_URL, html).unwrap();
        sort_units_ascending(&mut detail.units);

        assert!(manga_id.is_none());
        assert_eq!(detail.item.status, "OnGoing");
        assert_eq!(
            detail.alternate_titles,
            vec!["Na Honjaman Level Up", "나 혼자만 레벨업"]
        );
        let numbers: Vec<_> = detail.units.iter().map(|u| u.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "2", "3"]);
        assert_eq!(detail.units[0].slug, "solo-leveling/chapter-1");
    }

    #[test]
    fn test_read_buttons_expand_to_range() {
        let ctx = testing::context(&komikindo::profile(), "https://comic.test", None);
        let html = r#"
            <h1 class="entry-title">Solo Leveling</h1>
            <a id="btn-read-last" href="https://comic.test/manga/solo-leveling/chapter-4/">Read Last</a>
            <a id="btn-read-first" href="https://comic.test/manga/solo-leveling/chapter-1/">Read First</a>"#;
        let (detail, _) = parse_detail(&ctx, "solo-leveling", SERIES_URL, html).unwrap();

        assert_eq!(detail.units.len(), 4);
        assert_eq!(detail.units[3].source_url, "https://comic.test/manga/solo-leveling/chapter-4/");
    }

    #[test]
    fn test_read_buttons_with_post_ids_are_not_expanded() {
        let ctx = testing::context(&komikindo::profile(), "https://comic.test", None);
        let html = r#"
            <h1 class="entry-title">Solo Leveling</h1>
            <a id="btn-read-first" href="https://comic.test/manga/solo-leveling/chapter-1/">Read First</a>
            <a id="btn-read-last" href="https://comic.test/manga/solo-leveling/chapter-300000/">Read Last</a>
            <div id="manga-chapters-holder" data-id="1187"></div>"#;
        let (detail, manga_id) = parse_detail(&ctx, "solo-leveling", SERIES_URL, html).unwrap();

        assert!(detail.units.is_empty());
        assert_eq!(manga_id.as_deref(), Some("1187"));

        let near_max = format!(
            r#"<h1 class="entry-title">X</h1>
               <a id="btn-read-first" href="/manga/x/chapter-0/">First</a>
               <a id="btn-read-last" href="/manga/x/chapter-{}/">Last</a>"#,
            u32::MAX
        );
        let (detail, _) = parse_detail(&ctx, "x", SERIES_URL, &near_max).unwrap();
        assert!(detail.units.is_empty());
    }

    #[test]
    fn test_manga_id_when_no_chapters_listed() {
        let ctx = testing::context(&komikindo::profile(), "https://comic.test", None);
        let html = r#"<div class="post-title"><h1>Solo Leveling</h1></div>
                      <div id="manga-chapters-holder" data-id="4521"></div>"#;
        let (detail, manga_id) = parse_detail(&ctx, "solo-leveling", SERIES_URL, html).unwrap();
        assert!(detail.units.is_empty());
        assert_eq!(manga_id.as_deref(), Some("4521"));

        let scripted = r#"<h1 class="entry-title">X</h1><script>var manga_id = 77;</script>"#;
        let (_, manga_id) = parse_detail(&ctx, "x", SERIES_URL, scripted).unwrap();
        assert_eq!(manga_id.as_deref(), Some("77"));
    }

    #[test]
    fn test_anchor_scan_skips_navigation() {
        let ctx = testing::context(&komikindo::profile(), "https://comic.test", None);
        let html = r#"
            <a href="/manga/solo-leveling/chapter-1/">1</a>
            <a href="/manga/solo-leveling/chapter-2/">2</a>
            <a href="/manga/solo-leveling/chapter-2/">2 again</a>
            <a href="/genre/chapter-action/">Action</a>
            <a href="/manga/page/2/">Next</a>"#;
        let units = scan_chapter_anchors(&ctx, SERIES_URL, html);
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].number, "2");
    }

    #[test]
    fn test_comic_chapter_pages() {
        let ctx = testing::context(&komikindo::profile(), "https://comic.test", None);
        let html = r#"
            <h1 id="chapter-heading">Solo Leveling - Chapter 1</h1>
            <div class="reading-content">
              <div class="page-break"><img data-src=" https://cdn.test/1.jpg " src="data:image/gif;base64,R0"></div>
              <div class="page-break"><img src="/uploads/2.jpg"></div>
            </div>"#;
        let stream = parse_chapter(&ctx, "solo-leveling/chapter-1", html);
        assert_eq!(stream.title, "Solo Leveling - Chapter 1");
        assert_eq!(
            stream.pages,
            vec!["https://cdn.test/1.jpg", "https://comic.test/uploads/2.jpg"]
        );
        assert!(stream.text.is_none());
    }

    #[test]
    fn test_novel_chapter_text() {
        let ctx = testing::context(&sakuranovel::profile(), "https://novel.test", None);
        let html = r#"
            <div class="reading-content"><div class="text-left">
              <p>First paragraph.</p><p> </p><p>Second   paragraph.</p>
            </div></div>"#;
        let stream = parse_chapter(&ctx, "a/chapter-1", html);
        assert_eq!(stream.text.as_deref(), Some("First paragraph.\n\nSecond paragraph."));
        assert!(stream.pages.is_empty());
    }

    #[test]
    fn test_parse_genres() {
        let genres = parse_genres(
            r#"<div class="genres_wrap"><ul>
                 <li><a href="https://comic.test/manga-genre/action/">Action (120)</a></li>
                 <li><a href="https://comic.test/manga-genre/isekai/">Isekai</a></li>
               </ul></div>"#,
        );
        assert_eq!(genres.len(), 2);
        assert_eq!(genres[0].name, "Action");
        assert_eq!(genres[0].slug, "action");
    }
}
