use super::decode::{decode_option_value, extract_src};
use crate::browser::{BrowserError, RenderingDriver};
use crate::extract::text::{absolute_url, element_text, first_attr};
use crate::extract::infer_quality;
use crate::http_client::ThrottledFetcher;
use crate::models::StreamServer;
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::HashSet;

/// Frames that are never players
pub const BLOCKED_FRAME_HOSTS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "disqus.com",
    "googlesyndication.com",
    "doubleclick.net",
    "googletagmanager.com",
    "chatango.com",
    "histats.com",
    "recaptcha",
];

const MEDIA_SELECTOR: &str = "video source[src], video[src]";
const FRAME_SELECTOR: &str = "iframe[src], iframe[data-src]";

/// Site-relative POST endpoint that turns a server button into an iframe.
///
/// The button carries the form parameters in data attributes: each entry
/// of `params` maps a form field to the attribute holding its value.
#[derive(Debug, Clone)]
pub struct DeferredEndpoint {
    pub path: String,
    pub action: String,
    pub option_selector: String,
    pub label_selector: String,
    pub params: Vec<(String, String)>,
}

impl DeferredEndpoint {
    /// DooPlay themes: `li.dooplay_player_option` posted to `admin-ajax.php`
    pub fn dooplay() -> Self {
        Self {
            path: "/wp-admin/admin-ajax.php".to_string(),
            action: "doo_player_ajax".to_string(),
            option_selector: "li.dooplay_player_option[data-post]".to_string(),
            label_selector: "span.title".to_string(),
            params: vec![
                ("post".to_string(), "data-post".to_string()),
                ("nume".to_string(), "data-nume".to_string()),
                ("type".to_string(), "data-type".to_string()),
            ],
        }
    }
}

/// Server switcher that only works in a live page
#[derive(Debug, Clone)]
pub struct RenderedServers {
    pub option_selector: String,
    pub frame_selector: String,
}

/// One POST the deferred state needs to make
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredCall {
    pub label: String,
    pub form: Vec<(String, String)>,
}

/// Servers in discovery order, unique by URL.
#[derive(Debug, Default)]
pub struct ServerSet {
    seen: HashSet<String>,
    servers: Vec<StreamServer>,
}

impl ServerSet {
    pub fn push(&mut self, name: &str, url: String, quality_hint: &str) -> bool {
        if url.is_empty() || !self.seen.insert(url.clone()) {
            return false;
        }
        let name = if name.trim().is_empty() {
            host_label(&url)
        } else {
            name.trim().to_string()
        };
        self.servers.push(StreamServer {
            name,
            url,
            quality: infer_quality(quality_hint),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn into_vec(self) -> Vec<StreamServer> {
        self.servers
    }
}

fn host_label(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| "Server".to_string())
}

pub fn is_blocked_frame(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.starts_with("about:") || BLOCKED_FRAME_HOSTS.iter().any(|h| lower.contains(h))
}

/// Resolves the playback servers of a unit page.
///
/// The static states (direct media, iframes, mirror options, deferred
/// POSTs) all run and their results are merged. The rendered state only
/// runs when the static states found nothing.
#[derive(Debug, Clone)]
pub struct StreamResolver {
    source: String,
    option_selectors: Vec<String>,
    deferred: Option<DeferredEndpoint>,
    rendered: Option<RenderedServers>,
}

impl StreamResolver {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            option_selectors: vec![
                "select.mirror option".to_string(),
                "select#mirrorList option".to_string(),
                "div.mirror select option".to_string(),
            ],
            deferred: None,
            rendered: None,
        }
    }

    pub fn with_deferred(mut self, endpoint: DeferredEndpoint) -> Self {
        self.deferred = Some(endpoint);
        self
    }

    pub fn with_rendered(mut self, rendered: RenderedServers) -> Self {
        self.rendered = Some(rendered);
        self
    }

    /// Direct media, iframes and encoded mirror options
    pub fn resolve_static(&self, doc: &Html, page_url: &str, servers: &mut ServerSet) {
        let before = servers.len();

        if let Ok(sel) = Selector::parse(MEDIA_SELECTOR) {
            for el in doc.select(&sel) {
                if let Some(src) = el.value().attr("src") {
                    let label = el.value().attr("label").or(el.value().attr("size")).unwrap_or("");
                    servers.push("Direct", absolute_url(page_url, src), label);
                }
            }
        }
        log::debug!("[{}] direct media: {} servers", self.source, servers.len() - before);

        let before = servers.len();
        if let Ok(sel) = Selector::parse(FRAME_SELECTOR) {
            for el in doc.select(&sel) {
                let Some(src) = first_attr(el, &["src", "data-src"]) else {
                    continue;
                };
                let url = absolute_url(page_url, &src);
                if is_blocked_frame(&url) {
                    continue;
                }
                let hint = el.value().attr("title").unwrap_or("");
                servers.push("", url, hint);
            }
        }
        log::debug!("[{}] iframes: {} servers", self.source, servers.len() - before);

        let before = servers.len();
        for selector in &self.option_selectors {
            let Ok(sel) = Selector::parse(selector) else {
                continue;
            };
            for option in doc.select(&sel) {
                let Some(value) = option.value().attr("value") else {
                    continue;
                };
                if let Some(url) = decode_option_value(value) {
                    if !is_blocked_frame(&url) {
                        let label = element_text(option);
                        servers.push(&label, url, &label);
                    }
                }
            }
        }
        log::debug!("[{}] mirror options: {} servers", self.source, servers.len() - before);
    }

    /// Form bodies for every deferred server button on the page
    pub fn deferred_calls(&self, doc: &Html) -> Vec<DeferredCall> {
        let Some(endpoint) = &self.deferred else {
            return Vec::new();
        };
        let (Ok(option_sel), Ok(label_sel)) = (
            Selector::parse(&endpoint.option_selector),
            Selector::parse(&endpoint.label_selector),
        ) else {
            return Vec::new();
        };

        doc.select(&option_sel)
            .filter_map(|el| {
                let mut form = vec![("action".to_string(), endpoint.action.clone())];
                for (field, attr) in &endpoint.params {
                    let value = el.value().attr(attr)?;
                    form.push((field.clone(), value.to_string()));
                }
                let label = el
                    .select(&label_sel)
                    .next()
                    .map(element_text)
                    .unwrap_or_else(|| element_text(el));
                Some(DeferredCall { label, form })
            })
            .collect()
    }

    async fn resolve_deferred(
        &self,
        calls: Vec<DeferredCall>,
        base_url: &str,
        fetcher: &ThrottledFetcher,
        servers: &mut ServerSet,
    ) {
        let Some(endpoint) = &self.deferred else {
            return;
        };
        let url = absolute_url(base_url, &endpoint.path);

        for call in calls {
            match fetcher.post_form(&url, &call.form).await {
                Ok(body) => match parse_deferred_response(&body) {
                    Some(player) if !is_blocked_frame(&player) => {
                        servers.push(&call.label, player, &call.label);
                    }
                    _ => log::debug!(
                        "[{}] no player in deferred response for {}",
                        self.source,
                        call.label
                    ),
                },
                Err(e) => log::warn!(
                    "[{}] deferred resolution failed for {}: {}",
                    self.source,
                    call.label,
                    e
                ),
            }
        }
    }

    /// Runs every state for the unit page at `page_url` whose HTML is `html`.
    pub async fn resolve(
        &self,
        html: &str,
        page_url: &str,
        base_url: &str,
        fetcher: &ThrottledFetcher,
        driver: Option<&RenderingDriver>,
    ) -> Vec<StreamServer> {
        let mut servers = ServerSet::default();
        let calls = {
            let doc = Html::parse_document(html);
            self.resolve_static(&doc, page_url, &mut servers);
            self.deferred_calls(&doc)
        };

        if !calls.is_empty() {
            self.resolve_deferred(calls, base_url, fetcher, &mut servers).await;
        }

        if servers.is_empty() {
            if let (Some(rendered), Some(driver)) = (&self.rendered, driver) {
                match render_servers(driver, page_url, rendered.clone()).await {
                    Ok(found) => {
                        for (label, url) in found {
                            servers.push(&label, url, &label);
                        }
                    }
                    Err(e) => {
                        log::warn!("[{}] rendered server switching failed: {}", self.source, e)
                    }
                }
            }
        }

        log::debug!("[{}] {} servers for {}", self.source, servers.len(), page_url);
        servers.into_vec()
    }
}

/// Body of a deferred POST: an HTML fragment with one iframe, or DooPlay's
/// JSON envelope `{"embed_url": ..., "type": ...}`.
pub fn parse_deferred_response(body: &str) -> Option<String> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let embed = json.get("embed_url").and_then(|v| v.as_str())?;
        return decode_option_value(embed);
    }
    extract_src(body)
}

/// Clicks each server option in a live page and records the iframe shown
/// afterwards.
pub async fn render_servers(
    driver: &RenderingDriver,
    page_url: &str,
    rendered: RenderedServers,
) -> Result<Vec<(String, String)>, BrowserError> {
    let page_url_owned = page_url.to_string();
    driver
        .with_page(page_url, move |page, options| {
            let total = page.count(&rendered.option_selector)?;
            let mut found = Vec::new();
            for index in 0..total {
                if !page.click_nth(&rendered.option_selector, index)? {
                    continue;
                }
                page.pause(options.interaction_wait);
                let html = page.content()?;
                if let Some((label, src)) = read_active_server(&html, &rendered, index) {
                    found.push((label, absolute_url(&page_url_owned, &src)));
                }
            }
            Ok(found)
        })
        .await
}

fn read_active_server(
    html: &str,
    rendered: &RenderedServers,
    index: usize,
) -> Option<(String, String)> {
    let doc = Html::parse_document(html);
    let frame_sel = Selector::parse(&rendered.frame_selector).ok()?;
    let option_sel = Selector::parse(&rendered.option_selector).ok()?;

    let src = doc
        .select(&frame_sel)
        .find_map(|f| first_attr(f, &["src", "data-src"]))
        .filter(|s| !is_blocked_frame(s))?;
    let label = doc
        .select(&option_sel)
        .nth(index)
        .map(element_text)
        .unwrap_or_default();
    Some((label, src))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeBrowser, FakePage};
    use crate::browser::RenderOptions;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use std::sync::Arc;

    const PAGE: &str = "https://site.test/ep-1/";

    fn resolve_static(html: &str) -> Vec<StreamServer> {
        let resolver = StreamResolver::new("test");
        let mut servers = ServerSet::default();
        resolver.resolve_static(&Html::parse_document(html), PAGE, &mut servers);
        servers.into_vec()
    }

    #[test]
    fn test_every_static_state_is_recorded() {
        let encoded = STANDARD.encode(r#"<iframe src="https://player.example/x"></iframe>"#);
        let html = format!(
            r#"<video><source src="https://cdn.test/ep1.mp4" label="720p"></video>
               <div id="embed"><iframe src="https://embed.test/v/1"></iframe></div>
               <iframe src="https://www.facebook.com/plugins/like.php"></iframe>
               <select class="mirror">
                 <option value="">Pilih Server</option>
                 <option value="{}">Mega 480p</option>
                 <option value="https://embed.test/v/1">Duplicate</option>
               </select>"#,
            encoded
        );
        let servers = resolve_static(&html);

        let urls: Vec<_> = servers.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.test/ep1.mp4",
                "https://embed.test/v/1",
                "https://player.example/x"
            ]
        );
        assert_eq!(servers[0].quality.as_deref(), Some("720p"));
        assert_eq!(servers[1].name, "embed.test");
        assert_eq!(servers[2].name, "Mega 480p");
        assert_eq!(servers[2].quality.as_deref(), Some("480p"));
    }

    #[test]
    fn test_no_servers_is_valid() {
        assert!(resolve_static("<p>Video belum tersedia</p>").is_empty());
    }

    #[test]
    fn test_deferred_calls_from_dooplay_options() {
        let resolver = StreamResolver::new("test").with_deferred(DeferredEndpoint::dooplay());
        let doc = Html::parse_document(
            r#"<ul id="playeroptionsul">
                 <li class="dooplay_player_option" data-type="tv" data-post="4321" data-nume="1"><span class="title">Server 1 720p</span></li>
                 <li class="dooplay_player_option" data-type="tv" data-post="4321" data-nume="trailer"><span class="title">Trailer</span></li>
               </ul>"#,
        );
        let calls = resolver.deferred_calls(&doc);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].label, "Server 1 720p");
        assert_eq!(
            calls[0].form,
            vec![
                ("action".to_string(), "doo_player_ajax".to_string()),
                ("post".to_string(), "4321".to_string()),
                ("nume".to_string(), "1".to_string()),
                ("type".to_string(), "tv".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_deferred_response() {
        assert_eq!(
            parse_deferred_response(r#"<iframe class="metaframe" src="https://player.test/e/9"></iframe>"#).as_deref(),
            Some("https://player.test/e/9")
        );
        assert_eq!(
            parse_deferred_response(r#"{"embed_url":"<iframe src=\"https://player.test/e/10\"></iframe>","type":"iframe"}"#)
                .as_deref(),
            Some("https://player.test/e/10")
        );
        assert_eq!(
            parse_deferred_response(r#"{"embed_url":"https://player.test/e/11","type":"iframe"}"#).as_deref(),
            Some("https://player.test/e/11")
        );
        assert_eq!(parse_deferred_response("0"), None);
    }

    #[tokio::test]
    async fn test_rendered_server_switching_dedupes() {
        let browser = FakeBrowser::new();
        browser.add_page(
            PAGE,
            FakePage::listing(0, 0, 0).with_servers(&[
                ("Kuramadrive 720p", "https://drive.test/a"),
                ("Filelions", "https://lions.test/b"),
                ("Kuramadrive 480p", "https://drive.test/a"),
            ]),
        );
        let driver = RenderingDriver::new(Arc::new(browser.clone()), RenderOptions::default());
        let rendered = RenderedServers {
            option_selector: FakePage::SERVER.to_string(),
            frame_selector: FakePage::PLAYER.to_string(),
        };

        let found = render_servers(&driver, PAGE, rendered).await.unwrap();
        assert_eq!(found.len(), 3);

        let mut servers = ServerSet::default();
        for (label, url) in found {
            servers.push(&label, url, &label);
        }
        let servers = servers.into_vec();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].quality.as_deref(), Some("720p"));
        assert_eq!(browser.closed(), 1);
    }
}
