//! Sitemap XML parser
//!
//! Turns a (decompressed) sitemap document into a [`ParsedSitemap`]:
//! - `<urlset>` roots yield URL entries with their metadata
//! - `<sitemapindex>` roots yield child sitemap references
//! - Google image, video, news and mobile extensions are collected per entry
//!
//! Bad individual entries are dropped or repaired with a warning. Only a
//! document that cannot be read as XML, or whose root is not a sitemap
//! element, fails as a whole.

use crate::sitemap::types::{
    ChangeFrequency, ChildRef, EntryExtensions, NewsInfo, ParseWarning, ParseWarningKind,
    ParsedSitemap, SitemapContent, SitemapType, UrlEntry, VideoInfo,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use thiserror::Error;

const IMAGE_NS_MARKER: &str = "sitemap-image";
const VIDEO_NS_MARKER: &str = "sitemap-video";
const NEWS_NS_MARKER: &str = "sitemap-news";
const MOBILE_NS_MARKER: &str = "sitemap-mobile";

/// A sitemap document that could not be parsed at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("malformed XML: {reason}")]
    MalformedXml { reason: String },

    #[error("unknown root element <{name}>")]
    UnknownRootElement { name: String },
}

/// Namespace an element belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns {
    Sitemap,
    Image,
    Video,
    News,
    Mobile,
    Other,
}

impl Ns {
    fn from_uri(uri: &str) -> Self {
        if uri.contains(IMAGE_NS_MARKER) {
            Ns::Image
        } else if uri.contains(VIDEO_NS_MARKER) {
            Ns::Video
        } else if uri.contains(NEWS_NS_MARKER) {
            Ns::News
        } else if uri.contains(MOBILE_NS_MARKER) {
            Ns::Mobile
        } else {
            Ns::Sitemap
        }
    }

    /// Fallback for prefixes used without an `xmlns:` declaration
    fn from_conventional_prefix(prefix: &str) -> Self {
        match prefix {
            "image" => Ns::Image,
            "video" => Ns::Video,
            "news" => Ns::News,
            "mobile" => Ns::Mobile,
            _ => Ns::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    UrlSet,
    Index,
}

/// Incremental state for one `<url>` element
#[derive(Debug, Default)]
struct EntryBuilder {
    loc: Option<String>,
    priority: Option<f64>,
    changefreq: Option<ChangeFrequency>,
    lastmod: Option<DateTime<Utc>>,
    extensions: EntryExtensions,
    video: Option<VideoInfo>,
    news: Option<NewsInfo>,
    in_image: bool,
    in_publication: bool,
}

/// Incremental state for one `<sitemap>` element of an index
#[derive(Debug, Default)]
struct ChildBuilder {
    loc: Option<String>,
    lastmod: Option<DateTime<Utc>>,
}

/// Streaming parser state
struct SitemapParser {
    prefixes: HashMap<String, Ns>,
    default_ns: Ns,
    declared: Vec<Ns>,
    root: Option<Root>,
    open_elements: usize,
    text: String,
    entry: Option<EntryBuilder>,
    child: Option<ChildBuilder>,
    entries: Vec<UrlEntry>,
    children: Vec<ChildRef>,
    warnings: Vec<ParseWarning>,
}

/// Parses a sitemap document
///
/// # Arguments
///
/// * `bytes` - The document body, already decompressed
///
/// # Returns
///
/// * `Ok(ParsedSitemap)` - A urlset or a sitemap index, plus any warnings
/// * `Err(ParseFailure)` - The document is not well-formed XML, is empty or
///   truncated, or its root is neither `<urlset>` nor `<sitemapindex>`
///
/// # Example
///
/// ```
/// use seo_discovery::sitemap::{parse_sitemap, SitemapContent, SitemapType};
///
/// let xml = br#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
///   <url><loc>https://example.com/</loc><priority>0.9</priority></url>
/// </urlset>"#;
///
/// let parsed = parse_sitemap(xml).unwrap();
/// assert_eq!(parsed.sitemap_type, SitemapType::Regular);
/// assert!(matches!(parsed.content, SitemapContent::UrlSet { ref entries } if entries.len() == 1));
/// ```
pub fn parse_sitemap(bytes: &[u8]) -> Result<ParsedSitemap, ParseFailure> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut state = SitemapParser::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                state.start_element(&e)?;
                state.open_elements += 1;
            }
            Ok(Event::Empty(e)) => {
                state.start_element(&e)?;
                state.end_element(e.name().as_ref());
            }
            Ok(Event::End(e)) => {
                state.open_elements = state.open_elements.saturating_sub(1);
                state.end_element(e.name().as_ref());
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| ParseFailure::MalformedXml {
                    reason: format!(
                        "bad text at byte {}: {}",
                        reader.buffer_position(),
                        err
                    ),
                })?;
                state.text.push_str(&text);
            }
            Ok(Event::CData(e)) => {
                state.text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParseFailure::MalformedXml {
                    reason: format!("at byte {}: {}", reader.buffer_position(), e),
                });
            }
        }
        buf.clear();
    }

    state.finish()
}

impl SitemapParser {
    fn new() -> Self {
        Self {
            prefixes: HashMap::new(),
            default_ns: Ns::Sitemap,
            declared: Vec::new(),
            root: None,
            open_elements: 0,
            text: String::new(),
            entry: None,
            child: None,
            entries: Vec::new(),
            children: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn start_element(&mut self, e: &BytesStart<'_>) -> Result<(), ParseFailure> {
        self.collect_namespaces(e);
        self.text.clear();

        let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let (ns, local) = self.resolve(&qname);

        if self.root.is_none() {
            self.root = Some(match local {
                "urlset" => Root::UrlSet,
                "sitemapindex" => Root::Index,
                _ => {
                    return Err(ParseFailure::UnknownRootElement {
                        name: local.to_string(),
                    })
                }
            });
            return Ok(());
        }

        match (ns, local) {
            (Ns::Sitemap, "url") if self.root == Some(Root::UrlSet) => {
                self.entry = Some(EntryBuilder::default());
            }
            (Ns::Sitemap, "sitemap") if self.root == Some(Root::Index) => {
                self.child = Some(ChildBuilder::default());
            }
            (Ns::Image, "image") => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.in_image = true;
                }
            }
            (Ns::Video, "video") => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.video = Some(VideoInfo::default());
                }
            }
            (Ns::News, "news") => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.news = Some(NewsInfo::default());
                }
            }
            (Ns::News, "publication") => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.in_publication = true;
                }
            }
            (Ns::Mobile, "mobile") => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.extensions.mobile = true;
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn end_element(&mut self, raw_name: &[u8]) {
        let qname = String::from_utf8_lossy(raw_name).into_owned();
        let (ns, local) = self.resolve(&qname);
        let text = std::mem::take(&mut self.text);
        let text = text.trim();

        if let Some(child) = self.child.as_mut() {
            match (ns, local) {
                (Ns::Sitemap, "loc") if !text.is_empty() => child.loc = Some(text.to_string()),
                (Ns::Sitemap, "lastmod") => child.lastmod = parse_lastmod(text),
                (Ns::Sitemap, "sitemap") => self.finish_child(),
                _ => {}
            }
            return;
        }

        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        match (ns, local) {
            (Ns::Image, "loc") if entry.in_image && !text.is_empty() => {
                entry.extensions.images.push(text.to_string());
            }
            (Ns::Image, "image") => entry.in_image = false,

            (Ns::Video, "video") => {
                if let Some(video) = entry.video.take() {
                    entry.extensions.videos.push(video);
                }
            }
            (Ns::Video, field) => {
                if let Some(video) = entry.video.as_mut() {
                    let value = non_empty(text);
                    match field {
                        "content_loc" => video.content_loc = value,
                        "player_loc" => video.player_loc = value,
                        "title" => video.title = value,
                        "thumbnail_loc" => video.thumbnail_loc = value,
                        _ => {}
                    }
                }
            }

            (Ns::News, "news") => {
                if let Some(news) = entry.news.take() {
                    entry.extensions.news = Some(news);
                }
            }
            (Ns::News, "publication") => entry.in_publication = false,
            (Ns::News, field) => {
                let in_publication = entry.in_publication;
                if let Some(news) = entry.news.as_mut() {
                    match field {
                        "name" if in_publication => news.publication_name = non_empty(text),
                        "title" => news.title = non_empty(text),
                        "publication_date" => news.publication_date = parse_lastmod(text),
                        _ => {}
                    }
                }
            }

            (Ns::Sitemap, "loc") if !text.is_empty() => entry.loc = Some(text.to_string()),
            (Ns::Sitemap, "lastmod") => entry.lastmod = parse_lastmod(text),
            (Ns::Sitemap, "changefreq") => entry.changefreq = ChangeFrequency::parse(text),
            (Ns::Sitemap, "priority") => {
                let parsed = parse_priority(text);
                if let Some((value, Some(original))) = parsed {
                    self.warnings.push(ParseWarning {
                        kind: ParseWarningKind::PriorityClamped,
                        detail: format!("priority {} clamped to {}", original, value),
                    });
                }
                entry.priority = parsed.map(|(value, _)| value);
            }
            (Ns::Sitemap, "url") => self.finish_entry(),
            _ => {}
        }
    }

    fn finish_entry(&mut self) {
        let Some(builder) = self.entry.take() else {
            return;
        };

        match builder.loc {
            Some(loc) => self.entries.push(UrlEntry {
                loc,
                priority: builder.priority,
                changefreq: builder.changefreq,
                lastmod: builder.lastmod,
                extensions: builder.extensions,
            }),
            None => {
                let ordinal = self.entry_ordinal();
                self.warnings.push(ParseWarning {
                    kind: ParseWarningKind::MissingLoc,
                    detail: format!("<url> #{} has no <loc>; entry dropped", ordinal),
                });
            }
        }
    }

    fn finish_child(&mut self) {
        let Some(builder) = self.child.take() else {
            return;
        };

        match builder.loc {
            Some(loc) => self.children.push(ChildRef {
                loc,
                lastmod: builder.lastmod,
            }),
            None => self.warnings.push(ParseWarning {
                kind: ParseWarningKind::MissingLoc,
                detail: "<sitemap> reference has no <loc>; reference dropped".to_string(),
            }),
        }
    }

    /// 1-based position of the entry being finished, counting dropped ones
    fn entry_ordinal(&self) -> usize {
        self.entries.len()
            + self
                .warnings
                .iter()
                .filter(|w| w.kind == ParseWarningKind::MissingLoc)
                .count()
            + 1
    }

    fn finish(self) -> Result<ParsedSitemap, ParseFailure> {
        let root = self.root.ok_or_else(|| ParseFailure::MalformedXml {
            reason: "document has no root element".to_string(),
        })?;

        if self.open_elements > 0 {
            return Err(ParseFailure::MalformedXml {
                reason: format!(
                    "document truncated with {} unclosed element(s)",
                    self.open_elements
                ),
            });
        }

        let (sitemap_type, content) = match root {
            Root::Index => (
                SitemapType::Index,
                SitemapContent::SitemapIndex {
                    children: self.children,
                },
            ),
            Root::UrlSet => (
                classify_urlset(&self.declared),
                SitemapContent::UrlSet {
                    entries: self.entries,
                },
            ),
        };

        Ok(ParsedSitemap {
            sitemap_type,
            content,
            warnings: self.warnings,
        })
    }

    /// Records `xmlns` / `xmlns:prefix` declarations of an element
    fn collect_namespaces(&mut self, e: &BytesStart<'_>) {
        for attr in e.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = String::from_utf8_lossy(&attr.value).into_owned();

            if key == "xmlns" {
                self.default_ns = Ns::from_uri(&value);
                self.declared.push(self.default_ns);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                let ns = Ns::from_uri(&value);
                self.prefixes.insert(prefix.to_string(), ns);
                self.declared.push(ns);
            }
        }
    }

    fn resolve<'a>(&self, qname: &'a str) -> (Ns, &'a str) {
        match qname.split_once(':') {
            Some((prefix, local)) => {
                let ns = self
                    .prefixes
                    .get(prefix)
                    .copied()
                    .unwrap_or_else(|| Ns::from_conventional_prefix(prefix));
                (ns, local)
            }
            None => (self.default_ns, qname),
        }
    }
}

/// Chooses the urlset type from the declared extension namespaces
fn classify_urlset(declared: &[Ns]) -> SitemapType {
    if declared.contains(&Ns::News) {
        SitemapType::News
    } else if declared.contains(&Ns::Video) {
        SitemapType::Video
    } else if declared.contains(&Ns::Image) {
        SitemapType::Image
    } else if declared.contains(&Ns::Mobile) {
        SitemapType::Mobile
    } else {
        SitemapType::Regular
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parses a declared priority, clamping it into [0, 1]
///
/// Returns the clamped value and, when clamping happened, the original.
/// Non-numeric values yield `None`.
fn parse_priority(text: &str) -> Option<(f64, Option<f64>)> {
    let value: f64 = text.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        Some((clamped, Some(value)))
    } else {
        Some((value, None))
    }
}

/// Parses a W3C datetime as used by `<lastmod>`
///
/// Accepts full RFC 3339 timestamps, minute-precision timestamps with a
/// zone, zone-less timestamps (read as UTC), plain dates, year-month and
/// year. Anything else yields `None`.
pub fn parse_lastmod(text: &str) -> Option<DateTime<Utc>> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Minute precision: 2024-01-15T10:30+02:00 or 2024-01-15T10:30Z
    let with_offset = match s.strip_suffix('Z') {
        Some(rest) => format!("{}+00:00", rest),
        None => s.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_str(&with_offset, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    // Date, year-month and year precision
    let padded = match s.len() {
        4 => format!("{}-01-01", s),
        7 => format!("{}-01", s),
        _ => s.to_string(),
    };
    let date = NaiveDate::parse_from_str(&padded, "%Y-%m-%d").ok()?;

    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}
