//! Feed Page DOM Adapter
//!
//! Parses a rendered channel page with `scraper` and lowers every post node into
//! a plain `RawNode` value. Everything downstream works on `RawNode` only.

use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// CSS selectors describing the feed markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSelectors {
    /// One element per post.
    pub post: String,
    /// Message body inside a post.
    pub message_text: String,
    /// Link pointing back to the post.
    pub permalink: String,
    /// Human-readable date label.
    pub date_label: String,
    /// Machine-readable time element (with a `datetime` attribute).
    pub time: String,
    /// Attribute on the post element carrying a structured id such as `channel/501`.
    pub id_attribute: String,
    /// Quote of the message a post replies to. Text inside it is not the post's body.
    pub reply: String,
}

impl Default for FeedSelectors {
    fn default() -> Self {
        Self {
            post: ".tgme_widget_message".to_string(),
            message_text: ".tgme_widget_message_text".to_string(),
            permalink: "a.tgme_widget_message_date, a[href*='/s/']".to_string(),
            date_label: ".tgme_widget_message_date".to_string(),
            time: "time[datetime]".to_string(),
            id_attribute: "data-post".to_string(),
            reply: ".tgme_widget_message_reply".to_string(),
        }
    }
}

/// Typed view of one post node. Every field is optional; absence is explicit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNode {
    pub id_attribute: Option<String>,
    pub permalink: Option<String>,
    pub body_text: Option<String>,
    pub full_text: String,
    pub datetime_attribute: Option<String>,
    pub date_label: Option<String>,
}

struct CompiledSelectors {
    post: Selector,
    message_text: Selector,
    permalink: Selector,
    date_label: Selector,
    time: Selector,
    reply: Selector,
}

impl CompiledSelectors {
    fn compile(selectors: &FeedSelectors) -> Option<Self> {
        Some(Self {
            post: parse_selector(&selectors.post)?,
            message_text: parse_selector(&selectors.message_text)?,
            permalink: parse_selector(&selectors.permalink)?,
            date_label: parse_selector(&selectors.date_label)?,
            time: parse_selector(&selectors.time)?,
            reply: parse_selector(&selectors.reply)?,
        })
    }
}

fn parse_selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!(selector = raw, error = ?e, "Invalid feed selector");
            None
        }
    }
}

/// A parsed page snapshot.
pub struct FeedDocument {
    html: Html,
}

impl FeedDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// All post nodes, in document order.
    pub fn post_nodes(&self, selectors: &FeedSelectors) -> Vec<RawNode> {
        let Some(compiled) = CompiledSelectors::compile(selectors) else {
            return Vec::new();
        };

        self.html
            .select(&compiled.post)
            .map(|element| lower_node(element, selectors, &compiled))
            .collect()
    }
}

fn lower_node(element: ElementRef, selectors: &FeedSelectors, compiled: &CompiledSelectors) -> RawNode {
    let id_attribute = element
        .value()
        .attr(&selectors.id_attribute)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let permalink = element
        .select(&compiled.permalink)
        .filter_map(|link| link.value().attr("href"))
        .map(|href| href.trim().to_string())
        .find(|href| !href.is_empty());

    let body_text = element
        .select(&compiled.message_text)
        .find(|body| !inside_reply(*body, element, &compiled.reply))
        .map(|body| node_text(body).trim().to_string())
        .filter(|text| !text.is_empty());

    let datetime_attribute = element
        .select(&compiled.time)
        .filter_map(|time| time.value().attr("datetime"))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty());

    let date_label = element
        .select(&compiled.date_label)
        .next()
        .map(|label| node_text(label).trim().to_string())
        .filter(|text| !text.is_empty());

    RawNode {
        id_attribute,
        permalink,
        body_text,
        full_text: node_text(element).trim().to_string(),
        datetime_attribute,
        date_label,
    }
}

/// Whether `node` sits in a reply quote between itself and `post`.
fn inside_reply(node: ElementRef, post: ElementRef, reply: &Selector) -> bool {
    if reply.matches(&node) {
        return true;
    }
    node.ancestors()
        .take_while(|ancestor| ancestor.id() != post.id())
        .filter_map(ElementRef::wrap)
        .any(|ancestor| reply.matches(&ancestor))
}

/// Text content of an element with `<br>` and block boundaries kept as line breaks.
pub fn node_text(element: ElementRef) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(el) if matches!(el.name(), "br" | "p" | "div" | "li") => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
    out
}
