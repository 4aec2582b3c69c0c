use std::collections::HashSet;

use encoding_rs::{Encoding, UTF_8};
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use tracing::{debug, warn};
use url::Url;

use crate::{charset, naming};

const DOCTYPE: &str = "<!DOCTYPE html>\n";

/// Tags whose reference is mirrored locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Image,
    Script,
    Link,
}

impl ResourceType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "img" => Some(Self::Image),
            "script" => Some(Self::Script),
            "link" => Some(Self::Link),
            _ => None,
        }
    }

    /// Attribute carrying the reference.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Image | Self::Script => "src",
            Self::Link => "href",
        }
    }
}

/// Absolute resource URL to local file name, in document order.
///
/// The first occurrence of a URL wins; later duplicates are ignored.
#[derive(Debug, Clone, Default)]
pub struct ResourceMap {
    entries: Vec<(Url, String)>,
    seen: HashSet<Url>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the URL was already present.
    pub fn insert(&mut self, url: Url, file_name: String) -> bool {
        if !self.seen.insert(url.clone()) {
            return false;
        }
        self.entries.push((url, file_name));
        true
    }

    #[cfg(test)]
    pub(crate) fn get(&self, url: &Url) -> Option<&str> {
        self.entries
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, name)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Url, &str)> {
        self.entries.iter().map(|(u, name)| (u, name.as_str()))
    }
}

/// Output of [`HtmlParser::rewrite`].
#[derive(Debug, Clone)]
pub struct RewrittenPage {
    pub html: Vec<u8>,
    pub resources: ResourceMap,
    /// Encoding the page was decoded from and `html` is written in.
    pub encoding: &'static Encoding,
}

/// Rewrites the resource references of one page.
#[derive(Debug, Clone)]
pub struct HtmlParser {
    base_url: Url,
}

impl HtmlParser {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `reference` against the page URL with standard URL joining.
    pub fn resolve_url(&self, reference: &str) -> Option<Url> {
        match self.base_url.join(reference) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!(reference, error = %e, "unresolvable reference");
                None
            }
        }
    }

    /// Same scheme, host and port as the page.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.base_url.origin()
    }

    /// Parses `html`, points every same-origin `img`/`script`/`link` reference
    /// at `<resources_dir>/<file name>`, and collects what must be downloaded.
    ///
    /// The body is decoded using the `Content-Type` charset, a `<meta>`
    /// declaration or a byte order mark, and written back in that encoding.
    /// Never fails: the parser repairs broken markup, and a blank body is
    /// handed back untouched with no resources.
    pub fn rewrite(
        &self,
        resources_dir: &str,
        html: &[u8],
        content_type: Option<&str>,
    ) -> RewrittenPage {
        let mut resources = ResourceMap::new();
        if html.iter().all(u8::is_ascii_whitespace) {
            return RewrittenPage {
                html: html.to_vec(),
                resources,
                encoding: UTF_8,
            };
        }

        let (text, encoding) = charset::decode(html, content_type);
        debug!(encoding = encoding.name(), "decoded page");
        let dom = parse_document(RcDom::default(), parse_opts()).one(StrTendril::from(text));

        for node in descendants(&dom.document) {
            self.rewrite_element(&node, resources_dir, &mut resources);
        }

        match serialize_document(&dom, encoding) {
            Ok(html) => RewrittenPage {
                html,
                resources,
                encoding,
            },
            Err(e) => {
                warn!(error = %e, "failed to serialize rewritten page, keeping original markup");
                RewrittenPage {
                    html: html.to_vec(),
                    resources: ResourceMap::new(),
                    encoding,
                }
            }
        }
    }

    fn rewrite_element(&self, node: &Handle, resources_dir: &str, resources: &mut ResourceMap) {
        let NodeData::Element { name, attrs, .. } = &node.data else {
            return;
        };
        let Some(resource_type) = ResourceType::from_tag(&name.local) else {
            return;
        };
        let attribute = resource_type.attribute();

        let mut attrs = attrs.borrow_mut();
        let Some(attr) = attrs.iter_mut().find(|a| &*a.name.local == attribute) else {
            return;
        };
        let reference = attr.value.trim();
        if reference.is_empty() {
            return;
        }

        let Some(resolved) = self.resolve_url(reference) else {
            return;
        };
        if !self.is_same_origin(&resolved) {
            debug!(url = %resolved, "skipping cross-origin resource");
            return;
        }

        let file_name = naming::to_file_name(&resolved);
        let local_path = format!("{resources_dir}/{file_name}");
        debug!(url = %resolved, ?resource_type, local = %local_path, "rewriting reference");

        attr.value = StrTendril::from_slice(&local_path);
        resources.insert(resolved, file_name);
    }
}

/// `<noscript>` content is parsed as markup so references inside it are seen.
fn parse_opts() -> ParseOpts {
    ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Every node under `root`, in document order, including `<template>` contents.
fn descendants(root: &Handle) -> Vec<Handle> {
    let mut ordered = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        stack.extend(node.children.borrow().iter().rev().cloned());
        if let NodeData::Element {
            template_contents, ..
        } = &node.data
        {
            if let Some(contents) = template_contents.borrow().as_ref() {
                stack.push(contents.clone());
            }
        }
        ordered.push(node);
    }
    ordered
}

/// Moves `<template>` contents under the element itself; the rcdom
/// serializer only follows `children`.
fn inline_templates(root: &Handle) {
    for node in descendants(root) {
        if let NodeData::Element {
            template_contents, ..
        } = &node.data
        {
            if let Some(contents) = template_contents.borrow_mut().take() {
                let moved: Vec<Handle> = contents.children.borrow_mut().drain(..).collect();
                node.children.borrow_mut().extend(moved);
            }
        }
    }
}

fn serialize_document(dom: &RcDom, encoding: &'static Encoding) -> std::io::Result<Vec<u8>> {
    inline_templates(&dom.document);
    let has_doctype = dom
        .document
        .children
        .borrow()
        .iter()
        .any(|child| matches!(child.data, NodeData::Doctype { .. }));

    let mut out = Vec::new();
    if !has_doctype {
        out.extend_from_slice(DOCTYPE.as_bytes());
    }
    let document: SerializableHandle = dom.document.clone().into();
    let opts = SerializeOpts {
        scripting_enabled: false,
        ..Default::default()
    };
    serialize(&mut out, &document, opts)?;

    if encoding.output_encoding() == UTF_8 {
        return Ok(out);
    }
    Ok(charset::encode(&String::from_utf8_lossy(&out), encoding))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(base: &str, html: &str) -> (String, ResourceMap) {
        let parser = HtmlParser::new(Url::parse(base).unwrap());
        let dir = naming::to_directory_name(&naming::to_file_name(parser.base_url()));
        let page = parser.rewrite(&dir, html.as_bytes(), None);
        (String::from_utf8(page.html).unwrap(), page.resources)
    }

    #[test]
    fn test_same_origin_filter() {
        let (html, resources) = rewrite(
            "https://a.com/",
            r#"<html><head>
                <link rel="stylesheet" href="https://a.com/x.css">
                <link rel="stylesheet" href="https://b.com/y.css">
            </head></html>"#,
        );

        assert_eq!(resources.len(), 1);
        let x = Url::parse("https://a.com/x.css").unwrap();
        assert_eq!(resources.get(&x), Some("a-com-x.css"));
        assert!(html.contains(r#"href="a-com_files/a-com-x.css""#));
        assert!(html.contains(r#"href="https://b.com/y.css""#));
    }

    #[test]
    fn test_relative_resolution() {
        let (html, resources) = rewrite(
            "https://a.com/dir/page.html",
            r#"<img src="../img/x.png">"#,
        );

        let expected = Url::parse("https://a.com/img/x.png").unwrap();
        assert_eq!(resources.get(&expected), Some("a-com-img-x.png"));
        assert!(html.contains(r#"src="a-com-dir-page_files/a-com-img-x.png""#));
    }

    #[test]
    fn test_protocol_relative_and_port() {
        let (_, resources) = rewrite(
            "https://a.com/",
            r#"<script src="//a.com/app.js"></script>
               <script src="//b.com/app.js"></script>
               <script src="https://a.com:8443/other.js"></script>
               <script src="http://a.com/plain.js"></script>"#,
        );

        let urls: Vec<_> = resources.iter().map(|(u, _)| u.as_str().to_string()).collect();
        assert_eq!(urls, vec!["https://a.com/app.js"]);
    }

    #[test]
    fn test_document_order_and_first_wins() {
        let (html, resources) = rewrite(
            "https://site.com/",
            r#"<html><head>
                <link href="/assets/app.css" rel="stylesheet">
                <script src="/assets/app.js"></script>
            </head><body>
                <img src="/img/logo.png">
                <img src="/img/logo.png">
            </body></html>"#,
        );

        let names: Vec<_> = resources.iter().map(|(_, n)| n.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "site-com-assets-app.css",
                "site-com-assets-app.js",
                "site-com-img-logo.png",
            ]
        );
        assert_eq!(html.matches("site-com_files/site-com-img-logo.png").count(), 2);
    }

    #[test]
    fn test_link_without_extension_defaults_to_html() {
        let (html, resources) = rewrite(
            "https://ru.hexlet.io/courses",
            r#"<link rel="canonical" href="/courses">"#,
        );

        let canonical = Url::parse("https://ru.hexlet.io/courses").unwrap();
        assert_eq!(resources.get(&canonical), Some("ru-hexlet-io-courses.html"));
        assert!(html.contains("ru-hexlet-io-courses_files/ru-hexlet-io-courses.html"));
    }

    #[test]
    fn test_skips_missing_and_empty_attributes() {
        let (_, resources) = rewrite(
            "https://a.com/",
            r#"<script>var inline = 1;</script><img src=""><img alt="x"><link rel="preconnect">"#,
        );
        assert!(resources.is_empty());
    }

    #[test]
    fn test_anchors_are_untouched() {
        let (html, resources) = rewrite("https://a.com/", r#"<a href="/about">About</a>"#);
        assert!(resources.is_empty());
        assert!(html.contains(r#"href="/about""#));
    }

    #[test]
    fn test_adds_doctype_once() {
        let (html, _) = rewrite("https://a.com/", "<html><body><p>hi</p></body></html>");
        assert!(html.starts_with("<!DOCTYPE html>"));

        let (html, _) = rewrite("https://a.com/", "<!DOCTYPE html><html><body></body></html>");
        assert_eq!(html.matches("<!DOCTYPE html>").count(), 1);
    }

    #[test]
    fn test_malformed_markup_is_repaired() {
        let (html, resources) = rewrite(
            "https://a.com/",
            r#"<html><body><div><img src="/x.png"<p>unclosed<script src="/y.js">"#,
        );
        assert!(html.contains("</html>"));
        let y = Url::parse("https://a.com/y.js").unwrap();
        assert_eq!(resources.get(&y), Some("a-com-y.js"));
    }

    #[test]
    fn test_blank_body_passes_through() {
        let parser = HtmlParser::new(Url::parse("https://a.com/").unwrap());
        let page = parser.rewrite("a-com_files", b"  \n", None);
        assert_eq!(page.html, b"  \n");
        assert!(page.resources.is_empty());
    }

    #[test]
    fn test_resource_map_first_wins() {
        let mut map = ResourceMap::new();
        let url = Url::parse("https://a.com/x.css").unwrap();
        assert!(map.insert(url.clone(), "first.css".into()));
        assert!(!map.insert(url.clone(), "second.css".into()));
        assert_eq!(map.get(&url), Some("first.css"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_noscript_references_are_rewritten() {
        let (html, resources) = rewrite(
            "https://a.com/",
            r#"<html><body><noscript><img src="/pixel.png"></noscript></body></html>"#,
        );

        let pixel = Url::parse("https://a.com/pixel.png").unwrap();
        assert_eq!(resources.get(&pixel), Some("a-com-pixel.png"));
        assert!(html.contains(r#"<noscript><img src="a-com_files/a-com-pixel.png"></noscript>"#));
    }

    #[test]
    fn test_template_contents_are_rewritten() {
        let (html, resources) = rewrite(
            "https://a.com/",
            r#"<img src="/first.png"><template><img src="/t.png"></template><img src="/last.png">"#,
        );

        let names: Vec<_> = resources.iter().map(|(_, n)| n.to_string()).collect();
        assert_eq!(names, vec!["a-com-first.png", "a-com-t.png", "a-com-last.png"]);
        assert!(html.contains(r#"<template><img src="a-com_files/a-com-t.png"></template>"#));
    }

    #[test]
    fn test_meta_charset_page_is_not_mangled() {
        let mut body = br#"<html><head><meta charset="windows-1251"></head><body><p>"#.to_vec();
        body.extend_from_slice(&[0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]);
        body.extend_from_slice(br#"</p><img src="/x.png"></body></html>"#);

        let parser = HtmlParser::new(Url::parse("https://a.com/").unwrap());
        let page = parser.rewrite("a-com_files", &body, None);
        assert_eq!(page.encoding, encoding_rs::WINDOWS_1251);
        assert!(page.html.windows(6).any(|w| w == [0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]));

        let (text, _, had_errors) = encoding_rs::WINDOWS_1251.decode(&page.html);
        assert!(!had_errors);
        assert!(!text.contains('\u{FFFD}'));
        assert!(text.contains("<p>Привет</p>"));
        assert!(text.contains(r#"src="a-com_files/a-com-x.png""#));
    }

    #[test]
    fn test_content_type_charset_is_honoured() {
        let mut body = b"<html><body><p>".to_vec();
        body.extend_from_slice(&[0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]);
        body.extend_from_slice(b"</p></body></html>");

        let parser = HtmlParser::new(Url::parse("https://a.com/").unwrap());
        let page = parser.rewrite("a-com_files", &body, Some("text/html; charset=windows-1251"));
        let (text, _, _) = page.encoding.decode(&page.html);
        assert!(text.contains("<p>Привет</p>"));

        let lossy = parser.rewrite("a-com_files", &body, Some("text/html"));
        assert_eq!(lossy.encoding, UTF_8);
    }
}
