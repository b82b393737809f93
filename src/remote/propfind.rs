//! WebDAV `PROPFIND` multistatus parsing
//!
//! Only two properties matter to the mirror: the `href` of each response
//! and whether its `resourcetype` contains `collection`. Namespace prefixes
//! vary between servers (`D:`, `d:`, none), so elements are matched on
//! their local name.

use crate::remote::RemoteEntry;
use percent_encoding::percent_decode_str;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Request body asking only for the resource type
pub const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:"><D:prop><D:resourcetype/></D:prop></D:propfind>"#;

/// One `<response>` element of a multistatus document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropEntry {
    /// Raw href as sent by the server (may be percent-encoded)
    pub href: String,

    /// Whether `<resourcetype>` contained `<collection/>`
    pub is_collection: bool,
}

impl PropEntry {
    /// Decoded path component of the href, without trailing slash
    pub fn decoded_path(&self) -> String {
        let path = href_path(&self.href);
        let decoded = percent_decode_str(path).decode_utf8_lossy();
        let trimmed = decoded.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Decoded final path component
    pub fn name(&self) -> String {
        let path = self.decoded_path();
        path.rsplit('/').next().unwrap_or_default().to_string()
    }
}

/// Strip scheme and authority when the server sends absolute hrefs
fn href_path(href: &str) -> &str {
    let href = href.trim();
    for scheme in ["http://", "https://"] {
        if let Some(rest) = href.strip_prefix(scheme) {
            return match rest.find('/') {
                Some(idx) => &rest[idx..],
                None => "/",
            };
        }
    }
    href
}

/// Parse a multistatus document into its responses
pub fn parse_multistatus(xml: &str) -> Result<Vec<PropEntry>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<PropEntry> = None;
    let mut in_href = false;
    let mut in_resourcetype = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"response" => current = Some(PropEntry::default()),
                b"href" => in_href = true,
                b"resourcetype" => in_resourcetype = true,
                b"collection" if in_resourcetype => {
                    if let Some(entry) = current.as_mut() {
                        entry.is_collection = true;
                    }
                }
                _ => {}
            },
            Event::Empty(e) => {
                if in_resourcetype && e.local_name().as_ref() == b"collection" {
                    if let Some(entry) = current.as_mut() {
                        entry.is_collection = true;
                    }
                }
            }
            Event::Text(t) if in_href => {
                if let Some(entry) = current.as_mut() {
                    entry.href.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) if in_href => {
                if let Some(entry) = current.as_mut() {
                    entry.href.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"response" => entries.extend(current.take()),
                b"href" => in_href = false,
                b"resourcetype" => in_resourcetype = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Turn the responses of a `Depth: 1` listing into directory entries
///
/// `request_path` is the decoded URL path that was queried; the response
/// describing the directory itself is dropped, as are `.` and `..` names.
pub fn to_remote_entries(request_path: &str, props: Vec<PropEntry>) -> Vec<RemoteEntry> {
    let request_path = request_path.trim_end_matches('/');
    let request_path = if request_path.is_empty() { "/" } else { request_path };

    props
        .into_iter()
        .filter(|p| p.decoded_path() != request_path)
        .filter_map(|p| {
            let name = p.name();
            if matches!(name.as_str(), "" | "." | "..") {
                None
            } else {
                Some(RemoteEntry {
                    name,
                    is_dir: p.is_collection,
                })
            }
        })
        .collect()
}
