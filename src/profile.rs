//! Artist identity derived from the site's host and page metadata.

use crate::source_url::{Site, SourceUrl};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;

static AUTHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name='author']").unwrap());
static JSON_LD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[type='application/ld+json']").unwrap());

const IDENTITY_TYPES: [&str; 2] = ["Person", "ProfilePage"];

/// Who a site belongs to.
///
/// `username` is only ever taken from a platform subdomain. Custom domains
/// carry no such signal, so their identity comes from page metadata alone
/// and is usually absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub other_names: Vec<String>,
    /// `scheme://host` of the site. `None` for a custom-domain asset seen
    /// without any page.
    pub profile_url: Option<String>,
}

/// Derive the identity of the site serving `source`.
///
/// `html` is the fetched page, when there is one.
pub fn resolve_profile(source: &SourceUrl, html: Option<&str>) -> Profile {
    let marker = html.and_then(|html| identity_marker(&Html::parse_document(html)));
    profile_from(source, marker, html.is_some())
}

pub(crate) fn profile_from(source: &SourceUrl, marker: Option<String>, has_page: bool) -> Profile {
    let profile_url = match source.site() {
        Some(Site::Subdomain { .. }) => source.site_root(),
        Some(Site::CustomDomain { .. }) if has_page => source.site_root(),
        _ => None,
    };

    match source.subdomain() {
        Some(label) => Profile {
            username: Some(label.to_string()),
            display_name: marker,
            other_names: vec![label.to_string()],
            profile_url,
        },
        None => Profile {
            username: None,
            other_names: marker.iter().cloned().collect(),
            display_name: marker,
            profile_url,
        },
    }
}

/// An explicit identity declared by the page: `<meta name="author">` first,
/// then the `name` of a JSON-LD `Person` or `ProfilePage`.
pub fn identity_marker(document: &Html) -> Option<String> {
    let author = document
        .select(&AUTHOR_SELECTOR)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty());
    if let Some(author) = author {
        return Some(author.to_string());
    }

    document.select(&JSON_LD_SELECTOR).find_map(|script| {
        let content = script.text().collect::<String>();
        // Strip CDATA markers if present
        let content = content
            .trim()
            .trim_start_matches("<![CDATA[")
            .trim_end_matches("]]>")
            .trim();
        let parsed: Value = serde_json::from_str(content).ok()?;
        json_ld_nodes(&parsed).into_iter().find_map(json_ld_identity)
    })
}

fn json_ld_nodes(value: &Value) -> Vec<&Value> {
    if let Some(items) = value.as_array() {
        return items.iter().collect();
    }
    let mut nodes = vec![value];
    if let Some(graph) = value.get("@graph").and_then(Value::as_array) {
        nodes.extend(graph.iter());
    }
    nodes
}

fn has_identity_type(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(ty)) => IDENTITY_TYPES.contains(&ty.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|ty| IDENTITY_TYPES.contains(&ty)),
        _ => false,
    }
}

fn json_ld_identity(node: &Value) -> Option<String> {
    if !has_identity_type(node) {
        return None;
    }
    node.get("name")
        .or_else(|| node.get("mainEntity").and_then(|entity| entity.get("name")))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
