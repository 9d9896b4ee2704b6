//! Query strings appended to generated import specifiers.

use super::call::GlobQuery;
use crate::paths;

/// Stylesheet extensions that get the `used` marker.
const CSS_LANGS: &[&str] = &["css", "less", "sass", "scss", "styl", "stylus", "pcss", "postcss"];

/// Whether a request path names a stylesheet.
pub fn is_css_request(request: &str) -> bool {
    CSS_LANGS.iter().any(|lang| {
        let suffix = format!(".{lang}");
        request.ends_with(&suffix) || request.contains(&format!("{suffix}?"))
    })
}

/// Render the call's query option as `?…`, or an empty string.
pub fn stringify_query(query: Option<&GlobQuery>) -> String {
    let query = match query {
        None => return String::new(),
        Some(GlobQuery::String(s)) => s.clone(),
        Some(GlobQuery::Map(pairs)) => {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in pairs {
                match value {
                    Some(value) => serializer.append_pair(key, value),
                    None => serializer.append_key_only(key),
                };
            }
            serializer.finish()
        }
    };

    if query.is_empty() || query.starts_with('?') {
        query
    } else {
        format!("?{query}")
    }
}

/// Query for one matched file: the call's query plus the stylesheet and
/// language markers.
pub fn file_query(query: &str, file: &str) -> String {
    let mut query = query.to_string();

    if is_css_request(file) {
        query.push_str(if query.is_empty() { "?used" } else { "&used" });
    }

    if !query.is_empty() && query != "?raw" {
        query.push_str("&lang.");
        query.push_str(lang(file));
    }

    query
}

/// Text after the last `.` of the file name, or the whole name without one.
fn lang(file: &str) -> &str {
    let name = paths::basename(file);
    name.rsplit('.').next().unwrap_or(name)
}
