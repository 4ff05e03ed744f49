use std::path::PathBuf;
use url::Url;

/// Deterministic URL -> relative-path mapping used by strategies that don't
/// have a more specific layout of their own (crawler, sitemap, LLMS). Git,
/// wiki, and generated-API-docs strategies compute their own `relative_path`
/// per their section of the spec and never call this.
///
/// Hierarchical (`no_folders = false`): `<host>/<path-segments>/<file>.md`.
/// Flat (`no_folders = true`): `<host>-<path-segments-joined-by->.md`, all
/// in a single directory.
pub fn derive_relative_path(url: &Url, no_folders: bool) -> PathBuf {
    let host = url.host_str().unwrap_or("unknown-host").to_string();
    let segments: Vec<String> = url
        .path_segments()
        .map(|segs| {
            segs.filter(|s| !s.is_empty())
                .map(sanitize_segment)
                .collect()
        })
        .unwrap_or_default();

    if no_folders {
        let mut slug_parts = vec![sanitize_segment(&host)];
        slug_parts.extend(segments);
        let mut filename = slug_parts.join("-");
        ensure_md_extension(&mut filename);
        return PathBuf::from(filename);
    }

    let mut path = PathBuf::from(sanitize_segment(&host));
    if segments.is_empty() {
        path.push("index.md");
        return path;
    }

    for segment in &segments[..segments.len() - 1] {
        path.push(segment);
    }

    let mut last = segments[segments.len() - 1].clone();
    if last.is_empty() {
        last = "index".to_string();
    }
    ensure_md_extension(&mut last);
    path.push(last);
    path
}

fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '-' })
        .collect();
    if cleaned.is_empty() {
        "index".to_string()
    } else {
        cleaned.to_lowercase()
    }
}

fn ensure_md_extension(name: &mut String) {
    let has_md_ext = name.ends_with(".md") || name.ends_with(".mdx");
    if !has_md_ext {
        if let Some(dot) = name.rfind('.') {
            name.truncate(dot);
        }
        name.push_str(".md");
    }
}
