//! Language negotiation helpers.

/// Primary language subtags from an `Accept-Language` header, highest
/// quality first. Entries with `q=0` and the `*` wildcard are dropped.
pub fn accepted_languages(header: &str) -> Vec<String> {
    let mut ranked: Vec<(usize, f32, String)> = header
        .split(',')
        .enumerate()
        .filter_map(|(position, entry)| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = parts
                .filter_map(|param| param.trim().strip_prefix("q="))
                .find_map(|value| value.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            if quality <= 0.0 {
                return None;
            }
            let primary = tag.split('-').next()?.to_ascii_lowercase();
            Some((position, quality, primary))
        })
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut seen = Vec::new();
    for (_, _, primary) in ranked {
        if !seen.contains(&primary) {
            seen.push(primary);
        }
    }
    seen
}
