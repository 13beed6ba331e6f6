//! Percent-encoding helpers for URL paths and query parameters.
//!
//! Protocol and hostname are never encoded here; the primary `Url`
//! constructor takes them verbatim. Only path components and query
//! key/value pairs go through these functions.

/// Characters that survive encoding unchanged (RFC 3986 unreserved set).
fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

/// Percent-encode a single component (no `/` passes through).
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push_str(&format!("{:02X}", b));
        }
    }
    out
}

/// Percent-decode a component. Invalid escapes are kept literally rather
/// than rejected; URL parsing must never fail hard.
pub fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 3 <= bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(v) = u8::from_str_radix(hex, 16) {
                    out.push(v);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Encode every segment of a `/`-separated path, keeping the separators.
pub fn encode_path_components(path: &str) -> String {
    path.split('/')
        .map(encode_component)
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode every segment of a `/`-separated path.
pub fn decode_path_components(path: &str) -> String {
    path.split('/')
        .map(decode_component)
        .collect::<Vec<_>>()
        .join("/")
}

/// Serialize ordered query parameters as `k=v&k=v`, both sides encoded.
pub fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse a query string into ordered key/value pairs, decoding both sides.
/// A bare key without `=` becomes a key with an empty value.
pub fn decode_params(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((k, v)) => (decode_component(k), decode_component(v)),
            None => (decode_component(part), String::new()),
        })
        .collect()
}
