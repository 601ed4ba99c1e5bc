//! Percent-decoding and `application/x-www-form-urlencoded` parameter lists.

use std::collections::HashMap;

/// Decoded parameters: name to every value in arrival order.
///
/// A name that appeared without `=` is present with an empty list.
pub type Params = HashMap<String, Vec<String>>;

/// Decode a percent-encoded string, treating `+` as a space.
///
/// Consecutive `%XX` triples are reassembled into multi-byte UTF-8 sequences;
/// invalid sequences are replaced rather than rejected.
pub fn decode_percent(input: &str) -> String {
    let spaced = input.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Split `a=1&b=2&b=3&c` into a [`Params`] map.
pub fn decode_parameters(input: &str) -> Params {
    let mut params = Params::new();
    for pair in input.split('&').filter(|pair| !pair.is_empty()) {
        match pair.split_once('=') {
            Some((name, value)) => params
                .entry(decode_percent(name).trim().to_string())
                .or_default()
                .push(decode_percent(value)),
            None => {
                params.entry(decode_percent(pair).trim().to_string()).or_default();
            }
        }
    }
    params
}
