//! `Accept` header negotiation between the two proof representations.

use crate::domain::ProofFormat;

/// One parsed media range of an `Accept` header
#[derive(Debug, Clone, PartialEq)]
struct MediaRange<'a> {
    kind: &'a str,
    subtype: &'a str,
    quality: f32,
}

impl<'a> MediaRange<'a> {
    fn parse(raw: &'a str) -> Option<Self> {
        let mut parts = raw.split(';').map(str::trim);
        let (kind, subtype) = parts.next()?.split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }

        let mut quality = 1.0;
        for param in parts {
            if let Some((name, value)) = param.split_once('=') {
                if name.trim().eq_ignore_ascii_case("q") {
                    quality = value.trim().parse::<f32>().ok()?.clamp(0.0, 1.0);
                }
            }
        }

        Some(Self {
            kind,
            subtype,
            quality,
        })
    }

    /// Specificity of the match against `mime`, `None` if it does not match.
    fn specificity(&self, mime: &str) -> Option<u8> {
        let (kind, subtype) = mime.split_once('/')?;
        match (self.kind, self.subtype) {
            ("*", "*") => Some(0),
            (k, "*") if k.eq_ignore_ascii_case(kind) => Some(1),
            (k, s) if k.eq_ignore_ascii_case(kind) && s.eq_ignore_ascii_case(subtype) => Some(2),
            _ => None,
        }
    }
}

/// Quality the client assigns to `mime`: the most specific matching range wins.
fn quality_for(ranges: &[MediaRange<'_>], mime: &str) -> f32 {
    ranges
        .iter()
        .filter_map(|range| range.specificity(mime).map(|s| (s, range.quality)))
        .max_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)))
        .map(|(_, quality)| quality)
        .unwrap_or(0.0)
}

/// Pick the response representation for an `Accept` header.
///
/// Base64 is chosen only when the client strictly prefers it. A missing
/// header, a tie or an unparsable header selects JSON-LD.
pub fn negotiate(accept: Option<&str>) -> ProofFormat {
    let Some(accept) = accept.map(str::trim).filter(|a| !a.is_empty()) else {
        return ProofFormat::JsonLd;
    };

    let ranges: Vec<MediaRange<'_>> = accept.split(',').filter_map(MediaRange::parse).collect();

    let base64 = quality_for(&ranges, ProofFormat::BASE64_MIME_TYPE);
    let jsonld = quality_for(&ranges, ProofFormat::JSONLD_MIME_TYPE);

    if base64 > jsonld {
        ProofFormat::Base64
    } else {
        ProofFormat::JsonLd
    }
}
