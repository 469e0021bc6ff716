//! Media URL extraction from entry markup

use regex::Regex;

/// Primary media host of the source platform
pub const PRIMARY_MEDIA_HOST: &str = "https://pbs.twimg.com/";

/// Fallback mirror serving the same media
pub const FALLBACK_MEDIA_HOST: &str = "https://nitter.net/pic/";

/// Finds media URLs in entry markup
pub trait MediaExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// All media URLs in `markup`, in order of appearance
    fn extract(&self, markup: &str) -> Vec<String>;
}

/// Extracts URLs under a fixed hosting prefix.
///
/// A URL runs from the prefix up to the next whitespace, non-breaking space
/// or double quote, which covers both bare URLs and `src="..."` attributes.
#[derive(Debug, Clone)]
pub struct HostedMediaExtractor {
    prefix: String,
    pattern: Regex,
}

impl HostedMediaExtractor {
    pub fn new(prefix: impl Into<String>) -> Result<Self, regex::Error> {
        let prefix = prefix.into();
        let pattern = Regex::new(&format!("{}[^\\s\u{a0}\"]*", regex::escape(&prefix)))?;
        Ok(Self { prefix, pattern })
    }
}

impl MediaExtractor for HostedMediaExtractor {
    fn name(&self) -> &str {
        &self.prefix
    }

    fn extract(&self, markup: &str) -> Vec<String> {
        if !markup.contains(&self.prefix) {
            return vec![];
        }
        self.pattern
            .find_iter(markup)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Build extractors for a list of hosting prefixes, dropping invalid ones
pub fn extractors_for_hosts(hosts: &[String]) -> Vec<Box<dyn MediaExtractor>> {
    hosts
        .iter()
        .filter_map(|host| match HostedMediaExtractor::new(host.as_str()) {
            Ok(extractor) => Some(Box::new(extractor) as Box<dyn MediaExtractor>),
            Err(error) => {
                tracing::warn!(host = %host, error = %error, "Invalid media host");
                None
            }
        })
        .collect()
}

/// The primary host followed by the fallback mirror
pub fn default_media_hosts() -> Vec<String> {
    vec![
        PRIMARY_MEDIA_HOST.to_string(),
        FALLBACK_MEDIA_HOST.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_from_img_attributes() {
        let extractor = HostedMediaExtractor::new(PRIMARY_MEDIA_HOST).unwrap();
        let markup = r#"<p>Look</p><img src="https://pbs.twimg.com/media/abc.jpg"><img src="https://pbs.twimg.com/media/def.png">"#;

        assert_eq!(
            extractor.extract(markup),
            vec![
                "https://pbs.twimg.com/media/abc.jpg".to_string(),
                "https://pbs.twimg.com/media/def.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_stops_at_nbsp_and_space() {
        let extractor = HostedMediaExtractor::new(FALLBACK_MEDIA_HOST).unwrap();
        let markup = "pics https://nitter.net/pic/one.jpg\u{a0}and https://nitter.net/pic/two.jpg done";

        assert_eq!(
            extractor.extract(markup),
            vec![
                "https://nitter.net/pic/one.jpg".to_string(),
                "https://nitter.net/pic/two.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_prefix_is_matched_literally() {
        let extractor = HostedMediaExtractor::new(PRIMARY_MEDIA_HOST).unwrap();
        // '.' in the prefix must not match arbitrary characters
        assert!(extractor.extract("https://pbsXtwimg.com/media/a.jpg").is_empty());
    }

    #[test]
    fn test_other_hosts_ignored() {
        let extractor = HostedMediaExtractor::new(PRIMARY_MEDIA_HOST).unwrap();
        assert!(extractor
            .extract(r#"<img src="https://example.com/a.jpg">"#)
            .is_empty());
    }

    #[test]
    fn test_default_hosts_order() {
        let extractors = extractors_for_hosts(&default_media_hosts());
        let names: Vec<_> = extractors.iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec![PRIMARY_MEDIA_HOST, FALLBACK_MEDIA_HOST]);
    }
}
