// src/provider/mod.rs
//! Upstream RSS adapters. Each adapter fetches `{base}/{category}.xml`,
//! parses its own flavour of RSS and stamps items with its provider id.

pub mod bbc;
pub mod sky;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use metrics::histogram;
use reqwest::{Client, StatusCode, Url};
use rss::Channel;

use crate::news::{Category, Feed, Item, NewsError, NewsResult};

/// Validate an adapter base URL (non-empty, absolute).
pub(crate) fn parse_base_url(url: &str) -> NewsResult<Url> {
    if url.trim().is_empty() {
        return Err(NewsError::invalid("url"));
    }
    Url::parse(url.trim()).map_err(|_| NewsError::invalid("url"))
}

pub(crate) fn category_url(base: &Url, category: &Category) -> String {
    format!("{}/{}.xml", base.as_str().trim_end_matches('/'), category)
}

/// GET the category document and return its body. Any non-200 status is
/// an error; cancellation is dropping the returned future.
pub(crate) async fn fetch_xml(
    client: &Client,
    base: &Url,
    category: &Category,
    provider: &'static str,
) -> Result<String> {
    let t0 = std::time::Instant::now();
    let url = category_url(base, category);

    let resp = client
        .get(&url)
        .send()
        .await
        .context("failed to do request")?;
    if resp.status() != StatusCode::OK {
        bail!("unexpected status code: {}", resp.status().as_u16());
    }
    let body = resp.text().await.context("failed to read body")?;

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("news_provider_fetch_ms", "provider" => provider).record(ms);
    tracing::debug!(target: "provider", provider, %url, bytes = body.len(), "fetched feed document");

    Ok(body)
}

/// Parse an RSS 2.0 document. Prefixed elements (`atom:link`,
/// `media:*`) land in the item/channel extension maps instead of
/// clashing with their unprefixed namesakes.
pub(crate) fn read_channel(xml: &str) -> Result<Channel> {
    Channel::read_from(xml.as_bytes()).context("failed to unmarshal body")
}

/// Channel metadata shared by every adapter; `items` are already stamped.
pub(crate) fn channel_feed(ch: &Channel, items: Vec<Item>) -> Result<Feed> {
    Ok(Feed {
        title: ch.title().trim().to_string(),
        description: ch.description().trim().to_string(),
        link: ch.link().trim().to_string(),
        language: ch.language().unwrap_or_default().to_string(),
        copyright: ch.copyright().unwrap_or_default().to_string(),
        retrieved_at: parse_pub_date(ch.last_build_date())?,
        ttl: parse_ttl(ch.ttl())?,
        items,
    })
}

/// `<ttl>` in minutes; absent means 0.
pub(crate) fn parse_ttl(raw: Option<&str>) -> Result<u32> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(0),
        Some(t) => t.parse().with_context(|| format!("invalid ttl `{t}`")),
    }
}

/// RFC 1123/2822 timestamp (e.g. `Tue, 10 Nov 2020 12:00:00 GMT`) to UTC.
/// Absent values map to the Unix epoch; malformed ones are errors.
pub(crate) fn parse_pub_date(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(DateTime::<Utc>::UNIX_EPOCH),
        Some(ts) => DateTime::parse_from_rfc2822(ts)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("invalid timestamp `{ts}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn base_url_must_be_present_and_absolute() {
        assert!(matches!(
            parse_base_url(""),
            Err(NewsError::InvalidParameter { parameter: "url" })
        ));
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("https://feeds.example.com/news").is_ok());
    }

    #[test]
    fn category_url_appends_xml_document() {
        let base = parse_base_url("https://feeds.example.com/news/").unwrap();
        assert_eq!(
            category_url(&base, &"uk".into()),
            "https://feeds.example.com/news/uk.xml"
        );
    }

    #[test]
    fn pub_date_parses_gmt_and_offsets() {
        let want = Utc.with_ymd_and_hms(2020, 11, 10, 12, 0, 0).unwrap();
        assert_eq!(
            parse_pub_date(Some("Tue, 10 Nov 2020 12:00:00 GMT")).unwrap(),
            want
        );
        assert_eq!(
            parse_pub_date(Some("Tue, 10 Nov 2020 13:00:00 +0100")).unwrap(),
            want
        );
        assert_eq!(parse_pub_date(None).unwrap(), DateTime::<Utc>::UNIX_EPOCH);
        assert!(parse_pub_date(Some("yesterday")).is_err());
    }

    #[test]
    fn ttl_defaults_to_zero_and_rejects_garbage() {
        assert_eq!(parse_ttl(None).unwrap(), 0);
        assert_eq!(parse_ttl(Some(" 15 ")).unwrap(), 15);
        assert!(parse_ttl(Some("soon")).is_err());
    }

    #[test]
    fn atom_self_link_does_not_shadow_channel_link() {
        let xml = r#"<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom"><channel>
            <title>t</title>
            <atom:link href="https://feeds.example.com/uk.xml" rel="self" type="application/rss+xml"/>
            <description>d</description>
            <link>https://news.example.com/uk</link>
            <ttl>2</ttl>
        </channel></rss>"#;
        let ch = read_channel(xml).unwrap();
        let feed = channel_feed(&ch, vec![]).unwrap();
        assert_eq!(feed.link, "https://news.example.com/uk");
        assert_eq!(feed.ttl, 2);
    }

    #[test]
    fn non_rss_body_is_unmarshal_error() {
        let err = read_channel("<html><body>maintenance</body></html>").unwrap_err();
        assert!(format!("{err:#}").starts_with("failed to unmarshal body"));
    }
}
