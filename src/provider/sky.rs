// src/provider/sky.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use rss::Channel;

use crate::news::{Category, Feed, Item, NewsResult, ProviderId, PROVIDER_SKY};
use crate::provider::{channel_feed, fetch_xml, parse_base_url, parse_pub_date, read_channel};
use crate::service::NewsProvider;

/// `url` attribute of the first `<media:thumbnail>`, if any.
fn media_thumbnail(item: &rss::Item) -> String {
    item.extensions()
        .get("media")
        .and_then(|media| media.get("thumbnail"))
        .and_then(|thumbs| thumbs.first())
        .and_then(|thumb| thumb.attrs().get("url"))
        .map(|url| url.trim().to_string())
        .unwrap_or_default()
}

fn into_feed(ch: &Channel, category: &Category) -> Result<Feed> {
    let provider = ProviderId::from(PROVIDER_SKY);

    let items = ch
        .items()
        .iter()
        .map(|it| {
            Ok(Item {
                category: category.clone(),
                provider: provider.clone(),
                title: it.title().unwrap_or_default().trim().to_string(),
                link: it.link().unwrap_or_default().trim().to_string(),
                description: it.description().unwrap_or_default().trim().to_string(),
                thumbnail: media_thumbnail(it),
                published_at: parse_pub_date(it.pub_date())?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    channel_feed(ch, items)
}

/// Sky News RSS adapter; item thumbnails come from `<media:thumbnail>`.
pub struct SkyProvider {
    base_url: Url,
    client: Client,
}

impl SkyProvider {
    pub fn new(url: &str, client: Client) -> NewsResult<Self> {
        Ok(Self {
            base_url: parse_base_url(url)?,
            client,
        })
    }

    fn parse(xml: &str, category: &Category) -> Result<Feed> {
        let ch = read_channel(xml)?;
        into_feed(&ch, category).context("failed to unmarshal body")
    }
}

#[async_trait]
impl NewsProvider for SkyProvider {
    async fn fetch(&self, category: &Category) -> Result<Feed> {
        let body = fetch_xml(&self.client, &self.base_url, category, PROVIDER_SKY).await?;
        Self::parse(&body, category)
    }
}
