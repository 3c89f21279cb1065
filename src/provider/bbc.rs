// src/provider/bbc.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use rss::Channel;

use crate::news::{Category, Feed, Item, NewsResult, ProviderId, PROVIDER_BBC};
use crate::provider::{channel_feed, fetch_xml, parse_base_url, parse_pub_date, read_channel};
use crate::service::NewsProvider;

fn into_feed(ch: &Channel, category: &Category) -> Result<Feed> {
    let provider = ProviderId::from(PROVIDER_BBC);
    // BBC items carry no artwork of their own; the channel logo stands in.
    let thumbnail = ch
        .image()
        .map(|img| img.url().trim().to_string())
        .unwrap_or_default();

    let mut items = Vec::with_capacity(ch.items().len());
    for it in ch.items() {
        items.push(Item {
            category: category.clone(),
            provider: provider.clone(),
            title: it.title().unwrap_or_default().trim().to_string(),
            link: it.link().unwrap_or_default().trim().to_string(),
            description: it.description().unwrap_or_default().trim().to_string(),
            thumbnail: thumbnail.clone(),
            published_at: parse_pub_date(it.pub_date())?,
        });
    }

    channel_feed(ch, items)
}

/// BBC News RSS adapter.
pub struct BbcProvider {
    base_url: Url,
    client: Client,
}

impl BbcProvider {
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
impl NewsProvider for BbcProvider {
    async fn fetch(&self, category: &Category) -> Result<Feed> {
        let body = fetch_xml(&self.client, &self.base_url, category, PROVIDER_BBC).await?;
        Self::parse(&body, category)
    }
}
