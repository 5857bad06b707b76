// src/fetch/urls.rs

use anyhow::Result;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

const MAX_RETRIES: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Scrape every `.xlsx` link from the given download pages, keyed by page
/// URL. Relative hrefs are resolved against their page. Transient fetch
/// failures retry a few times before giving up on the whole scan.
pub async fn fetch_workbook_urls(
    client: &Client,
    pages: &[String],
) -> Result<BTreeMap<String, Vec<String>>> {
    let selector =
        Selector::parse(r#"a[href$=".xlsx"]"#).expect("invalid CSS selector for .xlsx links");

    let mut map = BTreeMap::new();

    for page in pages {
        let sel = selector.clone();
        let mut attempt = 0;

        let links = loop {
            attempt += 1;

            let resp = client.get(page).send().await;
            match resp {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(html) => {
                        let base = Url::parse(page)?;
                        let urls = Html::parse_document(&html)
                            .select(&sel)
                            .filter_map(|e| e.value().attr("href"))
                            .filter_map(|href| base.join(href).ok())
                            .map(|u| u.to_string())
                            .collect::<Vec<_>>();
                        break urls;
                    }
                    Err(_) if attempt < MAX_RETRIES => {
                        sleep(RETRY_DELAY).await;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(_) if attempt < MAX_RETRIES => {
                    sleep(RETRY_DELAY).await;
                    continue;
                }
                Ok(resp) => return Err(anyhow::anyhow!("HTTP error: {}", resp.status())),
                Err(e) => return Err(e.into()),
            }
        };

        map.insert(page.clone(), links);
    }

    Ok(map)
}
