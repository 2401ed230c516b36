use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::api::error;
use crate::constants::TCG_API_PAGE_SIZE;
use crate::modules::card_sync::dto::{ApiCard, ApiPage, ApiSet};
use crate::ENV;

/// Where catalog data comes from.
#[async_trait::async_trait]
pub trait CardSource {
    async fn fetch_sets(&self) -> Result<Vec<ApiSet>, error::SystemError>;

    async fn fetch_cards_for_set(&self, set_id: &str) -> Result<Vec<ApiCard>, error::SystemError>;
}

/// Client for the Pokémon TCG API.
pub struct TcgApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    page_size: u32,
}

impl TcgApiClient {
    pub fn new() -> Result<Self, error::SystemError> {
        Self::with_config(
            ENV.tcg_api_url.clone(),
            ENV.tcg_api_key.clone(),
            Duration::from_secs(ENV.tcg_api_timeout_secs),
        )
    }

    pub fn with_config(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, error::SystemError> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(concat!("tcg-trade-backend/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;

        Ok(TcgApiClient { client, base_url, api_key, page_size: TCG_API_PAGE_SIZE })
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        page: u32,
    ) -> Result<ApiPage<T>, error::SystemError> {
        let mut request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .query(&[("page", page), ("pageSize", self.page_size)]);

        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error::SystemError::Upstream { status: status.as_u16(), body });
        }

        Ok(response.json::<ApiPage<T>>().await?)
    }

    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, error::SystemError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let chunk = self.get_page::<T>(path, query, page).await?;
            let more = chunk.has_more();
            items.extend(chunk.data);
            if !more {
                break;
            }
            page += 1;
        }
        Ok(items)
    }
}

#[async_trait::async_trait]
impl CardSource for TcgApiClient {
    async fn fetch_sets(&self) -> Result<Vec<ApiSet>, error::SystemError> {
        self.get_all("/sets", &[("orderBy", "releaseDate".to_string())]).await
    }

    async fn fetch_cards_for_set(&self, set_id: &str) -> Result<Vec<ApiCard>, error::SystemError> {
        self.get_all("/cards", &[("q", format!("set.id:{set_id}"))]).await
    }
}

#[cfg(test)]
mod tests {
    use crate::modules::card_sync::dto::ApiPage;

    #[test]
    fn test_page_has_more() {
        let page: ApiPage<u8> = serde_json::from_str(
            r#"{"data":[],"page":1,"pageSize":250,"count":250,"totalCount":251}"#,
        )
        .unwrap();
        assert!(page.has_more());

        let last: ApiPage<u8> = serde_json::from_str(
            r#"{"data":[],"page":2,"pageSize":250,"count":1,"totalCount":251}"#,
        )
        .unwrap();
        assert!(!last.has_more());

        let empty: ApiPage<u8> =
            serde_json::from_str(r#"{"data":[],"page":1,"pageSize":250,"count":0,"totalCount":0}"#)
                .unwrap();
        assert!(!empty.has_more());
    }
}
