use std::time::Duration;

use applier_core::{ApplierSettings, GroupAttributes, RemoteDirectory, RemoteError, RemoteId};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

#[derive(Deserialize)]
struct GroupList {
    groups: Vec<GroupSummary>,
}

#[derive(Deserialize)]
struct GroupSummary {
    id: RemoteId,
    name: String,
}

#[derive(Deserialize)]
struct MemberList {
    members: Vec<Member>,
}

#[derive(Deserialize)]
struct Member {
    username: String,
}

#[derive(Deserialize)]
struct CreatedGroup {
    basic_group: CreatedGroupId,
}

#[derive(Deserialize)]
struct CreatedGroupId {
    id: RemoteId,
}

/// Discourse admin API client.
///
/// Authenticates with an API key acting on behalf of `api_username`.
#[derive(Debug, Clone)]
pub struct DiscourseClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    api_username: String,
}

impl DiscourseClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        api_username: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::invalid_endpoint(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::invalid_endpoint(format!(
                "{base_url} cannot be used as a base URL"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            api_username: api_username.into(),
        })
    }

    pub fn from_settings(
        base_url: &str,
        api_key: impl Into<String>,
        settings: &ApplierSettings,
    ) -> Result<Self, RemoteError> {
        Self::new(
            base_url,
            api_key,
            settings.remote.api_username.clone(),
            settings.remote_timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::invalid_endpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("Api-Username", &self.api_username)
            .header("Accept", "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, RemoteError> {
        let resp = req
            .send()
            .await
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RemoteError::transport(format!("failed to read response body: {e}")))?;

        // Discourse answers 200 to every successful call.
        if status != StatusCode::OK {
            return Err(RemoteError::rejected(status.as_u16(), body));
        }

        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| RemoteError::unexpected(e.to_string()))
    }
}

#[async_trait]
impl RemoteDirectory for DiscourseClient {
    async fn find_by_name(&self, name: &str) -> Result<Option<RemoteId>, RemoteError> {
        let url = self.url(&["groups.json"])?;
        let listing: GroupList = self.send(self.request(Method::GET, url)).await?;

        let found = listing
            .groups
            .into_iter()
            .find(|group| group.name == name)
            .map(|group| group.id);
        match &found {
            Some(id) => debug!(name, %id, "Found group using the API"),
            None => debug!(name, "No group with this name was found using the API"),
        }
        Ok(found)
    }

    async fn list_members(&self, group_name: &str) -> Result<Vec<String>, RemoteError> {
        let url = self.url(&["groups", group_name, "members.json"])?;
        let list: MemberList = self.send(self.request(Method::GET, url)).await?;
        Ok(list.members.into_iter().map(|m| m.username).collect())
    }

    async fn create(&self, attributes: &GroupAttributes) -> Result<RemoteId, RemoteError> {
        // https://docs.discourse.org/#tag/Groups/operation/createGroup
        let url = self.url(&["admin", "groups.json"])?;
        let body = json!({ "group": attributes });
        let created: CreatedGroup = self
            .send(self.request(Method::POST, url).json(&body))
            .await?;

        let id = created.basic_group.id;
        debug!(name = %attributes.name, %id, "Created group using the API");
        Ok(id)
    }

    async fn update(&self, id: &RemoteId, attributes: &GroupAttributes) -> Result<(), RemoteError> {
        // https://docs.discourse.org/#tag/Groups/operation/updateGroup
        let segment = format!("{id}.json");
        let url = self.url(&["groups", &segment])?;
        let body = json!({ "group": attributes });
        let _: Value = self
            .send(self.request(Method::PUT, url).json(&body))
            .await?;

        debug!(name = %attributes.name, %id, "Updated group using the API");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> DiscourseClient {
        DiscourseClient::new(base, "key", "system", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn urls_append_to_base_path() {
        let client = client("http://forum.example/community/");
        assert_eq!(client.base_url().path(), "/community/");

        let url = client
            .url(&["groups", "students", "members.json"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://forum.example/community/groups/students/members.json"
        );
    }

    #[test]
    fn group_names_are_percent_encoded() {
        let url = client("http://forum.example")
            .url(&["groups", "a b/c", "members.json"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://forum.example/groups/a%20b%2Fc/members.json"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        let err = DiscourseClient::new("not a url", "key", "system", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, RemoteError::InvalidEndpoint { .. }));

        let err = DiscourseClient::new(
            "mailto:admin@example.com",
            "key",
            "system",
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, RemoteError::InvalidEndpoint { .. }));
    }
}
