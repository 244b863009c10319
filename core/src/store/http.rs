use super::{Document, DocumentStore, Mutator, OrderBy};
use crate::{LeagueError, LeagueResult};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{ETAG, IF_MATCH, IF_NONE_MATCH};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const MAX_UPDATE_ATTEMPTS: usize = 5;

/// Client for a REST document gateway.
///
/// Routes: `{base}/{collection}/{id}` for single documents (GET, PUT, PATCH,
/// DELETE) and `{base}/{collection}` for listing (GET) and creation (POST).
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("navetane/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}", self.base_url)
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url).timeout(self.timeout);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, url: &str) -> LeagueResult<Response> {
        builder.send().await.map_err(|source| LeagueError::Network { source, url: url.to_owned() })
    }

    fn check(response: Response, url: &str) -> LeagueResult<Response> {
        response
            .error_for_status()
            .map_err(|source| LeagueError::Api { source, url: url.to_owned() })
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response, url: &str) -> LeagueResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|source| LeagueError::Parsing { source, url: url.to_owned() })
    }

    async fn list_with(&self, collection: &str, params: &[(&str, &str)]) -> LeagueResult<Vec<Document>> {
        let mut url = Url::parse(&self.collection_url(collection))
            .map_err(|e| LeagueError::validation(format!("bad store url: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        let url = url.to_string();
        let response = self.send(self.request(Method::GET, &url), &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        Self::json(Self::check(response, &url)?, &url).await
    }

    async fn write(&self, method: Method, collection: &str, id: &str, data: &Value) -> LeagueResult<()> {
        let url = self.doc_url(collection, id);
        let response = self.send(self.request(method, &url).json(data), &url).await?;
        Self::check(response, &url)?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn get(&self, collection: &str, id: &str) -> LeagueResult<Option<Document>> {
        let url = self.doc_url(collection, id);
        let response = self.send(self.request(Method::GET, &url), &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let data = Self::json(Self::check(response, &url)?, &url).await?;
        Ok(Some(Document { id: id.to_owned(), data }))
    }

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> LeagueResult<Vec<Document>> {
        match order {
            Some(order) => {
                let params = [("orderBy", order.field.as_str()), ("direction", order.direction.as_str())];
                self.list_with(collection, &params).await
            }
            None => self.list_with(collection, &[]).await,
        }
    }

    async fn find_eq(&self, collection: &str, field: &str, value: &Value) -> LeagueResult<Vec<Document>> {
        let equals = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.list_with(collection, &[("where", field), ("equals", &equals)]).await
    }

    async fn create(&self, collection: &str, data: Value) -> LeagueResult<String> {
        let url = self.collection_url(collection);
        let response = self.send(self.request(Method::POST, &url).json(&data), &url).await?;
        let created: Created = Self::json(Self::check(response, &url)?, &url).await?;
        debug!("created {collection}/{}", created.id);
        Ok(created.id)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> LeagueResult<()> {
        self.write(Method::PUT, collection, id, &data).await
    }

    async fn merge(&self, collection: &str, id: &str, patch: Value) -> LeagueResult<()> {
        self.write(Method::PATCH, collection, id, &patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> LeagueResult<()> {
        let url = self.doc_url(collection, id);
        let response = self.send(self.request(Method::DELETE, &url), &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response, &url)?;
        Ok(())
    }

    /// Optimistic read-modify-write: the PUT carries the ETag read with the
    /// document and is retried from scratch when the gateway answers 412,
    /// at most `MAX_UPDATE_ATTEMPTS` times. This is the only request the
    /// store ever retries; every other failure is returned as is.
    async fn update_with(&self, collection: &str, id: &str, mutator: Mutator<'_>) -> LeagueResult<Value> {
        let url = self.doc_url(collection, id);
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let response = self.send(self.request(Method::GET, &url), &url).await?;
            let (current, etag) = if response.status() == StatusCode::NOT_FOUND {
                (None, None)
            } else {
                let response = Self::check(response, &url)?;
                let etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                (Some(Self::json::<Value>(response, &url).await?), etag)
            };

            let next = mutator(current.as_ref())?;
            let put = self.request(Method::PUT, &url).json(&next);
            let put = match (&current, etag) {
                (_, Some(etag)) => put.header(IF_MATCH, etag),
                (None, None) => put.header(IF_NONE_MATCH, "*"),
                (Some(_), None) => put,
            };
            let response = self.send(put, &url).await?;
            if response.status() == StatusCode::PRECONDITION_FAILED {
                warn!("write conflict on {url} (attempt {attempt}/{MAX_UPDATE_ATTEMPTS})");
                continue;
            }
            Self::check(response, &url)?;
            return Ok(next);
        }
        Err(LeagueError::Conflict(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn get_maps_404_to_none() {
        let mut server = Server::new_async().await;
        let found = server
            .mock("GET", "/teams/t1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"ASC Jaraaf","logoUrl":""}"#)
            .create_async()
            .await;
        let missing = server.mock("GET", "/teams/t2").with_status(404).create_async().await;

        let store = HttpStore::new(server.url());
        let doc = store.get("teams", "t1").await.unwrap().unwrap();
        assert_eq!(doc.id, "t1");
        assert_eq!(doc.data["name"], "ASC Jaraaf");
        assert!(store.get("teams", "t2").await.unwrap().is_none());

        found.assert_async().await;
        missing.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_surface_as_api_errors() {
        let mut server = Server::new_async().await;
        let _m = server.mock("GET", "/teams/t1").with_status(500).create_async().await;
        let store = HttpStore::new(server.url());
        let err = store.get("teams", "t1").await.unwrap_err();
        assert!(matches!(err, LeagueError::Api { .. }));
    }

    #[tokio::test]
    async fn list_sends_ordering_and_bearer_token() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/teams")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("orderBy".into(), "name".into()),
                Matcher::UrlEncoded("direction".into(), "asc".into()),
            ]))
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"a","data":{"name":"Casa Sports"}},{"id":"b","data":{"name":"Gorée"}}]"#)
            .create_async()
            .await;

        let store = HttpStore::new(format!("{}/", server.url())).with_token("secret");
        let docs = store.list("teams", Some(&OrderBy::asc("name"))).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].data["name"], "Gorée");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn find_eq_uses_where_equals() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/polls")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("where".into(), "articleId".into()),
                Matcher::UrlEncoded("equals".into(), "a1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"p1","data":{"articleId":"a1"}}]"#)
            .create_async()
            .await;

        let store = HttpStore::new(server.url());
        let docs = store.find_eq("polls", "articleId", &json!("a1")).await.unwrap();
        assert_eq!(docs[0].id, "p1");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn create_returns_gateway_id() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/sponsors")
            .match_body(Matcher::Json(json!({ "name": "Orange" })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"s1"}"#)
            .create_async()
            .await;

        let store = HttpStore::new(server.url());
        assert_eq!(store.create("sponsors", json!({ "name": "Orange" })).await.unwrap(), "s1");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn merge_patches_and_delete_tolerates_404() {
        let mut server = Server::new_async().await;
        let patch = server
            .mock("PATCH", "/finals_admin_data/current")
            .match_body(Matcher::Json(json!({ "coupe": { "semis": [] } })))
            .with_status(204)
            .create_async()
            .await;
        let delete = server.mock("DELETE", "/teams/gone").with_status(404).create_async().await;

        let store = HttpStore::new(server.url());
        store.merge("finals_admin_data", "current", json!({ "coupe": { "semis": [] } })).await.unwrap();
        store.delete("teams", "gone").await.unwrap();
        patch.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn update_with_reruns_mutator_after_precondition_failed() {
        let mut server = Server::new_async().await;
        let read = server
            .mock("GET", "/polls/p1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("etag", "\"v1\"")
            .with_body(r#"{"totalVotes":3}"#)
            .expect(2)
            .create_async()
            .await;
        let conflict = server
            .mock("PUT", "/polls/p1")
            .match_header("if-match", "\"v1\"")
            .match_body(Matcher::PartialJson(json!({ "attempt": 1 })))
            .with_status(412)
            .expect(1)
            .create_async()
            .await;
        let accepted = server
            .mock("PUT", "/polls/p1")
            .match_header("if-match", "\"v1\"")
            .match_body(Matcher::PartialJson(json!({ "attempt": 2 })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let store = HttpStore::new(server.url());
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let bump = |current: Option<&Value>| -> LeagueResult<Value> {
            let attempt = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            let total = current.and_then(|v| v["totalVotes"].as_u64()).unwrap_or(0);
            Ok(json!({ "totalVotes": total + 1, "attempt": attempt }))
        };

        let written = store.update_with("polls", "p1", &bump).await.unwrap();
        assert_eq!(written["totalVotes"], 4);
        assert_eq!(written["attempt"], 2);
        read.assert_async().await;
        conflict.assert_async().await;
        accepted.assert_async().await;
    }

    #[tokio::test]
    async fn update_with_gives_up_after_bounded_attempts() {
        let mut server = Server::new_async().await;
        let _read = server
            .mock("GET", "/polls/p1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("etag", "\"v1\"")
            .with_body(r#"{"totalVotes":0}"#)
            .expect(MAX_UPDATE_ATTEMPTS)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/polls/p1")
            .with_status(412)
            .expect(MAX_UPDATE_ATTEMPTS)
            .create_async()
            .await;

        let store = HttpStore::new(server.url());
        let noop = |current: Option<&Value>| -> LeagueResult<Value> { Ok(current.cloned().unwrap_or_default()) };
        let err = store.update_with("polls", "p1", &noop).await.unwrap_err();
        assert!(matches!(err, LeagueError::Conflict(_)));
        put.assert_async().await;
    }

    #[tokio::test]
    async fn update_with_on_missing_document_requires_absence() {
        let mut server = Server::new_async().await;
        let _read = server.mock("GET", "/polls/new").with_status(404).create_async().await;
        let put = server
            .mock("PUT", "/polls/new")
            .match_header("if-none-match", "*")
            .with_status(201)
            .create_async()
            .await;

        let store = HttpStore::new(server.url());
        let init = |current: Option<&Value>| -> LeagueResult<Value> {
            assert!(current.is_none());
            Ok(json!({ "totalVotes": 0 }))
        };
        store.update_with("polls", "new", &init).await.unwrap();
        put.assert_async().await;
    }
}
