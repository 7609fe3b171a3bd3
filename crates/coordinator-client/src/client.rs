//! Typed CRUD + list/count façade over the coordinator's REST-like API
//! (spec §6). Grounded on `client-engine/src/backend.rs`'s `fetch_work`/
//! `submit_job`: build a URL under the base, attach the API key, send JSON,
//! branch on status before decoding the body.

use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Error;
use crate::query::Where;

const API_KEY_HEADER: &str = "Authorization";
const MAX_TRANSIENT_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Response shape for `find`: a page of documents plus the total count.
#[derive(Debug, serde::Deserialize)]
pub struct ListResponse<T> {
    pub docs: Vec<T>,
    #[serde(rename = "totalDocs")]
    pub total_docs: u64,
}

#[derive(Debug, serde::Deserialize)]
pub struct CountResponse {
    #[serde(rename = "totalDocs")]
    pub total_docs: u64,
}

#[derive(Debug, serde::Deserialize)]
pub struct MeResponse<T> {
    pub user: Option<T>,
}

/// Optional parameters for `find`.
#[derive(Debug, Default, Clone)]
pub struct FindOptions {
    pub r#where: Option<Where>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

/// An in-memory file to attach to `create` as multipart (spec §6: "Multipart
/// when blob present").
pub struct FileUpload {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Typed façade over the coordinator's HTTP API.
#[derive(Clone)]
pub struct CoordinatorClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl CoordinatorClient {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn collection_url(&self, collection: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("api/{collection}"))?)
    }

    fn doc_url(&self, collection: &str, id: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("api/{collection}/{id}"))?)
    }

    fn authed(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(API_KEY_HEADER, format!("users API-Key {}", self.api_key))
    }

    /// `GET /me` — authenticates the client and returns the worker record.
    pub async fn me<T: DeserializeOwned>(&self) -> Result<MeResponse<T>, Error> {
        let url = self.base_url.join("api/users/me")?;
        self.execute(self.authed(Method::GET, url)).await
    }

    pub async fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        opts: &FindOptions,
    ) -> Result<ListResponse<T>, Error> {
        let mut url = self.collection_url(collection)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(w) = &opts.r#where {
                for (k, v) in w.to_query_pairs() {
                    pairs.append_pair(&k, &v);
                }
            }
            if let Some(limit) = opts.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(sort) = &opts.sort {
                pairs.append_pair("sort", sort);
            }
        }
        self.execute_with_retry(|| self.authed(Method::GET, url.clone()))
            .await
    }

    pub async fn find_by_id<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<T, Error> {
        let url = self.doc_url(collection, id)?;
        self.execute_with_retry(|| self.authed(Method::GET, url.clone()))
            .await
    }

    pub async fn count(&self, collection: &str, r#where: Option<&Where>) -> Result<CountResponse, Error> {
        let mut url = self.collection_url(collection)?;
        url.path_segments_mut()
            .map_err(|_| Error::Unexpected {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "cannot append path segment".into(),
            })?
            .push("count");
        if let Some(w) = r#where {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in w.to_query_pairs() {
                pairs.append_pair(&k, &v);
            }
        }
        self.execute_with_retry(|| self.authed(Method::GET, url.clone()))
            .await
    }

    pub async fn create<T: DeserializeOwned, D: Serialize>(
        &self,
        collection: &str,
        data: &D,
        file: Option<FileUpload>,
    ) -> Result<T, Error> {
        let url = self.collection_url(collection)?;

        let req = if let Some(file) = file {
            let body = serde_json::to_value(data)?;
            let json_part =
                reqwest::multipart::Part::text(body.to_string()).mime_str("application/json")?;
            let file_part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.content_type)?;
            let form = reqwest::multipart::Form::new()
                .part("_payload", json_part)
                .part(file.field_name, file_part);
            self.authed(Method::POST, url).multipart(form)
        } else {
            self.authed(Method::POST, url).json(data)
        };

        self.execute(req).await
    }

    pub async fn update_by_id<T: DeserializeOwned, D: Serialize>(
        &self,
        collection: &str,
        id: &str,
        data: &D,
        headers: &[(&str, &str)],
    ) -> Result<T, Error> {
        let url = self.doc_url(collection, id)?;
        let mut req = self.authed(Method::PATCH, url).json(data);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        self.execute(req).await
    }

    /// Bulk update; returns the first matched document. Used by submit's
    /// completion writes and by the claim engine's conditional claim update.
    pub async fn update_by_where<T: DeserializeOwned, D: Serialize>(
        &self,
        collection: &str,
        r#where: &Where,
        data: &D,
    ) -> Result<T, Error> {
        let mut url = self.collection_url(collection)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in r#where.to_query_pairs() {
                pairs.append_pair(&k, &v);
            }
        }
        let req = self.authed(Method::PATCH, url).json(data);
        self.execute(req).await
    }

    pub async fn delete(&self, collection: &str, r#where: &Where) -> Result<(), Error> {
        let mut url = self.collection_url(collection)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in r#where.to_query_pairs() {
                pairs.append_pair(&k, &v);
            }
        }
        let res = self.authed(Method::DELETE, url).send().await?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        classify_body_status(status, &body)
    }

    async fn execute<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, Error> {
        let res = req.send().await?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        classify_body_status(status, &body)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Like [`Self::execute`] but retries transient failures a bounded
    /// number of times (§7: "Retry with backoff inside the call path up to a
    /// small bounded count"). `build` is called again on every attempt
    /// because `reqwest::RequestBuilder` is not `Clone`-then-`send`-safe
    /// after consumption.
    async fn execute_with_retry<T, F>(&self, build: F) -> Result<T, Error>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match self.execute(build()).await {
                Ok(v) => return Ok(v),
                Err(err) if err.is_retryable() && attempt < MAX_TRANSIENT_RETRIES => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %err, "transient coordinator error, retrying");
                    tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn classify_body_status(status: StatusCode, body: &str) -> Result<(), Error> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::NOT_FOUND => Err(Error::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized),
        s if s.is_server_error() => Err(Error::Transient(format!("{s}: {body}"))),
        StatusCode::TOO_MANY_REQUESTS => Err(Error::Transient(format!("rate limited: {body}"))),
        s => Err(Error::Unexpected {
            status: s,
            body: body.to_string(),
        }),
    }
}

/// True when `attempt_claim` should interpret a rejected conditional update
/// as a lost race rather than a hard error (§9 open question).
pub fn is_claim_rejection(err: &Error) -> bool {
    matches!(err, Error::Unexpected { .. } | Error::ClaimRejected)
}
