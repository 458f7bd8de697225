//! Client for the HTTP article API.
//!
//! Every response is wrapped in `{result, data, error}`; any `result` other
//! than `"SUCCESS"` is a failure. Article ids are numeric on the wire and
//! become string `id`/`external_id` values on [`Note`].

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::NoteStore;
use crate::error::StoreError;
use crate::notes::{Note, NoteDraft};

const SUCCESS: &str = "SUCCESS";
const NOT_FOUND: &str = "NOT_FOUND";

/// Error body inside a failed envelope.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RemoteFault {
	/// Machine-readable error code, e.g. `NOT_FOUND`.
	#[serde(default)]
	pub code: String,
	/// Human-readable description.
	#[serde(default)]
	pub message: String,
}

/// Response wrapper used by every endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
	/// `"SUCCESS"` or a failure marker.
	pub result: String,
	/// Payload, present on success.
	pub data: Option<T>,
	/// Fault details, present on failure.
	pub error: Option<RemoteFault>,
}

impl<T> Envelope<T> {
	/// Checks `result` and returns the (possibly absent) payload.
	pub fn into_data(self) -> Result<Option<T>, StoreError> {
		if self.result == SUCCESS {
			return Ok(self.data);
		}
		let fault = self.error.unwrap_or_default();
		Err(StoreError::Remote {
			code: if fault.code.is_empty() {
				self.result
			} else {
				fault.code
			},
			message: fault.message,
		})
	}

	/// Like [`into_data`](Self::into_data) but a missing payload is an error.
	pub fn into_required(self) -> Result<T, StoreError> {
		self.into_data()?.ok_or_else(|| StoreError::Remote {
			code: "EMPTY_DATA".into(),
			message: "response carried no data".into(),
		})
	}
}

/// Article reference inside `relateArticles`.
#[derive(Clone, Debug, Deserialize)]
pub struct ArticleRef {
	/// Referenced article.
	pub id: i64,
	/// Its title, informational only.
	#[serde(default)]
	pub title: String,
}

/// Article as returned by list and detail endpoints.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
	/// Numeric article key.
	pub id: i64,
	/// Article title.
	pub title: String,
	/// Article body.
	#[serde(default)]
	pub content: String,
	/// Creation time as sent by the server.
	#[serde(default)]
	pub created_at: Option<String>,
	/// Last modification time as sent by the server.
	#[serde(default)]
	pub updated_at: Option<String>,
	/// Related articles; absent in some list responses.
	#[serde(default)]
	pub relate_articles: Option<Vec<ArticleRef>>,
}

impl From<ArticleResponse> for Note {
	fn from(article: ArticleResponse) -> Self {
		let id = article.id.to_string();
		Note {
			external_id: id.clone(),
			id,
			title: article.title,
			content: article.content,
			created_at: article.created_at.unwrap_or_default(),
			updated_at: article.updated_at.unwrap_or_default(),
			related_ids: article
				.relate_articles
				.unwrap_or_default()
				.into_iter()
				.map(|related| related.id.to_string())
				.collect(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct ArticleList {
	#[serde(default)]
	articles: Vec<ArticleResponse>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct RelateIds {
	article_ids: Vec<i64>,
}

/// Body for create and update.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ArticleRequest<'a> {
	title: &'a str,
	content: &'a str,
	relate_article_ids: RelateIds,
}

impl<'a> ArticleRequest<'a> {
	fn from_draft(draft: &'a NoteDraft) -> Result<Self, StoreError> {
		draft.validate()?;
		let mut article_ids = Vec::with_capacity(draft.related_ids.len());
		for related in &draft.related_ids {
			let id = related.trim().parse::<i64>().map_err(|_| {
				StoreError::InvalidDraft(format!("related id {related:?} is not an article id"))
			})?;
			if !article_ids.contains(&id) {
				article_ids.push(id);
			}
		}
		Ok(Self {
			title: &draft.title,
			content: &draft.content,
			relate_article_ids: RelateIds { article_ids },
		})
	}
}

/// Create may answer with the new article, its id, or nothing useful.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Created {
	Article(ArticleResponse),
	Id(i64),
	Other(serde_json::Value),
}

fn not_found_for(id: &str, err: StoreError) -> StoreError {
	match err {
		StoreError::Remote { ref code, .. } if code == NOT_FOUND || code.ends_with("_NOT_FOUND") => {
			StoreError::NotFound(id.into())
		}
		other => other,
	}
}

/// [`NoteStore`] backed by the article service at `base_url`.
#[derive(Clone, Debug)]
pub struct RemoteNoteStore {
	client: Client,
	base_url: String,
}

impl RemoteNoteStore {
	/// Client for the service at `base_url`, e.g. `http://localhost:8080/api`.
	pub fn new(base_url: impl Into<String>) -> Self {
		Self::with_client(Client::new(), base_url)
	}

	/// Same as [`new`](Self::new) with a preconfigured client.
	pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
		let base_url = base_url.into().trim_end_matches('/').to_string();
		Self { client, base_url }
	}

	/// Base URL without a trailing slash.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	fn article_url(&self, id: &str) -> String {
		self.url(&format!("/articles/{}", id.trim()))
	}

	/// Sends `request` and decodes the envelope with [`decode_response`].
	async fn send<T: DeserializeOwned>(
		&self,
		request: RequestBuilder,
		id: Option<&str>,
	) -> Result<Envelope<T>, StoreError> {
		let response = request.send().await?;
		let status = response.status();
		let body = response.text().await?;
		debug!("rhizome: article api answered {status}");
		decode_response(status, &body, id)
	}
}

/// Maps an HTTP answer to an envelope or an error.
///
/// A 404 for a single article (`id` given) is `NotFound` whatever the body
/// says. Otherwise a parseable envelope wins; an unparseable body is a
/// `Remote` error on a failure status and a `Parse` error on success.
fn decode_response<T: DeserializeOwned>(
	status: StatusCode,
	body: &str,
	id: Option<&str>,
) -> Result<Envelope<T>, StoreError> {
	if status == StatusCode::NOT_FOUND {
		if let Some(id) = id {
			return Err(StoreError::NotFound(id.to_string()));
		}
	}
	match serde_json::from_str::<Envelope<T>>(body) {
		Ok(envelope) => Ok(envelope),
		Err(_) if !status.is_success() => Err(StoreError::Remote {
			code: status.as_u16().to_string(),
			message: status.canonical_reason().unwrap_or_default().to_string(),
		}),
		Err(err) => Err(err.into()),
	}
}

#[async_trait(?Send)]
impl NoteStore for RemoteNoteStore {
	async fn list(&self) -> Result<Vec<Note>, StoreError> {
		let envelope: Envelope<ArticleList> =
			self.send(self.client.get(self.url("/articles")), None).await?;
		let list = envelope.into_data()?.map(|list| list.articles).unwrap_or_default();
		Ok(list.into_iter().map(Note::from).collect())
	}

	async fn get(&self, id: &str) -> Result<Note, StoreError> {
		let envelope: Envelope<ArticleResponse> =
			self.send(self.client.get(self.article_url(id)), Some(id)).await?;
		envelope
			.into_required()
			.map(Note::from)
			.map_err(|err| not_found_for(id, err))
	}

	async fn create(&self, draft: NoteDraft) -> Result<Note, StoreError> {
		let body = ArticleRequest::from_draft(&draft)?;
		let envelope: Envelope<Created> = self
			.send(self.client.post(self.url("/articles")).json(&body), None)
			.await?;
		match envelope.into_required()? {
			Created::Article(article) => Ok(article.into()),
			Created::Id(id) => self.get(&id.to_string()).await,
			Created::Other(value) => {
				warn!("rhizome: unexpected create response: {value}");
				Err(StoreError::Remote {
					code: "UNEXPECTED_RESPONSE".into(),
					message: "create did not return an article".into(),
				})
			}
		}
	}

	async fn update(&self, id: &str, draft: NoteDraft) -> Result<Note, StoreError> {
		let body = ArticleRequest::from_draft(&draft)?;
		let envelope: Envelope<serde_json::Value> = self
			.send(self.client.put(self.article_url(id)).json(&body), Some(id))
			.await?;
		envelope.into_data().map_err(|err| not_found_for(id, err))?;
		self.get(id).await
	}

	async fn delete(&self, id: &str) -> Result<(), StoreError> {
		let envelope: Envelope<serde_json::Value> = self
			.send(self.client.delete(self.article_url(id)), Some(id))
			.await?;
		envelope.into_data().map_err(|err| not_found_for(id, err))?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn list_envelope_normalizes_numeric_ids() {
		let body = r#"{
			"result": "SUCCESS",
			"data": {"articles": [
				{"id": 1, "title": "A", "content": "x", "relateArticles": [{"id": 2, "title": "B"}]},
				{"id": 2, "title": "B", "content": "y", "relateArticles": []}
			]},
			"error": null
		}"#;
		let envelope: Envelope<ArticleList> = serde_json::from_str(body).unwrap();
		let notes: Vec<Note> = envelope
			.into_required()
			.unwrap()
			.articles
			.into_iter()
			.map(Note::from)
			.collect();
		assert_eq!(notes[0].id, "1");
		assert_eq!(notes[0].external_id, "1");
		assert_eq!(notes[0].related_ids, ["2"]);
		assert!(notes[1].related_ids.is_empty());
	}

	#[test]
	fn detail_without_relations_has_no_related_ids() {
		let body = r#"{"result":"SUCCESS","data":{"id":7,"title":"T","content":"c","createdAt":"2024-01-01T00:00:00","updatedAt":"2024-01-02T00:00:00"},"error":null}"#;
		let envelope: Envelope<ArticleResponse> = serde_json::from_str(body).unwrap();
		let note = Note::from(envelope.into_required().unwrap());
		assert_eq!(note.id, "7");
		assert_eq!(note.created_at, "2024-01-01T00:00:00");
		assert!(note.related_ids.is_empty());
	}

	#[test]
	fn failed_envelope_surfaces_remote_error() {
		let body = r#"{"result":"FAIL","data":null,"error":{"code":"E500","message":"boom","data":{}}}"#;
		let envelope: Envelope<ArticleList> = serde_json::from_str(body).unwrap();
		match envelope.into_data() {
			Err(StoreError::Remote { code, message }) => {
				assert_eq!(code, "E500");
				assert_eq!(message, "boom");
			}
			other => panic!("expected remote error, got {other:?}"),
		}
	}

	#[test]
	fn failed_envelope_without_error_body_uses_result() {
		let envelope: Envelope<ArticleList> =
			serde_json::from_str(r#"{"result":"FAIL","data":null,"error":null}"#).unwrap();
		assert!(matches!(
			envelope.into_data(),
			Err(StoreError::Remote { code, .. }) if code == "FAIL"
		));
	}

	#[test]
	fn not_found_code_maps_to_not_found() {
		let err = StoreError::Remote {
			code: NOT_FOUND.into(),
			message: String::new(),
		};
		assert!(not_found_for("3", err).is_not_found());
	}

	#[test]
	fn prefixed_not_found_code_maps_to_not_found() {
		let err = StoreError::Remote {
			code: "ARTICLE_NOT_FOUND".into(),
			message: String::new(),
		};
		assert!(not_found_for("3", err).is_not_found());
	}

	#[test]
	fn missing_article_status_wins_over_envelope() {
		let body = r#"{"result":"FAIL","data":null,"error":{"code":"ARTICLE_NOT_FOUND","message":"gone"}}"#;
		let decoded = decode_response::<ArticleResponse>(StatusCode::NOT_FOUND, body, Some("9"));
		assert!(matches!(decoded, Err(StoreError::NotFound(id)) if id == "9"));

		let bare = decode_response::<ArticleResponse>(StatusCode::NOT_FOUND, "Not Found", Some("9"));
		assert!(matches!(bare, Err(StoreError::NotFound(_))));
	}

	#[test]
	fn collection_not_found_is_a_remote_error() {
		let decoded = decode_response::<ArticleList>(StatusCode::NOT_FOUND, "<html>", None);
		assert!(matches!(decoded, Err(StoreError::Remote { code, .. }) if code == "404"));
	}

	#[test]
	fn failure_status_with_envelope_keeps_the_fault() {
		let body = r#"{"result":"FAIL","data":null,"error":{"code":"E500","message":"boom"}}"#;
		let envelope =
			decode_response::<ArticleList>(StatusCode::INTERNAL_SERVER_ERROR, body, None).unwrap();
		assert!(matches!(envelope.into_data(), Err(StoreError::Remote { code, .. }) if code == "E500"));
	}

	#[test]
	fn unparseable_bodies_depend_on_status() {
		let failed = decode_response::<ArticleList>(StatusCode::BAD_GATEWAY, "upstream down", None);
		assert!(matches!(failed, Err(StoreError::Remote { code, .. }) if code == "502"));

		let garbled = decode_response::<ArticleList>(StatusCode::OK, "{", None);
		assert!(matches!(garbled, Err(StoreError::Parse(_))));
	}

	#[test]
	fn success_without_data_is_required_error() {
		let envelope: Envelope<ArticleResponse> =
			serde_json::from_str(r#"{"result":"SUCCESS","data":null,"error":null}"#).unwrap();
		assert!(matches!(envelope.into_required(), Err(StoreError::Remote { .. })));
	}

	#[test]
	fn request_body_uses_numeric_relation_ids() {
		let draft = NoteDraft::new("Title", "Body").with_related(["2", " 3 ", "2"]);
		let body = ArticleRequest::from_draft(&draft).unwrap();
		assert_eq!(
			serde_json::to_value(&body).unwrap(),
			serde_json::json!({
				"title": "Title",
				"content": "Body",
				"relateArticleIds": {"articleIds": [2, 3]}
			})
		);
	}

	#[test]
	fn non_numeric_relation_ids_are_rejected() {
		let draft = NoteDraft::new("Title", "Body").with_related(["abc"]);
		assert!(matches!(
			ArticleRequest::from_draft(&draft),
			Err(StoreError::InvalidDraft(_))
		));
	}

	#[test]
	fn create_response_variants() {
		let by_id: Envelope<Created> =
			serde_json::from_str(r#"{"result":"SUCCESS","data":12,"error":null}"#).unwrap();
		assert!(matches!(by_id.into_required(), Ok(Created::Id(12))));

		let by_article: Envelope<Created> =
			serde_json::from_str(r#"{"result":"SUCCESS","data":{"id":5,"title":"X"},"error":null}"#)
				.unwrap();
		assert!(matches!(by_article.into_required(), Ok(Created::Article(a)) if a.id == 5));
	}

	#[test]
	fn base_url_trailing_slash_is_trimmed() {
		let store = RemoteNoteStore::new("http://localhost:8080/api/");
		assert_eq!(store.article_url("4"), "http://localhost:8080/api/articles/4");
	}
}
