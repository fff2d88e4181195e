//! Startup-only bulk load of the training corpus from an Azure AI Search
//! index into the generation backend. Failures here are never fatal: the
//! server answers queries with whatever training state exists.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use tracing::warn;

use crate::backend::BackendError;
use crate::backend::SqlBackend;
use crate::backend::TrainingItem;
use crate::config::SearchConfig;

const SEARCH_API_VERSION: &str = "2023-11-01";
const SEARCH_PAGE_SIZE: u32 = 2000;

/// The one pair the generator must always know, independent of what the
/// index contains.
const CRITICAL_QUESTION: &str = "list users enrolled in courses";
const CRITICAL_SQL: &str = "SELECT u.id, CONCAT(u.firstname, ' ', u.lastname) as name, u.email, c.fullname as course_name
FROM ttl_user_enrolments e
JOIN ttl_enrol en ON e.enrolid = en.id
JOIN ttl_course c ON en.courseid = c.id
JOIN ttl_user u ON e.userid = u.id
WHERE e.status = 0 AND u.deleted = 0";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<SearchDocument>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchDocument {
    #[serde(default)]
    content: String,
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    question: String,
}

/// Load training records into the backend. Returns the number of index
/// documents ingested (the seeded critical pair is added on top). With no
/// search configuration only the seed is loaded.
pub async fn load_training_data(
    backend: &dyn SqlBackend,
    search: Option<&SearchConfig>,
) -> Result<usize, BackendError> {
    let mut count = 0;

    if let Some(search) = search {
        for document in fetch_documents(search).await? {
            let Some(item) = classify(&document) else {
                debug!("skipping unclassifiable search document");
                continue;
            };
            backend.train(item).await?;
            count += 1;
        }
    } else {
        warn!("Azure Search not configured; loading seed training data only");
    }

    backend
        .train(TrainingItem::QuestionSql {
            question: CRITICAL_QUESTION.to_string(),
            sql: CRITICAL_SQL.to_string(),
        })
        .await?;

    Ok(count)
}

async fn fetch_documents(search: &SearchConfig) -> Result<Vec<SearchDocument>, BackendError> {
    let url = format!(
        "{}/indexes/{}/docs/search?api-version={SEARCH_API_VERSION}",
        search.endpoint.trim_end_matches('/'),
        search.index
    );
    let body = json!({
        "search": "*",
        "top": SEARCH_PAGE_SIZE,
        "select": "content,content_type,question",
    });

    let response: SearchResponse = reqwest::Client::new()
        .post(&url)
        .header("api-key", &search.api_key)
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(response.value)
}

/// Decide what kind of training record a search document is. Schema dumps
/// mention a `ttl_` table inside a CREATE TABLE, query examples pair a
/// SELECT over `ttl_` tables with the question they answer, and everything
/// tagged as documentation is taken as-is. Anything else is dropped.
fn classify(document: &SearchDocument) -> Option<TrainingItem> {
    let content = document.content.trim();
    if content.is_empty() {
        return None;
    }
    let question = document.question.trim();

    if content.contains("ttl_") && content.contains("CREATE TABLE") {
        return Some(TrainingItem::Ddl(content.to_string()));
    }
    if content.to_uppercase().contains("SELECT") && content.contains("ttl_") && !question.is_empty()
    {
        return Some(TrainingItem::QuestionSql {
            question: question.to_string(),
            sql: content.to_string(),
        });
    }
    match document.content_type.to_lowercase().as_str() {
        "documentation" | "doc" => Some(TrainingItem::Documentation(content.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    #[derive(Default)]
    struct RecordingBackend {
        items: Mutex<Vec<TrainingItem>>,
    }

    #[async_trait::async_trait]
    impl SqlBackend for RecordingBackend {
        async fn generate_sql(&self, _question: &str) -> Result<String, BackendError> {
            Err(BackendError::Generation("not under test".to_string()))
        }

        async fn run_sql(&self, _sql: &str) -> Result<Vec<crate::backend::Row>, BackendError> {
            Err(BackendError::Execution("not under test".to_string()))
        }

        async fn train(&self, item: TrainingItem) -> Result<(), BackendError> {
            self.items.lock().await.push(item);
            Ok(())
        }

        async fn training_item_count(&self) -> usize {
            self.items.lock().await.len()
        }
    }

    fn document(content: &str, content_type: &str, question: &str) -> SearchDocument {
        SearchDocument {
            content: content.to_string(),
            content_type: content_type.to_string(),
            question: question.to_string(),
        }
    }

    #[test]
    fn classifies_ddl_pairs_and_documentation() {
        assert_eq!(
            classify(&document("CREATE TABLE ttl_user (id INT)", "", "")),
            Some(TrainingItem::Ddl("CREATE TABLE ttl_user (id INT)".to_string()))
        );
        assert_eq!(
            classify(&document(
                "select * from ttl_course",
                "",
                "list all courses"
            )),
            Some(TrainingItem::QuestionSql {
                question: "list all courses".to_string(),
                sql: "select * from ttl_course".to_string(),
            })
        );
        assert_eq!(
            classify(&document("Suspended users are hidden.", "Documentation", "")),
            Some(TrainingItem::Documentation(
                "Suspended users are hidden.".to_string()
            ))
        );
    }

    #[test]
    fn unclassifiable_documents_are_dropped() {
        // Empty content, pair without a question, untagged prose.
        assert_eq!(classify(&document("", "doc", "")), None);
        assert_eq!(classify(&document("SELECT 1 FROM ttl_user", "", "")), None);
        assert_eq!(classify(&document("some random text", "", "")), None);
    }

    #[tokio::test]
    async fn loader_ingests_index_documents_and_the_seed_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/vanna-totara-enhanced/docs/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    {"content": "CREATE TABLE ttl_user (id INT)", "content_type": "", "question": ""},
                    {"content": "irrelevant", "content_type": "", "question": ""},
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = Arc::new(RecordingBackend::default());
        let search = SearchConfig {
            endpoint: server.uri(),
            api_key: "test-key".to_string(),
            index: "vanna-totara-enhanced".to_string(),
        };
        let count = match load_training_data(backend.as_ref(), Some(&search)).await {
            Ok(count) => count,
            Err(e) => panic!("load failed: {e}"),
        };

        assert_eq!(count, 1);
        let items = backend.items.lock().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], TrainingItem::Ddl(_)));
        assert!(matches!(
            &items[1],
            TrainingItem::QuestionSql { question, .. } if question == CRITICAL_QUESTION
        ));
    }

    #[tokio::test]
    async fn loader_without_search_config_loads_only_the_seed() {
        let backend = RecordingBackend::default();
        let count = match load_training_data(&backend, None).await {
            Ok(count) => count,
            Err(e) => panic!("load failed: {e}"),
        };
        assert_eq!(count, 0);
        assert_eq!(backend.training_item_count().await, 1);
    }
}
