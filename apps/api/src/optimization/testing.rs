//! Fixtures shared by the optimizer, batch and handler tests.

use std::sync::Arc;

use crate::llm_client::testing::{scripted_client, RecordingSleeper, ScriptedBackend};
use crate::llm_client::BackendError;
use crate::models::job::{Job, NewJob};
use crate::models::resume::ResumeVersion;
use crate::optimization::optimizer::Optimizer;
use crate::store::memory::MemoryStore;
use crate::store::Store;

pub const JOB_DESCRIPTION: &str = "Data Engineer. Requires SQL, Airflow and ETL pipelines.";
pub const BASE_TEXT: &str = "Jane Doe\nAnalyst at Acme\nBuilt reports\n";

pub fn rewrite_reply(text: &str) -> Result<String, BackendError> {
    Ok(format!(
        "Here is the resume.\n---START_OPTIMIZED---\n{text}\n---END_OPTIMIZED---\n"
    ))
}

pub fn summary_reply(headline: &str, keywords: &[&str]) -> Result<String, BackendError> {
    let value = serde_json::json!({
        "headline": headline,
        "summary": "Surfaced data pipeline work.",
        "keywordsAdded": keywords,
    });
    Ok(format!("```json\n{value}\n```"))
}

/// A job with an optional base resume, both stored.
pub async fn seed_job(store: &MemoryStore, base_text: Option<&str>) -> (Job, Option<ResumeVersion>) {
    let resume = match base_text {
        Some(text) => Some(
            store
                .create_resume(&ResumeVersion::new(text.to_string(), vec![]))
                .await
                .unwrap(),
        ),
        None => None,
    };
    let job = Job::new(NewJob {
        client_name: "Jane Doe".to_string(),
        company_name: "Acme".to_string(),
        position: "Data Engineer".to_string(),
        job_description: JOB_DESCRIPTION.to_string(),
        application_link: None,
        base_resume_id: resume.as_ref().map(|r| r.id),
    });
    let job = store.create_job(&job).await.unwrap();
    (job, resume)
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub backend: Arc<ScriptedBackend>,
    pub sleeper: Arc<RecordingSleeper>,
    pub optimizer: Optimizer,
}

pub fn harness(replies: Vec<Result<String, BackendError>>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(ScriptedBackend::new(replies));
    let (client, sleeper) = scripted_client(backend.clone());
    let optimizer = Optimizer::new(store.clone(), client);
    Harness {
        store,
        backend,
        sleeper,
        optimizer,
    }
}
