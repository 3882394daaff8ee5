//! HTTP client for the remote training service.
//!
//! Speaks the Custom Vision training REST API (v3.3). Every call carries the
//! training key in the `Training-Key` header. Responses are decoded into the
//! small wire structs below and converted to crate types at the edge.

use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{
    BatchResponse, BatchSink, ItemResult, ItemStatus, LabelId, LabelRegistry, Tag, UploadEntry,
    UploadMode,
};
use crate::error::CocoliftError;

const API_PREFIX: &str = "customvision/v3.3/training";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProject {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDomain {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTag {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRegion<'a> {
    tag_id: &'a str,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireImageEntry<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tag_ids: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    regions: Vec<WireRegion<'a>>,
}

#[derive(Debug, Serialize)]
struct WireImageBatch<'a> {
    images: Vec<WireImageEntry<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCreateSummary {
    is_batch_successful: bool,
    #[serde(default)]
    images: Vec<WireImageResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireImageResult {
    #[serde(default)]
    source_url: String,
    status: String,
}

fn batch_body(entries: &[UploadEntry]) -> WireImageBatch<'_> {
    let images = entries
        .iter()
        .map(|entry| match entry {
            UploadEntry::Classification { url, label_ids } => WireImageEntry {
                url,
                tag_ids: label_ids.iter().map(LabelId::as_str).collect(),
                regions: Vec::new(),
            },
            UploadEntry::Detection { url, regions } => WireImageEntry {
                url,
                tag_ids: Vec::new(),
                regions: regions
                    .iter()
                    .map(|r| WireRegion {
                        tag_id: r.label_id.as_str(),
                        left: r.left,
                        top: r.top,
                        width: r.width,
                        height: r.height,
                    })
                    .collect(),
            },
        })
        .collect();
    WireImageBatch { images }
}

fn batch_response(summary: WireCreateSummary) -> BatchResponse {
    BatchResponse {
        overall_success: summary.is_batch_successful,
        items: summary
            .images
            .into_iter()
            .map(|image| ItemResult {
                source_url: image.source_url,
                status: ItemStatus::from_service(&image.status),
            })
            .collect(),
    }
}

/// Pick the domain a new project is created in.
///
/// Detection projects use the first object-detection domain. Classification
/// projects prefer a compact (exportable) classification domain and fall back
/// to any classification domain.
fn choose_domain(domains: &[WireDomain], mode: UploadMode) -> Option<&WireDomain> {
    match mode {
        UploadMode::Detection => domains.iter().find(|d| d.kind == "ObjectDetection"),
        UploadMode::Classification => {
            let mut classification = domains.iter().filter(|d| d.kind == "Classification");
            classification
                .clone()
                .find(|d| d.name.to_lowercase().contains("compact"))
                .or_else(|| classification.next())
        }
    }
}

/// Blocking client bound to one endpoint, key and (once resolved) project.
pub struct CustomVisionClient {
    agent: ureq::Agent,
    base: url::Url,
    training_key: String,
    project_id: Option<String>,
}

impl CustomVisionClient {
    /// # Errors
    /// [`CocoliftError::Remote`] if `endpoint` is not an absolute http(s) URL.
    pub fn new(endpoint: &str, training_key: &str) -> Result<Self, CocoliftError> {
        let invalid = |message: String| CocoliftError::Remote {
            operation: "configure client".to_string(),
            message,
        };

        let mut endpoint = endpoint.trim().to_string();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let parsed = url::Url::parse(&endpoint)
            .map_err(|source| invalid(format!("invalid endpoint '{endpoint}': {source}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(invalid(format!("endpoint '{endpoint}' is not an http(s) URL")));
        }
        let base = parsed
            .join(&format!("{API_PREFIX}/"))
            .map_err(|source| invalid(source.to_string()))?;

        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();

        Ok(Self {
            agent: config.into(),
            base,
            training_key: training_key.to_string(),
            project_id: None,
        })
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Bind the client to an existing project id without looking it up.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Find the project called `name`, or create it in a domain that fits `mode`.
    pub fn ensure_project(&mut self, name: &str, mode: UploadMode) -> Result<&str, CocoliftError> {
        let projects: Vec<WireProject> = self.get_json("list projects", "projects")?;
        let project_id = match projects.into_iter().find(|p| p.name == name) {
            Some(project) => {
                info!("Using existing project '{}' ({})", project.name, project.id);
                project.id
            }
            None => {
                let domains: Vec<WireDomain> = self.get_json("list domains", "domains")?;
                let domain =
                    choose_domain(&domains, mode).ok_or_else(|| CocoliftError::Remote {
                        operation: "create project".to_string(),
                        message: format!("service offers no domain for {mode} projects"),
                    })?;
                debug!("creating project in domain '{}' ({})", domain.name, domain.id);

                let mut url = self.endpoint("create project", "projects")?;
                url.query_pairs_mut()
                    .append_pair("name", name)
                    .append_pair("domainId", &domain.id);
                let project: WireProject = self.post_json("create project", url, None::<&()>)?;
                info!("Created project '{}' ({})", project.name, project.id);
                project.id
            }
        };
        Ok(self.project_id.insert(project_id).as_str())
    }

    fn project_path(&self, operation: &str, tail: &str) -> Result<String, CocoliftError> {
        let project = self
            .project_id
            .as_deref()
            .ok_or_else(|| CocoliftError::Remote {
                operation: operation.to_string(),
                message: "no project selected".to_string(),
            })?;
        Ok(format!("projects/{project}/{tail}"))
    }

    fn endpoint(&self, operation: &str, path: &str) -> Result<url::Url, CocoliftError> {
        self.base.join(path).map_err(|source| CocoliftError::Remote {
            operation: operation.to_string(),
            message: source.to_string(),
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
    ) -> Result<T, CocoliftError> {
        let url = self.endpoint(operation, path)?;
        debug!("GET {url}");
        let remote = |message: String| CocoliftError::Remote {
            operation: operation.to_string(),
            message,
        };
        let mut response = self
            .agent
            .get(url.as_str())
            .header("Training-Key", &self.training_key)
            .call()
            .map_err(|source| remote(source.to_string()))?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|source| remote(source.to_string()))
    }

    fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        url: url::Url,
        body: Option<&B>,
    ) -> Result<T, CocoliftError> {
        debug!("POST {url}");
        let remote = |message: String| CocoliftError::Remote {
            operation: operation.to_string(),
            message,
        };
        let request = self
            .agent
            .post(url.as_str())
            .header("Training-Key", &self.training_key);
        let sent = match body {
            Some(body) => request.send_json(body),
            None => request.send_empty(),
        };
        let mut response = sent.map_err(|source| remote(source.to_string()))?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|source| remote(source.to_string()))
    }
}

impl LabelRegistry for CustomVisionClient {
    fn list_tags(&mut self) -> Result<Vec<Tag>, CocoliftError> {
        let path = self.project_path("list tags", "tags")?;
        let tags: Vec<WireTag> = self.get_json("list tags", &path).map_err(registry_error)?;
        Ok(tags
            .into_iter()
            .map(|t| Tag {
                id: LabelId::new(t.id),
                name: t.name,
            })
            .collect())
    }

    fn create_tag(&mut self, name: &str) -> Result<Tag, CocoliftError> {
        let path = self.project_path("create tag", "tags")?;
        let mut url = self.endpoint("create tag", &path)?;
        url.query_pairs_mut().append_pair("name", name);
        let tag: WireTag = self
            .post_json("create tag", url, None::<&()>)
            .map_err(registry_error)?;
        Ok(Tag {
            id: LabelId::new(tag.id),
            name: tag.name,
        })
    }
}

impl BatchSink for CustomVisionClient {
    fn submit(&mut self, batch: &[UploadEntry]) -> Result<BatchResponse, CocoliftError> {
        let path = self.project_path("create images", "images/urls")?;
        let url = self.endpoint("create images", &path)?;
        let body = batch_body(batch);
        let summary: WireCreateSummary = self.post_json("create images", url, Some(&body))?;
        Ok(batch_response(summary))
    }
}

fn registry_error(err: CocoliftError) -> CocoliftError {
    match err {
        CocoliftError::Remote { operation, message } => CocoliftError::LabelRegistry {
            message: format!("{operation}: {message}"),
        },
        other => other,
    }
}
