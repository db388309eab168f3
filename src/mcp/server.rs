use std::fmt::Write as _;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ListResourceTemplatesResult, ListResourcesResult,
        PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
        ReadResourceRequestParams, ReadResourceResult, Resource, ResourceContents,
        ResourceTemplate, ServerCapabilities, ServerInfo,
    },
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::adapters::batch::{BatchOptions, reextract};
use crate::adapters::scraper::project_parser::{ExtractOptions, extract_project};
use crate::config::types::BatchConfig;
use crate::domain::description::render_badges;
use crate::ports::image_fetcher::ImageFetcher;
use crate::ports::project_source::ProjectSource;
use crate::ports::project_store::{ProjectStore, StoredProject, UpsertOutcome};

const PROJECT_URI_PREFIX: &str = "catalog://project/";
const MAX_BATCH_SIZE: usize = 200;

fn project_uri(project_id: u64) -> String {
    format!("{PROJECT_URI_PREFIX}{project_id}")
}

fn parse_project_uri(uri: &str) -> Option<u64> {
    uri.strip_prefix(PROJECT_URI_PREFIX)?.parse().ok()
}

fn error_result(message: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message)])
}

// ---------- Tool parameter types ----------

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ParseProjectToolParams {
    /// Numeric project id from the project page URL (`/project/{id}`)
    pub project_id: u64,
    /// Extract even if the page does not belong to the configured contractor
    pub skip_eligibility_check: Option<bool>,
    /// Drop the cached page and download it again
    pub refresh: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ParseBatchToolParams {
    /// Project ids to re-extract, in order (at most 200)
    pub project_ids: Vec<u64>,
    /// Extract even if a page does not belong to the configured contractor
    pub skip_eligibility_check: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ExtractHtmlToolParams {
    /// Full HTML of a project page
    pub html: String,
    /// Project id the page belongs to
    pub project_id: u64,
    /// Extract even if the page does not belong to the configured contractor
    pub skip_eligibility_check: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ProjectIdToolParams {
    /// Project id of a stored project
    pub project_id: u64,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ProjectImageToolParams {
    /// Absolute photo or floor plan URL
    pub url: String,
}

// ---------- MCP Server ----------

#[derive(Clone)]
pub struct CatalogMcpServer {
    source: Arc<dyn ProjectSource>,
    store: Arc<dyn ProjectStore>,
    images: Arc<dyn ImageFetcher>,
    options: ExtractOptions,
    batch: BatchConfig,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CatalogMcpServer {
    pub fn new(
        source: Arc<dyn ProjectSource>,
        store: Arc<dyn ProjectStore>,
        images: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            source,
            store,
            images,
            options: ExtractOptions::default(),
            batch: BatchConfig::default(),
            tool_router: Self::tool_router(),
        }
    }

    #[must_use]
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_batch_config(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    fn stored(&self, project_id: u64) -> Result<StoredProject, CallToolResult> {
        match self.store.get(project_id) {
            Ok(Some(project)) => Ok(project),
            Ok(None) => Err(error_result(format!(
                "Project {project_id} is not in the catalog. Run catalog_parse_project first."
            ))),
            Err(e) => Err(error_result(format!(
                "Failed to read project {project_id}: {e}"
            ))),
        }
    }

    /// Download a project page, extract it and store the record.
    #[tool(
        name = "catalog_parse_project",
        description = "Download a project page from строим.дом.рф, extract area, material, price, bedrooms, amenities, photos and floor plans, and save the result to the catalog. Pages of other contractors are rejected unless skip_eligibility_check is set. Use refresh to bypass the page cache.",
        annotations(open_world_hint = true)
    )]
    async fn catalog_parse_project(
        &self,
        Parameters(params): Parameters<ParseProjectToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let project_id = params.project_id;
        if params.refresh.unwrap_or(false) {
            self.source.invalidate(project_id);
        }

        let record = match self
            .source
            .fetch_project(project_id, params.skip_eligibility_check.unwrap_or(false))
            .await
        {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Ok(error_result(format!(
                    "Project {project_id} does not belong to the configured contractor. \
                     Pass skip_eligibility_check to extract it anyway."
                )));
            }
            Err(e) => {
                return Ok(error_result(format!(
                    "Failed to fetch project {project_id}: {e}"
                )));
            }
        };

        let text = record.to_string();
        match self.store.upsert(record) {
            Ok(outcome) => {
                let verb = match outcome {
                    UpsertOutcome::Created => "Created",
                    UpsertOutcome::Updated => "Updated",
                };
                info!(project_id, ?outcome, "Project parsed");
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "{verb} {}\n\n{text}",
                    project_uri(project_id)
                ))]))
            }
            Err(e) => Ok(error_result(format!(
                "Project {project_id} was extracted but could not be saved: {e}"
            ))),
        }
    }

    /// Re-extract many projects, spaced out to stay polite to the site.
    #[tool(
        name = "catalog_parse_batch",
        description = "Re-extract a list of projects into the catalog, one page at a time with a delay between downloads. Never stops on a single failure; returns how many were created, updated and which ids failed.",
        annotations(open_world_hint = true)
    )]
    async fn catalog_parse_batch(
        &self,
        Parameters(params): Parameters<ParseBatchToolParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.project_ids.is_empty() {
            return Ok(error_result("project_ids must not be empty".into()));
        }
        if params.project_ids.len() > MAX_BATCH_SIZE {
            return Ok(error_result(format!(
                "At most {MAX_BATCH_SIZE} projects per batch, got {}",
                params.project_ids.len()
            )));
        }

        let options =
            BatchOptions::from_config(&self.batch, params.skip_eligibility_check.unwrap_or(false));
        let report = reextract(
            self.source.as_ref(),
            self.store.as_ref(),
            &params.project_ids,
            &options,
        )
        .await;
        Ok(CallToolResult::success(vec![Content::text(
            report.to_string(),
        )]))
    }

    /// Run the extractor on HTML supplied by the caller. Nothing is stored.
    #[tool(
        name = "catalog_extract_html",
        description = "Extract a project record from raw page HTML without downloading anything or touching the catalog. Returns the record as JSON.",
        annotations(read_only_hint = true)
    )]
    async fn catalog_extract_html(
        &self,
        Parameters(params): Parameters<ExtractHtmlToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let skip = params.skip_eligibility_check.unwrap_or(false)
            || self.options.skip_eligibility_check;
        let options = self.options.clone().skipping_eligibility(skip);
        match extract_project(&params.html, params.project_id, &options) {
            Some(record) => match serde_json::to_string_pretty(&record) {
                Ok(json) => Ok(CallToolResult::success(vec![Content::text(json)])),
                Err(e) => Ok(error_result(format!("Failed to serialize record: {e}"))),
            },
            None => Ok(error_result(format!(
                "Page of project {} does not belong to the configured contractor",
                params.project_id
            ))),
        }
    }

    /// Stored record with its bookkeeping fields.
    #[tool(
        name = "catalog_project_details",
        description = "Show a project already saved in the catalog: extracted fields, photos, floor plans, when it was parsed and whether it was posted to the channel.",
        annotations(read_only_hint = true)
    )]
    async fn catalog_project_details(
        &self,
        Parameters(params): Parameters<ProjectIdToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let project = match self.stored(params.project_id) {
            Ok(project) => project,
            Err(result) => return Ok(result),
        };

        let mut text = project.record.to_string();
        let _ = writeln!(
            text,
            "\nParsed at: {}",
            project.parsed_at.format("%Y-%m-%d %H:%M UTC")
        );
        let _ = writeln!(
            text,
            "Posted to channel: {}",
            if project.posted_to_channel { "yes" } else { "no" }
        );
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "catalog_render_description",
        description = "Render the badge line and the generated Russian description of a stored project, rebuilt from its current fields.",
        annotations(read_only_hint = true)
    )]
    async fn catalog_render_description(
        &self,
        Parameters(params): Parameters<ProjectIdToolParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.stored(params.project_id) {
            Ok(project) => {
                let badges = render_badges(&project.record);
                Ok(CallToolResult::success(vec![
                    Content::text(project.record.generated_description),
                    Content::text(format!("Badges: {badges}")),
                ]))
            }
            Err(result) => Ok(result),
        }
    }

    /// Download a photo or plan, through the browser when the host blocks plain HTTP.
    #[tool(
        name = "catalog_project_image",
        description = "Download a project photo or floor plan by URL and return it as an image. Falls back to a headless browser when the image host refuses direct downloads (if enabled).",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    async fn catalog_project_image(
        &self,
        Parameters(params): Parameters<ProjectImageToolParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.images.fetch_image(&params.url).await {
            Ok(Some(image)) => Ok(CallToolResult::success(vec![Content::image(
                STANDARD.encode(&image.bytes),
                image.content_type,
            )])),
            Ok(None) => Ok(error_result(format!(
                "Image host did not return an image for {}",
                params.url
            ))),
            Err(e) => Ok(error_result(format!(
                "Failed to download {}: {e}",
                params.url
            ))),
        }
    }
}

#[tool_handler]
impl ServerHandler for CatalogMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "House project catalog for строим.дом.рф.\n\
                 \n\
                 ## Tools\n\
                 - catalog_parse_project: download, extract and save one project by id\n\
                 - catalog_parse_batch: re-extract many projects with polite delays\n\
                 - catalog_extract_html: extract a record from HTML you already have\n\
                 - catalog_project_details: show a saved project\n\
                 - catalog_render_description: badge line and generated description\n\
                 - catalog_project_image: download a photo or floor plan\n\
                 \n\
                 ## Resources\n\
                 Saved projects are exposed as catalog://project/{id} (JSON)."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let projects = self
            .store
            .list()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let resources: Vec<Resource> = projects
            .into_iter()
            .map(|project| Resource {
                annotations: None,
                raw: RawResource {
                    uri: project_uri(project.record.project_id),
                    name: project.record.name,
                    title: None,
                    description: None,
                    mime_type: Some("application/json".into()),
                    size: None,
                    icons: None,
                    meta: None,
                },
            })
            .collect();
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let templates = vec![ResourceTemplate {
            annotations: None,
            raw: RawResourceTemplate {
                uri_template: "catalog://project/{id}".into(),
                name: "House Project".into(),
                title: Some("Saved project record".into()),
                description: Some(
                    "Extracted project with generated description (saved via catalog_parse_project)"
                        .into(),
                ),
                mime_type: Some("application/json".into()),
                icons: None,
            },
        }];
        Ok(ListResourceTemplatesResult {
            resource_templates: templates,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let not_found = || {
            McpError::resource_not_found(format!("resource not found: {}", request.uri), None)
        };
        let project_id = parse_project_uri(&request.uri).ok_or_else(not_found)?;
        let project = self
            .store
            .get(project_id)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?
            .ok_or_else(not_found)?;
        let text = serde_json::to_string_pretty(&project)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::memory_store::MemoryProjectStore;
    use crate::error::CatalogError;
    use crate::test_helpers::*;

    const CONTRACTOR_PAGE: &str = r#"<html><body data-contractor-id="9465">
        <h1>Дом Лесной</h1>
        <dl><dt>Площадь дома</dt><dd>98 м²</dd><dt>Материал стен</dt><dd>Брус</dd></dl>
        </body></html>"#;

    fn extract_text(result: &CallToolResult) -> &str {
        result.content[0]
            .raw
            .as_text()
            .expect("expected text content")
            .text
            .as_str()
    }

    fn make_server(source: MockProjectSource) -> (CatalogMcpServer, Arc<MemoryProjectStore>) {
        let store = Arc::new(MemoryProjectStore::new());
        let server = CatalogMcpServer::new(
            Arc::new(source),
            Arc::clone(&store) as Arc<dyn ProjectStore>,
            Arc::new(MockImageFetcher::new()),
        )
        .with_batch_config(BatchConfig {
            delay_ms: 0,
            jitter_ms: 0,
        });
        (server, store)
    }

    #[tokio::test]
    async fn parse_project_stores_record() {
        let (server, store) = make_server(MockProjectSource::new());
        let result = server
            .catalog_parse_project(Parameters(ParseProjectToolParams {
                project_id: 42,
                skip_eligibility_check: None,
                refresh: None,
            }))
            .await
            .unwrap();

        assert_ne!(result.is_error, Some(true));
        let text = extract_text(&result);
        assert!(text.starts_with("Created catalog://project/42"));
        assert!(text.contains("Дом 42"));
        assert!(store.get(42).unwrap().is_some());
    }

    #[tokio::test]
    async fn parse_project_twice_updates() {
        let (server, _store) = make_server(MockProjectSource::new());
        server
            .catalog_parse_project(Parameters(ParseProjectToolParams {
                project_id: 5,
                skip_eligibility_check: None,
                refresh: None,
            }))
            .await
            .unwrap();
        let result = server
            .catalog_parse_project(Parameters(ParseProjectToolParams {
                project_id: 5,
                skip_eligibility_check: None,
                refresh: None,
            }))
            .await
            .unwrap();
        assert!(extract_text(&result).starts_with("Updated"));
    }

    #[tokio::test]
    async fn parse_project_refresh_invalidates_cache() {
        let source = Arc::new(MockProjectSource::new());
        let server = CatalogMcpServer::new(
            Arc::clone(&source) as Arc<dyn ProjectSource>,
            Arc::new(MemoryProjectStore::new()),
            Arc::new(MockImageFetcher::new()),
        );
        server
            .catalog_parse_project(Parameters(ParseProjectToolParams {
                project_id: 1,
                skip_eligibility_check: None,
                refresh: Some(true),
            }))
            .await
            .unwrap();
        assert_eq!(source.invalidations(), 1);
    }

    #[tokio::test]
    async fn ineligible_project_is_reported() {
        let (server, store) = make_server(MockProjectSource::new().with_fetch(|_, _| Ok(None)));
        let result = server
            .catalog_parse_project(Parameters(ParseProjectToolParams {
                project_id: 8,
                skip_eligibility_check: None,
                refresh: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(extract_text(&result).contains("skip_eligibility_check"));
        assert!(store.get(8).unwrap().is_none());
    }

    #[tokio::test]
    async fn fetch_error_is_reported() {
        let (server, _) = make_server(
            MockProjectSource::new().with_fetch(|id, _| Err(CatalogError::ProjectNotFound { id })),
        );
        let result = server
            .catalog_parse_project(Parameters(ParseProjectToolParams {
                project_id: 404,
                skip_eligibility_check: None,
                refresh: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(extract_text(&result).contains("404"));
    }

    #[tokio::test]
    async fn batch_reports_counts() {
        let (server, _) = make_server(MockProjectSource::new().with_fetch(|id, _| {
            if id == 2 {
                Err(CatalogError::RateLimited)
            } else {
                Ok(Some(make_record(id)))
            }
        }));
        let result = server
            .catalog_parse_batch(Parameters(ParseBatchToolParams {
                project_ids: vec![1, 2, 3],
                skip_eligibility_check: None,
            }))
            .await
            .unwrap();
        assert_eq!(
            extract_text(&result),
            "Создано: 2, обновлено: 0, ошибок: 1 (2)"
        );
    }

    #[tokio::test]
    async fn batch_rejects_empty_list() {
        let (server, _) = make_server(MockProjectSource::new());
        let result = server
            .catalog_parse_batch(Parameters(ParseBatchToolParams {
                project_ids: vec![],
                skip_eligibility_check: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn extract_html_returns_json_record() {
        let (server, store) = make_server(MockProjectSource::new());
        let result = server
            .catalog_extract_html(Parameters(ExtractHtmlToolParams {
                html: CONTRACTOR_PAGE.into(),
                project_id: 77,
                skip_eligibility_check: None,
            }))
            .await
            .unwrap();

        let record: serde_json::Value = serde_json::from_str(extract_text(&result)).unwrap();
        assert_eq!(record["project_id"], 77);
        assert_eq!(record["name"], "Дом Лесной");
        assert_eq!(record["material"], "брус");
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn extract_html_rejects_foreign_page() {
        let (server, _) = make_server(MockProjectSource::new());
        let result = server
            .catalog_extract_html(Parameters(ExtractHtmlToolParams {
                html: "<html><body><h1>Чужой дом</h1></body></html>".into(),
                project_id: 3,
                skip_eligibility_check: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));

        let result = server
            .catalog_extract_html(Parameters(ExtractHtmlToolParams {
                html: "<html><body><h1>Чужой дом</h1></body></html>".into(),
                project_id: 3,
                skip_eligibility_check: Some(true),
            }))
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn details_of_missing_project() {
        let (server, _) = make_server(MockProjectSource::new());
        let result = server
            .catalog_project_details(Parameters(ProjectIdToolParams { project_id: 1 }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(extract_text(&result).contains("catalog_parse_project"));
    }

    #[tokio::test]
    async fn details_show_posted_flag() {
        let (server, store) = make_server(MockProjectSource::new());
        store.upsert(make_record(9)).unwrap();
        store.mark_posted(9).unwrap();
        let result = server
            .catalog_project_details(Parameters(ProjectIdToolParams { project_id: 9 }))
            .await
            .unwrap();
        let text = extract_text(&result);
        assert!(text.contains("Дом 9"));
        assert!(text.contains("Posted to channel: yes"));
    }

    #[tokio::test]
    async fn render_description_uses_current_fields() {
        let (server, store) = make_server(MockProjectSource::new());
        store.upsert(make_record(4)).unwrap();
        let result = server
            .catalog_render_description(Parameters(ProjectIdToolParams { project_id: 4 }))
            .await
            .unwrap();
        let description = extract_text(&result);
        assert!(description.starts_with("3 спальни · Газобетон"));
        assert!(description.contains("Двухэтажный дом из газобетона"));
    }

    #[tokio::test]
    async fn project_image_is_base64_encoded() {
        let (server, _) = make_server(MockProjectSource::new());
        let result = server
            .catalog_project_image(Parameters(ProjectImageToolParams {
                url: "https://img.example.com/a.jpg".into(),
            }))
            .await
            .unwrap();
        let image = result.content[0].raw.as_image().expect("expected image");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(
            STANDARD.decode(&image.data).unwrap(),
            b"https://img.example.com/a.jpg"
        );
    }

    #[test]
    fn project_uri_round_trip() {
        assert_eq!(project_uri(12), "catalog://project/12");
        assert_eq!(parse_project_uri("catalog://project/12"), Some(12));
        assert_eq!(parse_project_uri("catalog://project/abc"), None);
        assert_eq!(parse_project_uri("other://project/12"), None);
    }

    #[test]
    fn info_lists_every_tool() {
        let (server, _) = make_server(MockProjectSource::new());
        let instructions = server.get_info().instructions.unwrap();
        for tool in [
            "catalog_parse_project",
            "catalog_parse_batch",
            "catalog_extract_html",
            "catalog_project_details",
            "catalog_render_description",
            "catalog_project_image",
        ] {
            assert!(instructions.contains(tool), "missing {tool}");
        }
    }
}
