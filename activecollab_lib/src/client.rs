//! HTTP client for the ActiveCollab REST API.

use crate::error::{ApiError, DecodeError, Error, TransportError};
use crate::generation::ApiGeneration;
use crate::helpers::{format_api_datetime, slug_from_permalink};
use crate::params;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::Client as HttpClient;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// User-Agent identifier; a configured suffix is appended after a space.
const USER_AGENT_ID: &str = "activecollab-rs";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// HTTP verb for a logical API call. The wrapped API only uses these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// One classified HTTP round trip.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub http_status: u16,
    pub raw_body: String,
    /// Present when JSON was expected and the body decoded.
    pub decoded: Option<Value>,
}

impl ResponseEnvelope {
    /// Decoded JSON payload, or a decode failure if the envelope holds none.
    pub fn into_json(self) -> Result<Value, Error> {
        match self.decoded {
            Some(value) => Ok(value),
            None => Err(Error::Decode(DecodeError {
                http_status: self.http_status,
                raw_body: self.raw_body,
            })),
        }
    }
}

/// ActiveCollab API client.
///
/// Credentials are immutable for the client's lifetime; transport options
/// (timeout, redirects, TLS verification) are fixed at build time.
#[derive(Clone)]
pub struct Client {
    token: String,
    api_url: String,
    user_agent: String,
    generation: ApiGeneration,
    debug_dump: bool,
    http: HttpClient,
}

/// Configuration for [`Client`]; see [`Client::builder`].
#[derive(Clone)]
pub struct ClientBuilder {
    token: String,
    api_url: String,
    timeout: Duration,
    user_agent_suffix: Option<String>,
    generation: ApiGeneration,
    accept_invalid_certs: bool,
    follow_redirects: bool,
    debug_dump: bool,
}

impl ClientBuilder {
    fn new(token: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: api_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent_suffix: None,
            generation: ApiGeneration::default(),
            accept_invalid_certs: false,
            follow_redirects: false,
            debug_dump: false,
        }
    }

    /// Total request timeout in seconds (default 60). After this time the
    /// request stops; handle the resulting transport error.
    pub fn timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout = Duration::from_secs(seconds);
        self
    }

    /// User-Agent suffix for your application, `<app-name>/<app-version>`.
    /// It is appended to ours: `activecollab-rs/<version> <your-suffix>`.
    pub fn user_agent_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.user_agent_suffix = Some(suffix.into());
        self
    }

    /// Authentication/error conventions of the install (default [`ApiGeneration::V3`]).
    pub fn generation(mut self, generation: ApiGeneration) -> Self {
        self.generation = generation;
        self
    }

    /// Skip TLS certificate and hostname verification. Off unless asked for;
    /// only for self-signed installs.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Follow HTTP redirects (up to 10). Off unless asked for.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Emit a `tracing` debug event with status and body when a call fails.
    /// Off unless asked for; the dumped URL and body can expose the token.
    pub fn debug_dump(mut self, enabled: bool) -> Self {
        self.debug_dump = enabled;
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        if self.token.trim().is_empty() {
            return Err(Error::Config("token must not be empty".to_string()));
        }
        if self.api_url.trim().is_empty() {
            return Err(Error::Config("api_url must not be empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be positive".to_string()));
        }
        let user_agent = match &self.user_agent_suffix {
            Some(suffix) => format!("{}/{} {}", USER_AGENT_ID, crate::VERSION, suffix),
            None => format!("{}/{}", USER_AGENT_ID, crate::VERSION),
        };
        let redirects = if self.follow_redirects {
            Policy::limited(10)
        } else {
            Policy::none()
        };
        let http = HttpClient::builder()
            .timeout(self.timeout)
            .redirect(redirects)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .user_agent(&user_agent)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Client {
            token: self.token,
            api_url: self.api_url,
            user_agent,
            generation: self.generation,
            debug_dump: self.debug_dump,
            http,
        })
    }
}

impl Client {
    /// Create a client with default configuration.
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Result<Self, Error> {
        Client::builder(token, api_url).build()
    }

    /// Configure a client; `api_url` is the full API endpoint of the install,
    /// e.g. `https://ac.example.com/public/index.php` or `.../api.php`.
    pub fn builder(token: impl Into<String>, api_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token, api_url)
    }

    /// The User-Agent sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn generation(&self) -> ApiGeneration {
        self.generation
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Make a call against a logical resource path and decode the JSON
    /// response.
    ///
    /// This is the primitive every endpoint method funnels through; use it
    /// directly for server operations without a typed wrapper. `parameters`
    /// is a (possibly nested) JSON mapping; see [`crate::params`] for how it
    /// reaches the wire.
    pub async fn call(
        &self,
        path: &str,
        parameters: Value,
        method: Method,
    ) -> Result<Value, Error> {
        self.execute(path, &parameters, method, true).await?.into_json()
    }

    /// Like [`Client::call`], but return the body without decoding it.
    pub async fn call_raw(
        &self,
        path: &str,
        parameters: Value,
        method: Method,
    ) -> Result<String, Error> {
        Ok(self.execute(path, &parameters, method, false).await?.raw_body)
    }

    // System information

    /// System information about the installation: versions, logged in user,
    /// the mode the API is in.
    pub async fn info(&self) -> Result<Value, Error> {
        let mut response = self.call("info", Value::Null, Method::Get).await?;
        // the API reports read_only as 0/1
        if let Some(read_only) = response.get("read_only").and_then(Value::as_i64) {
            response["read_only"] = Value::Bool(read_only == 1);
        }
        Ok(response)
    }

    /// List all available project labels.
    pub async fn info_labels_project(&self) -> Result<Value, Error> {
        self.call("info/labels/project", Value::Null, Method::Get).await
    }

    /// List all available assignment labels (used by tasks and subtasks).
    pub async fn info_labels_assignment(&self) -> Result<Value, Error> {
        self.call("info/labels/assignment", Value::Null, Method::Get).await
    }

    // Roles

    /// List all system roles and role details, permissions included.
    pub async fn roles_system(&self) -> Result<Value, Error> {
        self.call("roles/system", Value::Null, Method::Get).await
    }

    /// List all project roles and their permissions.
    pub async fn roles_project(&self) -> Result<Value, Error> {
        self.call("roles/project", Value::Null, Method::Get).await
    }

    /// Details of a specific role, system or project.
    pub async fn role(&self, role_id: i64) -> Result<Value, Error> {
        self.call(&format!("roles/{}", role_id), Value::Null, Method::Get).await
    }

    // Companies and users

    /// List the companies defined in the People section.
    pub async fn people(&self) -> Result<Value, Error> {
        self.call("people", Value::Null, Method::Get).await
    }

    /// Create a company. The name must be unique in the entire system.
    pub async fn people_add_company(&self, name: &str) -> Result<Value, Error> {
        let parameters = json!({ "company": { "name": name } });
        self.call("people/add-company", parameters, Method::Post).await
    }

    /// Properties of a specific company.
    pub async fn people_company(&self, company_id: i64) -> Result<Value, Error> {
        self.call(&format!("people/{}", company_id), Value::Null, Method::Get).await
    }

    // Projects

    /// List the projects the authenticated user has access to.
    ///
    /// Rows are enriched with a `slug` derived from each permalink, since
    /// slug-addressed endpoints need it and the listing does not return one.
    pub async fn projects(&self) -> Result<Value, Error> {
        let mut response = self.call("projects", Value::Null, Method::Get).await?;
        if let Some(rows) = response.as_array_mut() {
            for row in rows {
                let slug = row
                    .get("permalink")
                    .and_then(Value::as_str)
                    .and_then(slug_from_permalink);
                if let Some(slug) = slug {
                    row["slug"] = Value::String(slug);
                }
            }
        }
        Ok(response)
    }

    /// Create a project.
    pub async fn projects_add(&self, project: NewProject) -> Result<Value, Error> {
        self.call("projects/add", project.into_parameters(), Method::Post).await
    }

    /// Properties of a specific project.
    pub async fn project(&self, project_id: i64) -> Result<Value, Error> {
        self.call(&format!("projects/{}", project_id), Value::Null, Method::Get).await
    }

    /// Tasks assigned to the logged in user in that project.
    pub async fn project_user_tasks(&self, project_id: i64) -> Result<Value, Error> {
        self.call(
            &format!("projects/{}/user-tasks", project_id),
            Value::Null,
            Method::Get,
        )
        .await
    }

    // Project people

    /// People involved with the project and the permissions included in
    /// their project role. Permissions are organized per module with four
    /// levels: 0 no access, 1 access, 2 access and create, 3 access, create
    /// and manage.
    pub async fn project_people(&self, project_id: i64) -> Result<Value, Error> {
        self.call(
            &format!("projects/{}/people", project_id),
            Value::Null,
            Method::Get,
        )
        .await
    }

    /// Add users to a project, with a predefined role (`role_id`) or explicit
    /// per-module `permissions`. True when the server acknowledged with an
    /// empty (null) response.
    pub async fn project_people_add(
        &self,
        project_id: i64,
        users: &[i64],
        role_id: Option<i64>,
        permissions: Option<Value>,
    ) -> Result<bool, Error> {
        let mut parameters = json!({ "users": users });
        if let Some(role_id) = role_id {
            parameters["project_permissions"]["role_id"] = Value::from(role_id);
        }
        if let Some(permissions) = permissions {
            parameters["project_permissions"]["permissions"] = permissions;
        }
        let response = self
            .call(
                &format!("projects/{}/people/add", project_id),
                parameters,
                Method::Post,
            )
            .await?;
        Ok(response.is_null())
    }

    /// Change the project permissions of one user.
    pub async fn project_people_change_permissions(
        &self,
        project_id: i64,
        user_id: i64,
        role_id: Option<i64>,
        permissions: Option<Value>,
    ) -> Result<bool, Error> {
        let mut parameters = Value::Object(Map::new());
        if let Some(role_id) = role_id {
            parameters["project_permissions"]["role_id"] = Value::from(role_id);
        }
        if let Some(permissions) = permissions {
            parameters["project_permissions"]["permissions"] = permissions;
        }
        let response = self
            .call(
                &format!("projects/{}/people/{}/change-permissions", project_id, user_id),
                parameters,
                Method::Post,
            )
            .await?;
        Ok(response.is_null())
    }

    /// Remove a user from the project.
    pub async fn project_people_remove(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<bool, Error> {
        let response = self
            .call(
                &format!("projects/{}/people/{}/remove-from-project", project_id, user_id),
                Value::Null,
                Method::Post,
            )
            .await?;
        Ok(response.is_null())
    }

    // Milestones

    /// Active milestones of a project, addressed by slug (3.x installs).
    pub async fn project_milestones(&self, slug: &str) -> Result<Value, Error> {
        self.call(
            &format!("projects/{}/milestones", slug),
            Value::Null,
            Method::Get,
        )
        .await
    }

    // Tickets

    /// Active tickets in a project.
    pub async fn project_tickets(&self, project_id: i64) -> Result<Value, Error> {
        self.call(
            &format!("projects/{}/tickets", project_id),
            Value::Null,
            Method::Get,
        )
        .await
    }

    // Pages

    /// Page categories in a project.
    pub async fn project_pages(&self, project_id: i64) -> Result<Value, Error> {
        self.call(
            &format!("projects/{}/pages", project_id),
            Value::Null,
            Method::Get,
        )
        .await
    }

    /// Create a page.
    pub async fn project_pages_add(
        &self,
        project_id: i64,
        page: NewPage,
    ) -> Result<Value, Error> {
        self.call(
            &format!("projects/{}/pages/add", project_id),
            page.into_parameters(),
            Method::Post,
        )
        .await
    }

    /// Page details with subpages and revisions.
    pub async fn project_page(&self, project_id: i64, page_id: i64) -> Result<Value, Error> {
        self.call(
            &format!("projects/{}/pages/{}", project_id, page_id),
            Value::Null,
            Method::Get,
        )
        .await
    }

    /// Edit a page.
    pub async fn project_pages_edit(
        &self,
        project_id: i64,
        page_id: i64,
        edit: PageEdit,
    ) -> Result<Value, Error> {
        self.call(
            &format!("projects/{}/pages/{}/edit", project_id, page_id),
            edit.into_parameters(),
            Method::Post,
        )
        .await
    }

    /// Mark a page as archived.
    pub async fn project_pages_archive(
        &self,
        project_id: i64,
        page_id: i64,
    ) -> Result<Value, Error> {
        self.call(
            &format!("projects/{}/pages/{}/archive", project_id, page_id),
            Value::Null,
            Method::Post,
        )
        .await
    }

    /// Mark a page as unarchived.
    pub async fn project_pages_unarchive(
        &self,
        project_id: i64,
        page_id: i64,
    ) -> Result<Value, Error> {
        self.call(
            &format!("projects/{}/pages/{}/unarchive", project_id, page_id),
            Value::Null,
            Method::Post,
        )
        .await
    }

    // Tasks

    /// Create a task attached to a parent object (usually a ticket).
    ///
    /// Priority ranges from -2 (lowest) to 2 (highest), 0 is normal. The
    /// first assignee is the responsible one.
    pub async fn project_tasks_add(
        &self,
        project_id: i64,
        parent_id: i64,
        body: &str,
        priority: Option<i64>,
        due_on: Option<DateTime<Utc>>,
        assignees: Option<&[i64]>,
    ) -> Result<Value, Error> {
        let mut task = json!({ "body": body });
        if let Some(priority) = priority {
            task["priority"] = Value::from(priority);
        }
        if let Some(due_on) = due_on {
            task["due_on"] = Value::String(format_api_datetime(due_on));
        }
        if let Some(assignees) = assignees {
            if let Some(first) = assignees.first() {
                task["assignees"] = json!([assignees, first]);
            }
        }
        let parameters = json!({ "task": task, "parent_id": parent_id });
        self.call(
            &format!("projects/{}/tasks/add", project_id),
            parameters,
            Method::Post,
        )
        .await
    }

    // Common project object operations

    /// Subscribe users to an object; returns the object's details.
    pub async fn project_objects_subscribe(
        &self,
        project_id: i64,
        users: &[i64],
        object_id: i64,
    ) -> Result<Value, Error> {
        let parameters = json!({ "users": users });
        self.call(
            &format!("projects/{}/objects/{}/subscribe", project_id, object_id),
            parameters,
            Method::Post,
        )
        .await
    }

    // Endpoint families this client does not cover. Each fails with status
    // 501 before any network call; use `call` for ad-hoc access instead.

    /// Project group endpoints are not covered by this client.
    pub async fn project_groups(&self) -> Result<Value, Error> {
        Err(Error::NotImplemented)
    }

    /// Discussion endpoints are not covered by this client.
    pub async fn project_discussions(&self) -> Result<Value, Error> {
        Err(Error::NotImplemented)
    }

    /// Checklist endpoints are not covered by this client.
    pub async fn project_checklists(&self) -> Result<Value, Error> {
        Err(Error::NotImplemented)
    }

    /// File endpoints are not covered by this client.
    pub async fn project_files(&self) -> Result<Value, Error> {
        Err(Error::NotImplemented)
    }

    /// Time tracking endpoints are not covered by this client.
    pub async fn project_time(&self) -> Result<Value, Error> {
        Err(Error::NotImplemented)
    }

    /// Comment endpoints are not covered by this client.
    pub async fn project_comments(&self) -> Result<Value, Error> {
        Err(Error::NotImplemented)
    }

    /// Status message endpoints are not covered by this client.
    pub async fn status_messages(&self) -> Result<Value, Error> {
        Err(Error::NotImplemented)
    }

    /// Star/complete/trash object operations are not covered by this client.
    pub async fn project_objects_star(&self) -> Result<Value, Error> {
        Err(Error::NotImplemented)
    }

    /// One request, one response: build the URL, run the round trip,
    /// classify the outcome. Never retried.
    async fn execute(
        &self,
        path: &str,
        parameters: &Value,
        method: Method,
        expect_json: bool,
    ) -> Result<ResponseEnvelope, Error> {
        let url = self.build_url(path, parameters, method)?;
        let request = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self
                .http
                .post(&url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(self.post_body(parameters)),
        };
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                if self.debug_dump {
                    tracing::debug!(error = %e, "transport failure");
                }
                return Err(TransportError { message: e.to_string() }.into());
            }
        };
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError { message: e.to_string() })?;
        let classified = classify_response(self.generation, status, &body, expect_json);
        if self.debug_dump {
            if let Err(err) = &classified {
                tracing::debug!(status, body = body.as_str(), error = %err, "request failed");
            }
        }
        classified
    }

    fn build_url(&self, path: &str, parameters: &Value, method: Method) -> Result<String, Error> {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return Err(Error::Config("path must not be empty".to_string()));
        }
        let mut url = format!(
            "{}?path_info={}&{}={}&format=json",
            self.api_url,
            params::encode_path(path),
            self.generation.auth_param(),
            urlencoding::encode(&self.token),
        );
        if method == Method::Get && !params::is_empty(parameters) {
            url.push('&');
            url.push_str(&params::encode(parameters));
        }
        Ok(url)
    }

    fn post_body(&self, parameters: &Value) -> String {
        let mut body = params::encode(parameters);
        if self.generation.needs_post_sentinel() {
            if !body.is_empty() {
                body.push('&');
            }
            body.push_str("submitted=submitted");
        }
        body
    }
}

/// Deterministic classification of a completed round trip.
pub(crate) fn classify_response(
    generation: ApiGeneration,
    status: u16,
    body: &str,
    expect_json: bool,
) -> Result<ResponseEnvelope, Error> {
    if !generation.is_success(status) {
        return Err(Error::Api(api_error_from_body(status, body)));
    }
    if !expect_json {
        return Ok(ResponseEnvelope {
            http_status: status,
            raw_body: body.to_string(),
            decoded: None,
        });
    }
    match serde_json::from_str::<Value>(body) {
        Ok(decoded) => Ok(ResponseEnvelope {
            http_status: status,
            raw_body: body.to_string(),
            decoded: Some(decoded),
        }),
        Err(_) => Err(Error::Decode(DecodeError {
            http_status: status,
            raw_body: body.to_string(),
        })),
    }
}

/// Shape of an error response body, when the server sends one.
#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
    field_errors: Option<Value>,
}

fn api_error_from_body(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|decoded| {
            let mut message = decoded.message?;
            if let Some(errors) = decoded.field_errors {
                let texts = field_error_texts(&errors);
                if !texts.is_empty() {
                    message.push_str(&format!("(field errors: {})", texts.join(", ")));
                }
            }
            Some(message)
        })
        .unwrap_or_else(|| "unknown".to_string());
    ApiError {
        message,
        http_status: status,
    }
}

/// Field errors arrive as an array of strings or a field-keyed mapping.
fn field_error_texts(errors: &Value) -> Vec<String> {
    let values: Vec<&Value> = match errors {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    };
    values
        .into_iter()
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect()
}

/// Input for [`Client::projects_add`].
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    /// User who is the project leader.
    pub leader_id: i64,
    pub overview: Option<String>,
    /// Visibility for objects in this project.
    pub private: bool,
    pub starts_on: Option<DateTime<Utc>>,
    pub group_id: Option<i64>,
    /// Client company.
    pub company_id: Option<i64>,
    /// Valid project to use as a template.
    pub template_id: Option<i64>,
}

impl NewProject {
    pub fn new(name: impl Into<String>, leader_id: i64) -> Self {
        Self {
            name: name.into(),
            leader_id,
            ..Self::default()
        }
    }

    fn into_parameters(self) -> Value {
        let mut project = Map::new();
        project.insert("name".to_string(), Value::String(self.name));
        project.insert("leader_id".to_string(), Value::from(self.leader_id));
        if let Some(overview) = self.overview {
            project.insert("overview".to_string(), Value::String(overview));
        }
        project.insert(
            "private".to_string(),
            Value::from(if self.private { 1 } else { 0 }),
        );
        if let Some(starts_on) = self.starts_on {
            project.insert(
                "starts_on".to_string(),
                Value::String(format_api_datetime(starts_on)),
            );
        }
        if let Some(group_id) = self.group_id {
            project.insert("group_id".to_string(), Value::from(group_id));
        }
        if let Some(company_id) = self.company_id {
            project.insert("company_id".to_string(), Value::from(company_id));
        }
        if let Some(template_id) = self.template_id {
            project.insert("template_id".to_string(), Value::from(template_id));
        }
        json!({ "project": project })
    }
}

/// Input for [`Client::project_pages_add`].
#[derive(Debug, Clone, Default)]
pub struct NewPage {
    pub name: String,
    pub body: String,
    /// Sent comma-joined; skipped when empty.
    pub tags: Vec<String>,
    pub private: bool,
    /// Parent milestone.
    pub milestone_id: Option<i64>,
    /// Parent object (category, ticket, ...).
    pub parent_id: Option<i64>,
}

impl NewPage {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    fn into_parameters(self) -> Value {
        let mut page = Map::new();
        page.insert("name".to_string(), Value::String(self.name));
        page.insert("body".to_string(), Value::String(self.body));
        if !self.tags.is_empty() {
            page.insert("tags".to_string(), Value::String(self.tags.join(",")));
        }
        page.insert(
            "private".to_string(),
            Value::from(if self.private { 1 } else { 0 }),
        );
        if let Some(milestone_id) = self.milestone_id {
            page.insert("milestone_id".to_string(), Value::from(milestone_id));
        }
        if let Some(parent_id) = self.parent_id {
            page.insert("parent_id".to_string(), Value::from(parent_id));
        }
        json!({ "page": page })
    }
}

/// Input for [`Client::project_pages_edit`]. Unset fields stay untouched.
#[derive(Debug, Clone, Default)]
pub struct PageEdit {
    pub is_minor_revision: bool,
    pub name: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
    pub private: bool,
    pub milestone_id: Option<i64>,
    pub parent_id: Option<i64>,
}

impl PageEdit {
    fn into_parameters(self) -> Value {
        let mut page = Map::new();
        if self.is_minor_revision {
            page.insert("is_minor_revision".to_string(), Value::from(1));
        }
        if let Some(name) = self.name {
            page.insert("name".to_string(), Value::String(name));
        }
        if let Some(body) = self.body {
            page.insert("body".to_string(), Value::String(body));
        }
        if let Some(tags) = self.tags {
            page.insert("tags".to_string(), Value::String(tags.join(",")));
        }
        page.insert(
            "private".to_string(),
            Value::from(if self.private { 1 } else { 0 }),
        );
        if let Some(milestone_id) = self.milestone_id {
            page.insert("milestone_id".to_string(), Value::from(milestone_id));
        }
        if let Some(parent_id) = self.parent_id {
            page.insert("parent_id".to_string(), Value::from(parent_id));
        }
        json!({ "page": page })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::builder("secret", "https://ac.example.com/api.php")
            .build()
            .unwrap()
    }

    fn legacy() -> Client {
        Client::builder("secret", "https://ac.example.com/api.php")
            .generation(ApiGeneration::V2)
            .build()
            .unwrap()
    }

    #[test]
    fn build_url_get_without_parameters() {
        let url = client()
            .build_url("info", &Value::Null, Method::Get)
            .unwrap();
        assert_eq!(
            url,
            "https://ac.example.com/api.php?path_info=info&auth_api_token=secret&format=json"
        );
    }

    #[test]
    fn build_url_appends_get_parameters() {
        let url = client()
            .build_url("projects", &json!({"status": "active now"}), Method::Get)
            .unwrap();
        assert_eq!(
            url,
            "https://ac.example.com/api.php?path_info=projects&auth_api_token=secret&format=json&status=active%20now"
        );
    }

    #[test]
    fn build_url_post_keeps_parameters_out_of_query() {
        let url = client()
            .build_url("projects/add", &json!({"project": {"name": "X"}}), Method::Post)
            .unwrap();
        assert_eq!(
            url,
            "https://ac.example.com/api.php?path_info=projects/add&auth_api_token=secret&format=json"
        );
    }

    #[test]
    fn build_url_legacy_auth_parameter() {
        let url = legacy().build_url("info", &Value::Null, Method::Get).unwrap();
        assert!(url.contains("&token=secret&"));
        assert!(!url.contains("auth_api_token"));
    }

    #[test]
    fn build_url_tolerates_leading_slash() {
        let url = client().build_url("/info", &Value::Null, Method::Get).unwrap();
        assert!(url.contains("?path_info=info&"));
    }

    #[test]
    fn build_url_encodes_path_segments() {
        let url = client()
            .build_url("projects/a b/people", &Value::Null, Method::Get)
            .unwrap();
        assert!(url.contains("path_info=projects/a%20b/people"));
    }

    #[test]
    fn build_url_rejects_empty_path() {
        let err = client().build_url("", &Value::Null, Method::Get).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = client().build_url("/", &Value::Null, Method::Get).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn post_body_flattens_nested_parameters() {
        let body = client().post_body(&json!({"company": {"name": "Acme Ltd"}}));
        assert_eq!(body, "company%5Bname%5D=Acme%20Ltd");
    }

    #[test]
    fn post_body_legacy_appends_sentinel() {
        assert_eq!(legacy().post_body(&Value::Null), "submitted=submitted");
        assert_eq!(
            legacy().post_body(&json!({"users": [26]})),
            "users%5B0%5D=26&submitted=submitted"
        );
        assert_eq!(client().post_body(&Value::Null), "");
    }

    #[test]
    fn user_agent_includes_suffix() {
        let client = Client::builder("secret", "https://ac.example.com/api.php")
            .user_agent_suffix("testing/1.0.0")
            .build()
            .unwrap();
        assert_eq!(
            client.user_agent(),
            format!("{}/{} testing/1.0.0", USER_AGENT_ID, crate::VERSION)
        );
    }

    #[test]
    fn user_agent_without_suffix() {
        assert_eq!(
            client().user_agent(),
            format!("{}/{}", USER_AGENT_ID, crate::VERSION)
        );
    }

    #[test]
    fn builder_validates_inputs() {
        assert!(matches!(
            Client::new("", "https://ac.example.com/api.php"),
            Err(Error::Config(_))
        ));
        assert!(matches!(Client::new("secret", " "), Err(Error::Config(_))));
        assert!(matches!(
            Client::builder("secret", "https://ac.example.com/api.php")
                .timeout_secs(0)
                .build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn classify_success_json() {
        let envelope =
            classify_response(ApiGeneration::V3, 200, r#"{"a":1}"#, true).unwrap();
        assert_eq!(envelope.http_status, 200);
        assert_eq!(envelope.decoded, Some(json!({"a": 1})));
    }

    #[test]
    fn classify_empty_body_is_a_decode_error() {
        let err = classify_response(ApiGeneration::V3, 200, "", true).unwrap_err();
        match err {
            Error::Decode(decode) => {
                assert_eq!(decode.http_status, 200);
                assert_eq!(decode.raw_body, "");
            }
            other => panic!("expected DecodeError, got {other:?}"),
        }
    }

    #[test]
    fn classify_null_body_is_valid_json() {
        let envelope = classify_response(ApiGeneration::V2, 200, "null", true).unwrap();
        assert_eq!(envelope.decoded, Some(Value::Null));
    }

    #[test]
    fn classify_error_with_message_and_field_errors() {
        let body = r#"{"message":"Not found","field_errors":["x"]}"#;
        let err = classify_response(ApiGeneration::V3, 404, body, true).unwrap_err();
        match err {
            Error::Api(api) => {
                assert_eq!(api.message, "Not found(field errors: x)");
                assert_eq!(api.http_status, 404);
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[test]
    fn classify_error_without_decodable_message() {
        let err = classify_response(ApiGeneration::V3, 500, "oops", true).unwrap_err();
        match err {
            Error::Api(api) => {
                assert_eq!(api.message, "unknown");
                assert_eq!(api.http_status, 500);
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[test]
    fn classify_field_errors_as_mapping() {
        let body = r#"{"message":"Validation failed","field_errors":{"name":"is required"}}"#;
        let err = classify_response(ApiGeneration::V3, 400, body, true).unwrap_err();
        match err {
            Error::Api(api) => {
                assert_eq!(api.message, "Validation failed(field errors: is required)");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[test]
    fn classify_status_zero_per_generation() {
        let envelope = classify_response(ApiGeneration::V2, 0, r#"{"a":1}"#, true).unwrap();
        assert_eq!(envelope.http_status, 0);
        let err = classify_response(ApiGeneration::V3, 0, r#"{"a":1}"#, true).unwrap_err();
        assert!(matches!(err, Error::Api(_)));
    }

    #[test]
    fn classify_raw_passthrough() {
        let envelope = classify_response(ApiGeneration::V3, 200, "PONG", false).unwrap();
        assert_eq!(envelope.raw_body, "PONG");
        assert!(envelope.decoded.is_none());
        assert!(matches!(envelope.into_json(), Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn not_implemented_endpoints_skip_the_network() {
        // unroutable api_url: these must fail before any connection attempt
        let client = Client::new("secret", "http://192.0.2.1/api.php").unwrap();
        let err = client.project_groups().await.unwrap_err();
        assert!(matches!(err, Error::NotImplemented));
        assert_eq!(err.http_status(), Some(501));
    }

    #[test]
    fn new_project_parameters() {
        let mut project = NewProject::new("X", 15);
        project.private = true;
        project.company_id = Some(7);
        assert_eq!(
            project.into_parameters(),
            json!({"project": {"name": "X", "leader_id": 15, "private": 1, "company_id": 7}})
        );
        assert_eq!(
            NewProject::new("Y", 3).into_parameters(),
            json!({"project": {"name": "Y", "leader_id": 3, "private": 0}})
        );
    }

    #[test]
    fn new_page_parameters() {
        let mut page = NewPage::new("Title", "Body");
        page.tags = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            page.into_parameters(),
            json!({"page": {"name": "Title", "body": "Body", "tags": "a,b", "private": 0}})
        );
    }

    #[test]
    fn page_edit_parameters() {
        let edit = PageEdit {
            is_minor_revision: true,
            body: Some("[edited]".to_string()),
            ..PageEdit::default()
        };
        assert_eq!(
            edit.into_parameters(),
            json!({"page": {"is_minor_revision": 1, "body": "[edited]", "private": 0}})
        );
    }
}
