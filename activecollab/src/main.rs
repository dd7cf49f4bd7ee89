//! ActiveCollab CLI — query projects, people, tickets, and pages from the terminal.

mod output;

use activecollab_lib::{
    parse_api_datetime, ApiGeneration, Client, Method, NewPage, NewProject, PageEdit,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "activecollab")]
#[command(about = "ActiveCollab CLI — query projects, people, tickets, and pages", long_about = None)]
struct Cli {
    /// API token. Prefer the environment variable over the flag.
    #[arg(long, env = "ACTIVECOLLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Full API URL of the install (e.g. https://ac.example.com/api.php).
    #[arg(long, env = "ACTIVECOLLAB_URL")]
    url: Option<String>,

    /// Output format: plain (human-readable), json (structured).
    #[arg(short, long, default_value = "plain", value_enum)]
    output: OutputFormatArg,

    /// Request timeout in seconds.
    #[arg(long, default_value = "60")]
    timeout: u64,

    /// User-Agent suffix for this invocation, <app-name>/<app-version>.
    #[arg(long)]
    user_agent: Option<String>,

    /// Talk to a 2.x install (legacy `token` auth parameter).
    #[arg(long)]
    legacy: bool,

    /// Skip TLS certificate verification (self-signed installs only).
    #[arg(long)]
    insecure: bool,

    /// Follow HTTP redirects.
    #[arg(long)]
    follow_redirects: bool,

    /// Log failed requests (status and body) at debug level to stderr.
    /// The dump can expose the token.
    #[arg(long)]
    debug_dump: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// System information about the install
    Info,
    /// List available project labels
    ProjectLabels,
    /// List available assignment labels
    AssignmentLabels,
    /// List system roles
    RolesSystem,
    /// List project roles
    RolesProject,
    /// Show one role
    Role { role_id: i64 },
    /// List companies from the People section
    People,
    /// Create a company
    AddCompany { name: String },
    /// Show one company
    Company { company_id: i64 },
    /// List projects (with slugs derived from permalinks)
    Projects,
    /// Show one project
    Project { project_id: i64 },
    /// Create a project
    AddProject {
        name: String,
        leader_id: i64,
        #[arg(long)]
        overview: Option<String>,
        #[arg(long)]
        private: bool,
        /// Start date (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS")
        #[arg(long)]
        starts_on: Option<String>,
        #[arg(long)]
        group_id: Option<i64>,
        #[arg(long)]
        company_id: Option<i64>,
        #[arg(long)]
        template_id: Option<i64>,
    },
    /// Tasks assigned to the logged-in user in a project
    UserTasks { project_id: i64 },
    /// People involved with a project and their permissions
    ProjectPeople { project_id: i64 },
    /// Active milestones of a project (3.x installs, by slug)
    Milestones { slug: String },
    /// Active tickets in a project
    Tickets { project_id: i64 },
    /// Page categories in a project
    Pages { project_id: i64 },
    /// Show one page with subpages and revisions
    Page { project_id: i64, page_id: i64 },
    /// Create a page
    AddPage {
        project_id: i64,
        name: String,
        body: String,
        /// Repeatable tag
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        private: bool,
        #[arg(long)]
        milestone_id: Option<i64>,
        #[arg(long)]
        parent_id: Option<i64>,
    },
    /// Edit a page
    EditPage {
        project_id: i64,
        page_id: i64,
        /// Mark the edit as a minor revision
        #[arg(long)]
        minor: bool,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        body: Option<String>,
        /// Repeatable tag; replaces the page's tags when given
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        private: bool,
        #[arg(long)]
        milestone_id: Option<i64>,
        #[arg(long)]
        parent_id: Option<i64>,
    },
    /// Mark a page as archived
    ArchivePage { project_id: i64, page_id: i64 },
    /// Mark a page as unarchived
    UnarchivePage { project_id: i64, page_id: i64 },
    /// Add users to a project
    AddPeople {
        project_id: i64,
        /// User IDs to add
        #[arg(required = true)]
        users: Vec<i64>,
        /// Predefined role for the added users
        #[arg(long)]
        role_id: Option<i64>,
        /// Per-module permissions as a JSON mapping
        #[arg(long)]
        permissions: Option<String>,
    },
    /// Change one user's project permissions
    ChangePermissions {
        project_id: i64,
        user_id: i64,
        #[arg(long)]
        role_id: Option<i64>,
        /// Per-module permissions as a JSON mapping
        #[arg(long)]
        permissions: Option<String>,
    },
    /// Remove a user from a project
    RemovePerson { project_id: i64, user_id: i64 },
    /// Subscribe users to an object
    Subscribe {
        project_id: i64,
        object_id: i64,
        /// User IDs to subscribe
        #[arg(required = true)]
        users: Vec<i64>,
    },
    /// Create a task under a parent object
    AddTask {
        project_id: i64,
        parent_id: i64,
        body: String,
        /// -2 (lowest) to 2 (highest), 0 is normal
        #[arg(long)]
        priority: Option<i64>,
        /// Due date (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS")
        #[arg(long)]
        due_on: Option<String>,
        /// Repeatable assignee user ID; the first one is responsible
        #[arg(long = "assignee")]
        assignees: Vec<i64>,
    },
    /// Low-level call against a logical resource path
    Call {
        /// Logical resource path, e.g. projects/42/people
        path: String,
        /// Repeatable key=value pair; keys may use bracket notation (a[b])
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        /// Send as POST (form body) instead of GET
        #[arg(long)]
        post: bool,
        /// Print the raw body without decoding JSON
        #[arg(long)]
        raw: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        println!("activecollab {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.debug_dump {
            "activecollab_lib=debug"
        } else {
            "warn"
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (token, url) = match (cli.token.clone(), cli.url.clone()) {
        (Some(token), Some(url)) => (token, url),
        _ => {
            eprintln!(
                "Error: set ACTIVECOLLAB_TOKEN and ACTIVECOLLAB_URL (or pass --token/--url)."
            );
            return ExitCode::FAILURE;
        }
    };

    let mut builder = Client::builder(token, url)
        .timeout_secs(cli.timeout)
        .accept_invalid_certs(cli.insecure)
        .follow_redirects(cli.follow_redirects)
        .debug_dump(cli.debug_dump);
    if cli.legacy {
        builder = builder.generation(ApiGeneration::V2);
    }
    if let Some(suffix) = &cli.user_agent {
        builder = builder.user_agent_suffix(suffix.clone());
    }
    let client = match builder.build() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let format = match cli.output {
        OutputFormatArg::Plain => output::OutputFormat::Plain,
        OutputFormatArg::Json => output::OutputFormat::Json,
    };

    match run(&client, cli.command, format).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &Client, cmd: Commands, format: output::OutputFormat) -> Result<(), String> {
    let print_value = |v: &Value| println!("{}", output::render(v, format));

    match cmd {
        Commands::Info => {
            let info = client.info().await.map_err(|e| e.to_string())?;
            print_value(&info);
        }
        Commands::ProjectLabels => {
            let labels = client.info_labels_project().await.map_err(|e| e.to_string())?;
            print_value(&labels);
        }
        Commands::AssignmentLabels => {
            let labels = client
                .info_labels_assignment()
                .await
                .map_err(|e| e.to_string())?;
            print_value(&labels);
        }
        Commands::RolesSystem => {
            let roles = client.roles_system().await.map_err(|e| e.to_string())?;
            print_value(&roles);
        }
        Commands::RolesProject => {
            let roles = client.roles_project().await.map_err(|e| e.to_string())?;
            print_value(&roles);
        }
        Commands::Role { role_id } => {
            let role = client.role(role_id).await.map_err(|e| e.to_string())?;
            print_value(&role);
        }
        Commands::People => {
            let people = client.people().await.map_err(|e| e.to_string())?;
            print_value(&people);
        }
        Commands::AddCompany { name } => {
            let company = client
                .people_add_company(&name)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&company);
        }
        Commands::Company { company_id } => {
            let company = client
                .people_company(company_id)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&company);
        }
        Commands::Projects => {
            let projects = client.projects().await.map_err(|e| e.to_string())?;
            print_value(&projects);
        }
        Commands::Project { project_id } => {
            let project = client.project(project_id).await.map_err(|e| e.to_string())?;
            print_value(&project);
        }
        Commands::AddProject {
            name,
            leader_id,
            overview,
            private,
            starts_on,
            group_id,
            company_id,
            template_id,
        } => {
            let starts_on = starts_on.as_deref().map(parse_api_datetime).transpose()?;
            let project = NewProject {
                overview,
                private,
                starts_on,
                group_id,
                company_id,
                template_id,
                ..NewProject::new(name, leader_id)
            };
            let created = client
                .projects_add(project)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&created);
        }
        Commands::UserTasks { project_id } => {
            let tasks = client
                .project_user_tasks(project_id)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&tasks);
        }
        Commands::ProjectPeople { project_id } => {
            let people = client
                .project_people(project_id)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&people);
        }
        Commands::Milestones { slug } => {
            let milestones = client
                .project_milestones(&slug)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&milestones);
        }
        Commands::Tickets { project_id } => {
            let tickets = client
                .project_tickets(project_id)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&tickets);
        }
        Commands::Pages { project_id } => {
            let pages = client
                .project_pages(project_id)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&pages);
        }
        Commands::Page {
            project_id,
            page_id,
        } => {
            let page = client
                .project_page(project_id, page_id)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&page);
        }
        Commands::AddPage {
            project_id,
            name,
            body,
            tags,
            private,
            milestone_id,
            parent_id,
        } => {
            let page = NewPage {
                tags,
                private,
                milestone_id,
                parent_id,
                ..NewPage::new(name, body)
            };
            let created = client
                .project_pages_add(project_id, page)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&created);
        }
        Commands::EditPage {
            project_id,
            page_id,
            minor,
            name,
            body,
            tags,
            private,
            milestone_id,
            parent_id,
        } => {
            let edit = PageEdit {
                is_minor_revision: minor,
                name,
                body,
                tags: (!tags.is_empty()).then_some(tags),
                private,
                milestone_id,
                parent_id,
            };
            let page = client
                .project_pages_edit(project_id, page_id, edit)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&page);
        }
        Commands::ArchivePage {
            project_id,
            page_id,
        } => {
            let page = client
                .project_pages_archive(project_id, page_id)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&page);
        }
        Commands::UnarchivePage {
            project_id,
            page_id,
        } => {
            let page = client
                .project_pages_unarchive(project_id, page_id)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&page);
        }
        Commands::AddPeople {
            project_id,
            users,
            role_id,
            permissions,
        } => {
            let permissions = parse_permissions(permissions.as_deref())?;
            let added = client
                .project_people_add(project_id, &users, role_id, permissions)
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", if added { "added" } else { "not added" });
        }
        Commands::ChangePermissions {
            project_id,
            user_id,
            role_id,
            permissions,
        } => {
            let permissions = parse_permissions(permissions.as_deref())?;
            let changed = client
                .project_people_change_permissions(project_id, user_id, role_id, permissions)
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", if changed { "changed" } else { "not changed" });
        }
        Commands::RemovePerson {
            project_id,
            user_id,
        } => {
            let removed = client
                .project_people_remove(project_id, user_id)
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", if removed { "removed" } else { "not removed" });
        }
        Commands::Subscribe {
            project_id,
            object_id,
            users,
        } => {
            let object = client
                .project_objects_subscribe(project_id, &users, object_id)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&object);
        }
        Commands::AddTask {
            project_id,
            parent_id,
            body,
            priority,
            due_on,
            assignees,
        } => {
            let due_on = due_on.as_deref().map(parse_api_datetime).transpose()?;
            let assignees = (!assignees.is_empty()).then_some(assignees.as_slice());
            let created = client
                .project_tasks_add(project_id, parent_id, &body, priority, due_on, assignees)
                .await
                .map_err(|e| e.to_string())?;
            print_value(&created);
        }
        Commands::Call {
            path,
            params,
            post,
            raw,
        } => {
            let mut parameters = Value::Object(serde_json::Map::new());
            for pair in &params {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", pair))?;
                insert_param(&mut parameters, key, value)?;
            }
            let method = if post { Method::Post } else { Method::Get };
            if raw {
                let body = client
                    .call_raw(&path, parameters, method)
                    .await
                    .map_err(|e| e.to_string())?;
                println!("{}", body);
            } else {
                let value = client
                    .call(&path, parameters, method)
                    .await
                    .map_err(|e| e.to_string())?;
                print_value(&value);
            }
        }
        Commands::Version => {}
    }
    Ok(())
}

/// Parse a `--permissions` JSON mapping, e.g. `{"milestone":1,"ticket":3}`.
fn parse_permissions(raw: Option<&str>) -> Result<Option<Value>, String> {
    raw.map(|text| {
        serde_json::from_str::<Value>(text)
            .map_err(|e| format!("invalid permissions JSON: {}", e))
    })
    .transpose()
}

/// Insert a `--param` pair, expanding bracket notation (`a[b][c]`) into the
/// nested mapping the library flattens back on the wire.
fn insert_param(parameters: &mut Value, key: &str, value: &str) -> Result<(), String> {
    let (head, mut rest) = match key.find('[') {
        Some(at) => (&key[..at], &key[at..]),
        None => (key, ""),
    };
    if head.is_empty() {
        return Err(format!("invalid parameter key: {:?}", key));
    }
    let mut segments = vec![head.to_string()];
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('[')
            .and_then(|r| r.split_once(']'))
            .ok_or_else(|| format!("unbalanced brackets in key: {:?}", key))?;
        if inner.0.is_empty() {
            return Err(format!("empty bracket segment in key: {:?}", key));
        }
        segments.push(inner.0.to_string());
        rest = inner.1;
    }
    insert_segments(parameters, &segments, value);
    Ok(())
}

fn insert_segments(parameters: &mut Value, segments: &[String], value: &str) {
    match segments {
        [leaf] => parameters[leaf.as_str()] = Value::String(value.to_string()),
        [head, rest @ ..] => {
            let child = &mut parameters[head.as_str()];
            // a scalar set earlier under the same key loses to the mapping
            if !child.is_object() {
                *child = Value::Object(serde_json::Map::new());
            }
            insert_segments(child, rest, value);
        }
        [] => {}
    }
}
