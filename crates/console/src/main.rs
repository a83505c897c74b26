//! `octoops`: headless driver for the console's session gate.
//!
//! Configuration comes from `OCTOOPS_API_URL`, `OCTOOPS_TOKEN_PATH` and
//! `OCTOOPS_REQUEST_TIMEOUT_SECS`; flags override the environment. Logs go to
//! stderr (`RUST_LOG`, `OCTOOPS_LOG_FORMAT=json|pretty`).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use octoops_auth::{Permission, explain_authorization, find_menu, menu_paths};
use octoops_client::rbac::ListQuery;
use octoops_client::{ClientConfig, Credentials, FileTokenStore, HttpSessionService, RbacClient, SessionStore};
use octoops_router::{NavigationGuard, RouteTable, SharedNavigator};

#[derive(Parser, Debug)]
#[command(name = "octoops")]
#[command(version, about = "OctoOps console session gate", long_about = None)]
struct Args {
    /// Backend base URL (also: OCTOOPS_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Token file (also: OCTOOPS_TOKEN_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    token_path: Option<PathBuf>,

    /// Per-request timeout in seconds (also: OCTOOPS_REQUEST_TIMEOUT_SECS)
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the token
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Discard the session and the persisted token
    Logout,
    /// Validate the persisted session and print the user
    Whoami,
    /// Run the navigation guard for one or more paths
    Navigate {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// List the route table with required permissions
    Routes,
    /// Print the menu tree granted to the session
    Menus {
        /// Only print the subtree with this menu code
        #[arg(long)]
        code: Option<String>,
    },
    /// Explain whether the session holds a permission tag
    Check { permission: String },
    /// List users through the RBAC admin API
    Users {
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "10")]
        page_size: u32,
    },
}

impl Args {
    fn config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_env().context("invalid OctoOps environment")?;
        if let Some(url) = &self.api_url {
            config = ClientConfig::new(url.clone(), config.token_path).with_request_timeout(config.request_timeout);
        }
        if let Some(path) = &self.token_path {
            config.token_path = path.clone();
        }
        if let Some(secs) = self.timeout {
            if secs == 0 {
                bail!("--timeout must be greater than zero");
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    octoops_observability::init();

    let args = Args::parse();
    let config = args.config()?;
    tracing::debug!(api_url = %config.api_url, token_path = %config.token_path.display(), "configuration loaded");

    match args.command {
        Command::Routes => print_routes(&RouteTable::octoops()),
        Command::Login { username, password } => {
            let navigator = open_session(&config)?;
            let mut store = navigator.lock().await;
            if let Err(err) = store.login(&Credentials::new(username, password)).await {
                tracing::debug!("login failed: {err}");
                bail!("{}", err.user_message());
            }
            let name = store.session().user().map(|u| u.display_name().to_string()).unwrap_or_default();
            println!("signed in as {name}");
        }
        Command::Logout => {
            open_session(&config)?.lock().await.logout();
            println!("signed out");
        }
        Command::Whoami => {
            let navigator = signed_in(&config, "/").await?;
            let store = navigator.lock().await;
            let session = store.session();
            if let Some(user) = session.user() {
                println!("{} <{}>", user.display_name(), user.email);
            }
            let mut roles: Vec<_> = session.roles().iter().map(|r| r.as_str()).collect();
            roles.sort_unstable();
            let mut permissions: Vec<_> = session.permissions().iter().map(|p| p.as_str()).collect();
            permissions.sort_unstable();
            println!("roles: {}", roles.join(", "));
            println!("permissions: {}", permissions.join(", "));
        }
        Command::Navigate { paths } => {
            let navigator = open_session(&config)?;
            for path in paths {
                let outcome = navigator.navigate(&path).await;
                println!("{}", serde_json::to_string(&outcome)?);
            }
        }
        Command::Menus { code } => {
            let navigator = signed_in(&config, "/").await?;
            let store = navigator.lock().await;
            let menus = match code.as_deref() {
                Some(code) => {
                    let node = find_menu(store.session().menus(), code).with_context(|| format!("no menu '{code}'"))?;
                    std::slice::from_ref(node)
                }
                None => store.session().menus(),
            };
            println!("{}", serde_json::to_string_pretty(menus)?);
            println!("paths: {}", menu_paths(menus).join(", "));
        }
        Command::Check { permission } => {
            let navigator = signed_in(&config, "/").await?;
            let explanation = explain_authorization(navigator.lock().await.session(), &Permission::new(permission));
            println!("{}", serde_json::to_string_pretty(&explanation)?);
            if !explanation.granted {
                bail!("{}: denied", explanation.required_permission);
            }
        }
        Command::Users { page, page_size } => {
            let navigator = signed_in(&config, "/rbac/user").await?;
            let bearer = navigator.lock().await.bearer().context("not signed in")?;
            let rbac = RbacClient::new(&config).context("failed to build HTTP client")?;
            let users = rbac
                .list_users(&bearer, &ListQuery::page(page, page_size))
                .await
                .context("failed to list users")?;
            println!("{}", serde_json::to_string_pretty(&users)?);
        }
    }

    Ok(())
}

fn open_session(config: &ClientConfig) -> Result<SharedNavigator> {
    let service = Arc::new(HttpSessionService::new(config).context("failed to build HTTP client")?);
    let tokens = Arc::new(FileTokenStore::new(config.token_path.clone()));
    Ok(SharedNavigator::new(
        NavigationGuard::new(RouteTable::octoops()),
        SessionStore::hydrated(service, tokens),
    ))
}

/// Open the persisted session and pass it through the guard for `path`.
async fn signed_in(config: &ClientConfig, path: &str) -> Result<SharedNavigator> {
    let navigator = open_session(config)?;
    let outcome = navigator.navigate(path).await;
    if !navigator.lock().await.session().is_authenticated() {
        bail!("not signed in");
    }
    if !outcome.decision.is_allowed() {
        tracing::info!(path, decision = ?outcome.decision, "route not available to this session");
    }
    Ok(navigator)
}

fn print_routes(routes: &RouteTable) {
    for route in routes.routes() {
        let target = match (&route.redirect, route.view) {
            (Some(to), _) => format!("-> {to}"),
            (None, Some(view)) => view.to_string(),
            (None, None) => String::new(),
        };
        let permission = route.permission.as_ref().map(|p| p.as_str()).unwrap_or("-");
        println!("{:<24} {:<18} {:<22} {}", route.path, route.name, permission, target);
    }
}
