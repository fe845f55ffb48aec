use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classroom_client::backend::Backend;
use classroom_client::config::{BackendKind, Config};
use classroom_client::dashboard::{Dashboard, ReportKind};
use classroom_client::demo::DemoBackend;
use classroom_client::http::HttpBackend;
use classroom_client::role::Role;
use classroom_client::storage::SqliteStore;
use classroom_client::AccessService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "classroom_client=info,classroom=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("reading configuration")?;
    let storage = SqliteStore::connect(&config.session_db_url)
        .await
        .with_context(|| format!("opening session store at {}", config.session_db_url))?;

    match config.backend {
        BackendKind::Http => {
            let backend = HttpBackend::new(&config.api_base_url, config.request_timeout())?;
            tracing::info!(base_url = backend.base_url(), "using REST backend");
            run(AccessService::new(backend, storage), &config).await
        }
        BackendKind::Demo => {
            tracing::info!("using demo backend");
            run(AccessService::new(DemoBackend::new(), storage), &config).await
        }
    }
}

async fn run<B: Backend>(
    service: AccessService<B, SqliteStore>,
    config: &Config,
) -> anyhow::Result<()> {
    let mut service = service.with_class_size_baseline(config.class_size_baseline);

    let restored = service.restore_session().await? && service.validate_session().await.is_ok();
    if !restored {
        let credentials = config
            .credentials()
            .context("no stored session; set CLASSROOM_EMAIL and CLASSROOM_PASSWORD")?;
        if let Err(err) = service.login(&credentials).await {
            anyhow::bail!("{} ({err})", err.user_message());
        }
    }

    let Some(user) = service.session().user().cloned() else {
        anyhow::bail!("not signed in");
    };
    tracing::info!(user = %user.name, role = %user.role, home = ?user.role.home(), "signed in");

    let assignments = service.list_assignments().await?;
    tracing::info!(count = assignments.len(), "assignments loaded");
    if user.role == Role::Director {
        for role in [Role::Teacher, Role::Student] {
            let users = service.users_by_role(role).await?;
            tracing::info!(%role, count = users.len(), "users loaded");
        }
    }

    match service.dashboard(Utc::now()) {
        Some(Dashboard::Student(d)) => println!("{}", serde_json::to_string_pretty(&d)?),
        Some(Dashboard::Teacher(d)) => println!("{}", serde_json::to_string_pretty(&d)?),
        Some(Dashboard::Director(d)) => println!("{}", serde_json::to_string_pretty(&d)?),
        None => {}
    }
    println!("{}", serde_json::to_string_pretty(&service.stats())?);

    if user.role == Role::Director {
        let report = service.report(ReportKind::General, Utc::now().date_naive())?;
        println!("\n{report}");
    }
    Ok(())
}
