//! Application state - shared across all handlers.

use std::sync::Arc;

use actix_web::HttpRequest;

use quill_core::domain::Author;
use quill_core::ports::{
    AuthorRepository, CommentRepository, Mailer, PasswordService, PostRepository, TagRepository,
};
use quill_infra::database::DatabaseConnections;
use quill_infra::{ConsoleMailer, InMemoryMailer, InMemoryStore, SmtpMailer};

#[cfg(feature = "postgres")]
use quill_infra::database::{
    PostgresAuthorRepository, PostgresCommentRepository, PostgresPostRepository,
    PostgresTagRepository,
};

use crate::config::{AdminBootstrap, AllowedHosts, AppConfig, MailBackend};
use crate::middleware::error::{AppError, AppResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub authors: Arc<dyn AuthorRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub mail_from: String,
    pub site_url: Option<String>,
    pub allowed_hosts: AllowedHosts,
    pub db: Option<Arc<DatabaseConnections>>,
}

struct Repositories {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    tags: Arc<dyn TagRepository>,
    authors: Arc<dyn AuthorRepository>,
}

impl Repositories {
    fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            posts: store.clone(),
            comments: store.clone(),
            tags: store.clone(),
            authors: store,
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(connections: &DatabaseConnections) -> Self {
        let db = &connections.main;
        Self {
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            comments: Arc::new(PostgresCommentRepository::new(db.clone())),
            tags: Arc::new(PostgresTagRepository::new(db.clone())),
            authors: Arc::new(PostgresAuthorRepository::new(db.clone())),
        }
    }
}

/// The SMTP mailer, or the console one when the relay is not usable.
fn smtp_mailer(config: &AppConfig) -> Arc<dyn Mailer> {
    let Some(smtp) = config.smtp.as_ref() else {
        tracing::error!("MAIL_BACKEND=smtp but SMTP_HOST not set. Logging mail instead.");
        return Arc::new(ConsoleMailer);
    };

    match SmtpMailer::new(smtp) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            tracing::error!("Failed to set up SMTP: {}. Logging mail instead.", e);
            Arc::new(ConsoleMailer)
        }
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        #[cfg(feature = "postgres")]
        let (db, repositories) = match config.database.as_ref() {
            Some(db_config) => match DatabaseConnections::init(db_config).await {
                Ok(connections) => {
                    let connections = Arc::new(connections);
                    let repositories = Repositories::postgres(&connections);
                    (Some(connections), repositories)
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory store.",
                        e
                    );
                    (None, Repositories::in_memory(Arc::new(InMemoryStore::new())))
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                (None, Repositories::in_memory(Arc::new(InMemoryStore::new())))
            }
        };

        #[cfg(not(feature = "postgres"))]
        let (db, repositories) = {
            tracing::info!("Running without postgres feature - using in-memory store");
            (None, Repositories::in_memory(Arc::new(InMemoryStore::new())))
        };

        let mailer: Arc<dyn Mailer> = match config.mail_backend {
            MailBackend::Console => Arc::new(ConsoleMailer),
            MailBackend::Memory => Arc::new(InMemoryMailer::new()),
            MailBackend::Smtp => smtp_mailer(config),
        };

        tracing::info!(mail_backend = ?config.mail_backend, "Application state initialized");

        Self {
            posts: repositories.posts,
            comments: repositories.comments,
            tags: repositories.tags,
            authors: repositories.authors,
            mailer,
            mail_from: config.mail_from.clone(),
            site_url: config.site_url.clone(),
            allowed_hosts: config.allowed_hosts.clone(),
            db,
        }
    }

    /// State over an in-memory store, with no database attached.
    #[cfg(test)]
    pub fn in_memory(
        store: Arc<InMemoryStore>,
        mailer: Arc<dyn Mailer>,
        mail_from: impl Into<String>,
    ) -> Self {
        let repositories = Repositories::in_memory(store);
        Self {
            posts: repositories.posts,
            comments: repositories.comments,
            tags: repositories.tags,
            authors: repositories.authors,
            mailer,
            mail_from: mail_from.into(),
            site_url: None,
            allowed_hosts: AllowedHosts::default(),
            db: None,
        }
    }

    /// Absolute form of a site path, using `SITE_URL` when configured and
    /// the request's scheme and host otherwise. A host outside
    /// `ALLOWED_HOSTS` is a bad request.
    pub fn absolute_url(&self, req: &HttpRequest, path: &str) -> AppResult<String> {
        if let Some(base) = &self.site_url {
            return Ok(format!("{base}{path}"));
        }

        let info = req.connection_info();
        if !self.allowed_hosts.allows(info.host()) {
            tracing::warn!(host = %info.host(), "Rejected request for a host outside ALLOWED_HOSTS");
            return Err(AppError::BadRequest(format!(
                "Invalid HTTP_HOST header: '{}'.",
                info.host()
            )));
        }
        Ok(format!("{}://{}{}", info.scheme(), info.host(), path))
    }

    /// Create the bootstrap staff author unless the username is taken.
    pub async fn ensure_admin(
        &self,
        admin: &AdminBootstrap,
        passwords: &dyn PasswordService,
    ) -> AppResult<()> {
        if self.authors.find_by_username(&admin.username).await?.is_some() {
            tracing::debug!(username = %admin.username, "Admin account already present");
            return Ok(());
        }

        let password_hash = passwords
            .hash(&admin.password)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let author = Author::new(admin.username.clone(), admin.email.clone(), password_hash).staff();
        let saved = self.authors.save(author).await?;

        tracing::info!(author_id = saved.id, username = %saved.username, "Admin account created");
        Ok(())
    }
}
