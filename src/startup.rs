//! Application Startup
//!
//! Builds a [`MessageSender`] backed by PostgreSQL from loaded settings.

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;

use crate::application::{Collaborators, MessageSender};
use crate::config::Settings;
use crate::domain::ports::{
    AttachmentCipher, AttachmentUploader, BlockingList, MessageTransport, RecipientResolver,
};
use crate::infrastructure::database::{self, PgStore};

/// Client-side capabilities the embedding application provides.
pub struct ClientPorts {
    pub transport: Arc<dyn MessageTransport>,
    pub uploader: Arc<dyn AttachmentUploader>,
    pub cipher: Arc<dyn AttachmentCipher>,
    pub resolver: Arc<dyn RecipientResolver>,
    pub blocking: Arc<dyn BlockingList>,
}

/// Running send core
pub struct Courier {
    db: PgPool,
    sender: MessageSender,
    settings: Arc<Settings>,
}

impl Courier {
    /// Build the send core from settings
    pub async fn build(settings: Settings, ports: ClientPorts) -> Result<Self> {
        settings.check()?;

        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        database::run_migrations(&db).await?;
        tracing::info!("Database migrations applied");

        let ClientPorts {
            transport,
            uploader,
            cipher,
            resolver,
            blocking,
        } = ports;

        let sender = MessageSender::new(
            Collaborators {
                transport,
                uploader,
                cipher,
                resolver,
                blocking,
                store: Arc::new(PgStore::new(db.clone())),
            },
            &settings.sender,
            &settings.attachments,
        );

        tracing::info!(
            environment = %settings.environment,
            max_retries = settings.sender.max_retries,
            "Message sender ready"
        );

        Ok(Self {
            db,
            sender,
            settings: Arc::new(settings),
        })
    }

    pub fn sender(&self) -> &MessageSender {
        &self.sender
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Close the connection pool once in-flight sends have finished.
    pub async fn shutdown(self) {
        self.db.close().await;
        tracing::info!("Database connection pool closed");
    }
}
