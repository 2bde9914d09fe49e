//! Process wiring: storage backend, migrations, module lifecycle, HTTP server.

use std::sync::Arc;

use anyhow::Context;
use bookshelf_kernel::{
    settings::{Settings, StorageBackend},
    InitCtx, ModuleRegistry,
};
use sqlx::PgPool;

use crate::modules::{
    self,
    books::storage::{BookStorage, InMemoryBookStorage, PgBookStorage},
};

/// Storage selected by `database.backend`, plus the pool when there is one.
pub struct Storage {
    pub books: Arc<dyn BookStorage>,
    pub pool: Option<PgPool>,
}

impl Storage {
    pub async fn open(settings: &Settings) -> anyhow::Result<Self> {
        match settings.database.backend {
            StorageBackend::Postgres => {
                let pool = bookshelf_db::connect(&settings.database).await?;
                Ok(Self {
                    books: Arc::new(PgBookStorage::new(pool.clone())),
                    pool: Some(pool),
                })
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on exit");
                Ok(Self {
                    books: Arc::new(InMemoryBookStorage::new()),
                    pool: None,
                })
            }
        }
    }

    pub async fn close(self) {
        if let Some(pool) = self.pool {
            pool.close().await;
            tracing::info!("database pool closed");
        }
    }
}

/// Registry with every module wired to `storage`.
pub fn registry(storage: &Storage) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, storage.books.clone());
    registry
}

async fn apply_migrations(pool: &PgPool, registry: &ModuleRegistry) -> anyhow::Result<usize> {
    let migrations = registry.collect_migrations();
    let applied = bookshelf_db::run_migrations(pool, &migrations)
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied, total = migrations.len(), "migrations up to date");
    Ok(applied)
}

/// Apply pending migrations and exit. Returns how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    if settings.database.backend == StorageBackend::Memory {
        tracing::info!("in-memory storage has no schema to migrate");
        return Ok(0);
    }

    let storage = Storage::open(settings).await?;
    let registry = registry(&storage);
    let result = match &storage.pool {
        Some(pool) => apply_migrations(pool, &registry).await,
        None => Ok(0),
    };
    storage.close().await;
    result
}

/// Run the service until a shutdown signal arrives.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let storage = Storage::open(&settings).await?;
    let registry = registry(&storage);

    if let Some(pool) = &storage.pool {
        if settings.database.run_migrations {
            apply_migrations(pool, &registry).await?;
        } else {
            tracing::info!("skipping migrations at startup");
        }
    }

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served =
        bookshelf_http::start_server(&registry, &settings, bookshelf_http::shutdown_signal()).await;

    registry.stop_all().await?;
    storage.close().await;

    served
}
