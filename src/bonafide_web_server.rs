use crate::core::AppConfig;
use crate::db::profiles;
use crate::jobs::semester_refresh::start_semester_refresh_job;
use crate::routes::bonafide_portal_routes;
use crate::storage::TemplateStore;
use actix_cors::Cors;
use actix_files as fs;
use actix_web::http::header;
use actix_web::{dev::Server, web::Data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

pub struct BonafideWebServer {
    port: u16,
    server: Server,
}

impl BonafideWebServer {
    pub async fn build(configuration: AppConfig) -> Result<Self, anyhow::Error> {
        let address = format!(
            "{}:{}",
            configuration.bonafide_server_config.host, configuration.bonafide_server_config.port
        );

        let pg_pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect_lazy_with(configuration.postgres.connect());

        sqlx::migrate!("./migrations").run(&pg_pool).await?;

        profiles::ensure_bootstrap_admin(&pg_pool, &configuration.bootstrap_admin)
            .await
            .map_err(|e| anyhow::anyhow!("bootstrap admin setup failed: {}", e))?;

        start_semester_refresh_job(pg_pool.clone()).await;

        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let server = run(listener, pg_pool, configuration).await?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub async fn run(
    listener: TcpListener,
    pg_pool: PgPool,
    configuration: AppConfig,
) -> Result<Server, anyhow::Error> {
    let template_dir = configuration.storage.template_dir.clone();
    std::fs::create_dir_all(&template_dir)?;

    let pg_pool = Data::new(pg_pool);
    let template_store = Data::new(TemplateStore::new(&template_dir));
    let config = Data::new(configuration);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allowed_headers(vec![
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
            ])
            .supports_credentials();
        App::new()
            .configure(bonafide_portal_routes)
            .service(fs::Files::new("/static/templates", template_dir.clone()))
            .app_data(pg_pool.clone())
            .app_data(template_store.clone())
            .app_data(config.clone())
            .wrap(TracingLogger::default())
            .wrap(cors)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
