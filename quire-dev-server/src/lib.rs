use anyhow::Result;
use axum::Router;
use std::{net::SocketAddr, path::PathBuf};
use tower_http::services::ServeDir;

/// Configuration for the development server
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to serve on
    pub port: u16,
    /// Root directory to serve
    pub root: PathBuf,
    /// Auto-open browser
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            root: PathBuf::from("./public"),
            open: false,
        }
    }
}

impl DevServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// A static file server for the generated site. Directories resolve to
/// their `index.html`, so pretty URLs work the way they will when deployed.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    /// Create a new server with the given configuration
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    pub fn router(&self) -> Router {
        let serve_dir = ServeDir::new(&self.config.root).append_index_html_on_directories(true);
        Router::new().fallback_service(serve_dir)
    }

    /// Run the server until the process stops
    pub async fn run(self) -> Result<()> {
        // Ensure root directory exists
        if !self.config.root.exists() {
            return Err(anyhow::anyhow!(
                "Root directory does not exist: {}",
                self.config.root.display()
            ));
        }

        let addr = self.config.addr()?;
        let app = self.router();

        log::info!("Serving {} at http://{}", self.config.root.display(), addr);

        // Open browser if requested
        if self.config.open {
            if let Err(e) = open::that(format!("http://{}", addr)) {
                log::warn!("Failed to open browser: {}", e);
            }
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
