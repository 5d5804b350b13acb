use crate::config::ServerConfig;
use crate::http::{reason_phrase, route};
use crate::service::Catalog;
use may::coroutine::JoinHandle;
use may_minihttp::{HttpServer, HttpService, Request, Response};
use std::io::{self, Read};
use std::sync::Arc;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// `may_minihttp` service over the catalogue. Cloned once per connection.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<Catalog>,
}

impl CatalogService {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

impl HttpService for CatalogService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let method = req.method().to_string();
        let path = req.path().to_string();

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::handle_request_span(&method, &path).entered();

        let mut body = Vec::new();
        req.body().read_to_end(&mut body)?;

        let reply = route(&self.catalog, &method, &path, &body);
        log::debug!("{} {} -> {}", method, path, reply.status);

        #[cfg(feature = "metrics")]
        METRICS.record_response(&method, reply.route, reply.status);

        res.status_code(usize::from(reply.status), reason_phrase(reply.status));
        res.header(reply.content_type);
        res.body_mut().extend_from_slice(&reply.body);
        Ok(())
    }
}

/// Applies worker and stack settings to the `may` scheduler. Call before
/// the first coroutine is spawned.
pub fn configure_runtime(config: &ServerConfig) {
    may::config()
        .set_workers(config.workers.max(1))
        .set_stack_size(config.stack_size);
}

/// Starts serving on `bind`. The returned handle completes when the
/// listener stops.
pub fn start(catalog: Catalog, bind: &str) -> io::Result<JoinHandle<()>> {
    let handle = HttpServer(CatalogService::new(catalog)).start(bind)?;
    log::info!("listening on {}", bind);
    Ok(handle)
}
