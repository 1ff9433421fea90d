use crate::config::Config;
use crate::http::dispatch::Dispatcher;
use crate::http::pool::BufferPool;
use crate::http::router::Router;
use crate::http::static_files::StaticFiles;

/// State shared read-only by every connection task.
pub struct ServerContext {
    pub config: Config,
    pub pool: BufferPool,
    pub dispatcher: Dispatcher,
}

impl ServerContext {
    pub fn new(config: Config, router: Router) -> Self {
        let static_files = config.static_dir.clone().map(StaticFiles::new);
        Self {
            dispatcher: Dispatcher::new(router, static_files),
            pool: BufferPool::new(),
            config,
        }
    }
}
