use super::cors::CorsPolicy;
use super::request::{parse_request, ParsedRequest};
use super::response::{write_empty, write_resolved};
use crate::config::AppConfig;
use crate::dispatcher::{DispatchError, DispatchRequest, Dispatcher, ProxyError};
use crate::response::ResolvedResponse;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// The `may_minihttp` service: CORS, proxy-mode prefixes, then the dispatcher.
#[derive(Clone)]
pub struct AppService {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<AppConfig>,
    cors: CorsPolicy,
    request_timeout: Duration,
}

impl AppService {
    pub fn new(dispatcher: Arc<Dispatcher>, config: Arc<AppConfig>, request_timeout: Duration) -> Self {
        let cors = CorsPolicy::from_config(&config.cors);
        Self {
            dispatcher,
            config,
            cors,
            request_timeout,
        }
    }

    /// Run one parsed request through the mock. Transport-independent, so tests
    /// can drive it without a socket.
    pub fn handle(&self, parsed: ParsedRequest) -> ResolvedResponse {
        let deadline = Instant::now() + self.request_timeout;
        let method = parsed.method.clone();
        let path = parsed.path.clone();

        let Some(request) = parsed.into_dispatch_request(deadline) else {
            warn!(method = %method, "Rejected request with an invalid method");
            return ResolvedResponse::text(400, format!("Invalid HTTP method {method}\n"));
        };

        match self.config.proxy.target_for(&path) {
            Some(url) => self.forward(request, url),
            None => self.dispatch(request),
        }
    }

    fn forward(&self, request: DispatchRequest, url: &str) -> ResolvedResponse {
        let url = url.to_string();
        match self.dispatcher.forward(request, &url) {
            Ok(resolved) => resolved,
            Err(DispatchError::Proxy(e @ ProxyError::Unsupported { .. })) => {
                error!(upstream = %url, error = %e, "Proxy-mode request rejected");
                ResolvedResponse::text(500, format!("{e}\n"))
            }
            Err(e) => {
                error!(upstream = %url, error = %e, "Proxy-mode request failed");
                ResolvedResponse::text(502, format!("{e}\n"))
            }
        }
    }

    fn dispatch(&self, request: DispatchRequest) -> ResolvedResponse {
        match self.dispatcher.dispatch(request) {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(error = %e, "Dispatch failed");
                ResolvedResponse::text(500, format!("{e}\n"))
            }
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);

        if parsed.method.eq_ignore_ascii_case("OPTIONS") {
            write_empty(res, 204, self.cors.header_lines());
            return Ok(());
        }

        let started = Instant::now();
        let (method, path) = (parsed.method.clone(), parsed.path.clone());
        let resolved = self.handle(parsed);
        info!(
            method = %method,
            path = %path,
            status = resolved.status,
            latency_us = started.elapsed().as_micros() as u64,
            "Request complete"
        );
        write_resolved(res, &resolved, self.cors.header_lines());
        Ok(())
    }
}
