mod common;

use std::sync::{Arc, Mutex};

use common::fixtures::{dispatcher_for, recording_handlers, CallCounter};
use forumrouter::{
    AppConfig, DispatchState, Dispatcher, GroupOptions, HandlerResponse, HandlerResult,
    Middleware, MiddlewareRegistry, Next, RequestContext, RouteTable,
};
use http::Method;

/// Appends its name to a shared log, then optionally halts.
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    halt: bool,
}

impl Middleware for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> HandlerResult {
        self.log.lock().unwrap().push(self.name.to_string());
        if self.halt {
            return Ok(HandlerResponse::error(418, "halted"));
        }
        let res = next.run(ctx)?;
        self.log.lock().unwrap().push(format!("{}:after", self.name));
        Ok(res)
    }
}

fn recorder_registry(log: &Arc<Mutex<Vec<String>>>, halting: &str) -> MiddlewareRegistry {
    let mut registry = MiddlewareRegistry::standard(&AppConfig::default()).unwrap();
    for name in ["First", "Second", "Third"] {
        registry.insert(
            name,
            Arc::new(Recorder {
                name,
                log: Arc::clone(log),
                halt: name == halting,
            }),
        );
    }
    registry
}

fn layered_table() -> RouteTable {
    let mut r = RouteTable::builder();
    r.group(GroupOptions::new().middleware(["First"]), |r| {
        r.group(GroupOptions::new().middleware(["Second"]), |r| {
            r.get("/layered", "LayerController@show")?
                .middleware("Third");
            Ok(())
        })
    })
    .unwrap();
    r.build().unwrap()
}

#[test]
fn test_middleware_run_outer_to_inner() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let table = layered_table();
    let calls = CallCounter::default();
    let handlers = recording_handlers(&table, &calls);
    let dispatcher = Dispatcher::build(table, &handlers, &recorder_registry(&log, "")).unwrap();

    let mut ctx = RequestContext::new(Method::GET, "/layered");
    let outcome = dispatcher.run(&mut ctx).unwrap();

    assert_eq!(outcome.state, DispatchState::Completed);
    assert_eq!(calls.get(), 1);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "First",
            "Second",
            "Third",
            "Third:after",
            "Second:after",
            "First:after"
        ]
    );
}

#[test]
fn test_halting_middleware_stops_the_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let table = layered_table();
    let calls = CallCounter::default();
    let handlers = recording_handlers(&table, &calls);
    let dispatcher =
        Dispatcher::build(table, &handlers, &recorder_registry(&log, "Second")).unwrap();

    let mut ctx = RequestContext::new(Method::GET, "/layered");
    let outcome = dispatcher.run(&mut ctx).unwrap();

    assert_eq!(outcome.response.status, 418);
    assert!(!outcome.state.is_completed());
    assert_eq!(calls.get(), 0);
    assert_eq!(*log.lock().unwrap(), vec!["First", "Second", "First:after"]);
}

fn api_table() -> RouteTable {
    let mut r = RouteTable::builder();
    r.group(
        GroupOptions::new()
            .prefix("/api")
            .middleware(["Cors", "RateLimit"]),
        |r| {
            r.get("/threads", "Api\\ThreadController@index")?;
            Ok(())
        },
    )
    .unwrap();
    r.build().unwrap()
}

#[test]
fn test_cors_headers_on_allowed_origin() {
    let mut config = AppConfig::default();
    config.cors.allowed_origins = vec!["https://app.forum.test".to_string()];
    let (dispatcher, calls) = dispatcher_for(api_table(), &config);

    let mut ctx = RequestContext::new(Method::GET, "/api/threads")
        .with_header("origin", "https://app.forum.test")
        .with_header("host", "api.forum.test");
    let outcome = dispatcher.run(&mut ctx).unwrap();

    assert_eq!(outcome.response.status, 200);
    assert_eq!(
        outcome.response.get_header("access-control-allow-origin"),
        Some("https://app.forum.test")
    );
    assert_eq!(outcome.response.get_header("vary"), Some("Origin"));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_cors_rejects_disallowed_origin() {
    let (dispatcher, calls) = dispatcher_for(api_table(), &AppConfig::default());
    let mut ctx = RequestContext::new(Method::GET, "/api/threads")
        .with_header("origin", "https://evil.test")
        .with_header("host", "api.forum.test");
    let outcome = dispatcher.run(&mut ctx).unwrap();

    assert_eq!(outcome.response.status, 403);
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_cors_ignores_requests_without_origin() {
    let (dispatcher, calls) = dispatcher_for(api_table(), &AppConfig::default());
    let mut ctx = RequestContext::new(Method::GET, "/api/threads");
    let outcome = dispatcher.run(&mut ctx).unwrap();

    assert_eq!(outcome.response.status, 200);
    assert_eq!(
        outcome.response.get_header("access-control-allow-origin"),
        None
    );
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_rate_limit_blocks_after_budget() {
    let mut config = AppConfig::default();
    config.rate_limit.max_requests = 2;
    let (dispatcher, calls) = dispatcher_for(api_table(), &config);

    let request = || {
        let mut ctx = RequestContext::new(Method::GET, "/api/threads")
            .with_header("x-forwarded-for", "203.0.113.9");
        dispatcher.run(&mut ctx).unwrap().response
    };

    let first = request();
    assert_eq!(first.status, 200);
    assert_eq!(first.get_header("x-ratelimit-remaining"), Some("1"));
    assert_eq!(request().status, 200);

    let limited = request();
    assert_eq!(limited.status, 429);
    assert!(limited.get_header("retry-after").is_some());
    assert_eq!(limited.get_header("x-ratelimit-remaining"), Some("0"));
    assert_eq!(calls.get(), 2);

    // Another client has its own budget
    let mut ctx = RequestContext::new(Method::GET, "/api/threads")
        .with_header("x-forwarded-for", "198.51.100.1");
    assert_eq!(dispatcher.run(&mut ctx).unwrap().response.status, 200);
}
