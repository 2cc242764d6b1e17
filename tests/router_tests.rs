use forumrouter::router::{PathPattern, SUPPORTED_METHODS};
use forumrouter::{ConfigError, GroupOptions, RouteOutcome, RouteTable, Router};
use http::Method;

fn matched_handler(router: &Router, method: Method, path: &str) -> Option<String> {
    match router.route(&method, path) {
        RouteOutcome::Matched(m) => Some(m.route.handler.to_string()),
        _ => None,
    }
}

fn forum_like_router() -> Router {
    let mut r = RouteTable::builder();
    r.get("/", "HomeController@index").unwrap();
    r.get("/threads/create", "ThreadController@create").unwrap();
    r.get("/threads/{id}", "ThreadController@show").unwrap();
    r.post("/threads", "ThreadController@store").unwrap();
    r.group(GroupOptions::new().prefix("/admin").admin(), |r| {
        r.get("/users/edit/{id}", "AdminController@editUser")?;
        r.delete("/users/{id}", "AdminController@deleteUser")?;
        Ok(())
    })
    .unwrap();
    r.get(
        "/posts/{post}/reactions/{type}",
        "ReactionController@show",
    )
    .unwrap();
    Router::new(r.build().unwrap())
}

#[test]
fn test_first_registered_route_wins() {
    let router = forum_like_router();
    assert_eq!(
        matched_handler(&router, Method::GET, "/threads/create").as_deref(),
        Some("ThreadController@create")
    );
    assert_eq!(
        matched_handler(&router, Method::GET, "/threads/7").as_deref(),
        Some("ThreadController@show")
    );
}

#[test]
fn test_later_literal_is_shadowed_by_earlier_placeholder() {
    let mut r = RouteTable::builder();
    r.get("/threads/{id}", "ThreadController@show").unwrap();
    r.get("/threads/create", "ThreadController@create").unwrap();
    let router = Router::new(r.build().unwrap());
    assert_eq!(
        matched_handler(&router, Method::GET, "/threads/create").as_deref(),
        Some("ThreadController@show")
    );
}

#[test]
fn test_group_prefix_and_params() {
    let router = forum_like_router();
    match router.route(&Method::GET, "/admin/users/edit/42") {
        RouteOutcome::Matched(m) => {
            assert_eq!(m.route.handler.to_string(), "AdminController@editUser");
            assert_eq!(m.route.pattern.as_str(), "/admin/users/edit/{id}");
            assert_eq!(m.params.get("id"), Some("42"));
            assert_eq!(m.params.len(), 1);
            assert!(m.route.requires_admin);
            assert!(m.route.requires_auth);
        }
        other => panic!("expected a match, got {other:?}"),
    }
}

#[test]
fn test_multiple_params_in_order() {
    let router = forum_like_router();
    match router.route(&Method::GET, "/posts/9/reactions/like") {
        RouteOutcome::Matched(m) => {
            let params: Vec<_> = m.params.iter().collect();
            assert_eq!(params, vec![("post", "9"), ("type", "like")]);
        }
        other => panic!("expected a match, got {other:?}"),
    }
}

#[test]
fn test_not_found_and_segment_count_mismatch() {
    let router = forum_like_router();
    assert!(matches!(
        router.route(&Method::GET, "/nowhere"),
        RouteOutcome::NotFound
    ));
    assert!(matches!(
        router.route(&Method::GET, "/threads/7/extra"),
        RouteOutcome::NotFound
    ));
    match router.route(&Method::GET, "/admin/users/edit") {
        RouteOutcome::MethodNotAllowed { allowed } => assert_eq!(allowed, vec![Method::DELETE]),
        other => panic!("expected 405 from /admin/users/{{id}}, got {other:?}"),
    }
}

#[test]
fn test_method_not_allowed_lists_methods() {
    let router = forum_like_router();
    match router.route(&Method::DELETE, "/threads") {
        RouteOutcome::MethodNotAllowed { allowed } => {
            assert_eq!(allowed, vec![Method::POST]);
        }
        other => panic!("expected 405, got {other:?}"),
    }
}

#[test]
fn test_trailing_slash_and_root() {
    let router = forum_like_router();
    assert_eq!(
        matched_handler(&router, Method::GET, "/").as_deref(),
        Some("HomeController@index")
    );
    assert_eq!(
        matched_handler(&router, Method::GET, "/threads/7/").as_deref(),
        Some("ThreadController@show")
    );
}

#[test]
fn test_empty_segment_does_not_bind_placeholder() {
    let router = forum_like_router();
    assert!(!router.route(&Method::GET, "/threads//").is_match());
}

#[test]
fn test_unbalanced_group_scope_rejected() {
    let mut r = RouteTable::builder();
    assert!(r.pop_group().is_err());

    let mut r = RouteTable::builder();
    r.push_group(GroupOptions::new().prefix("/open")).unwrap();
    r.get("/x", "OpenController@x").unwrap();
    assert!(r.build().is_err());
}

#[test]
fn test_nested_groups_compose() {
    let mut r = RouteTable::builder();
    r.group(
        GroupOptions::new().prefix("/api").middleware(["Cors"]),
        |r| {
            r.group(
                GroupOptions::new()
                    .prefix("/v1")
                    .middleware(["RateLimit"])
                    .auth(),
                |r| {
                    r.get("/threads", "Api\\ThreadController@index")?
                        .middleware("Trace");
                    Ok(())
                },
            )
        },
    )
    .unwrap();
    r.get("/after", "HomeController@after").unwrap();
    let table = r.build().unwrap();

    let nested = &table.routes()[0];
    assert_eq!(nested.pattern.as_str(), "/api/v1/threads");
    assert_eq!(nested.middleware, vec!["Cors", "Auth", "RateLimit", "Trace"]);
    assert!(nested.requires_auth);
    assert!(!nested.requires_admin);

    let after = &table.routes()[1];
    assert_eq!(after.pattern.as_str(), "/after");
    assert!(after.middleware.is_empty());
    assert!(!after.requires_auth);
}

#[test]
fn test_invalid_declarations() {
    let mut r = RouteTable::builder();
    assert!(matches!(
        r.get("/threads/{id", "ThreadController@show"),
        Err(ConfigError::MalformedPattern { .. })
    ));
    assert!(matches!(
        r.get("/threads/{id}", "NotAReference"),
        Err(ConfigError::MalformedHandlerRef(_))
    ));
    assert!(matches!(
        r.add("/x", "XController@x", &[Method::PATCH], false, false),
        Err(ConfigError::UnsupportedMethod(_))
    ));
}

#[test]
fn test_supported_methods() {
    assert_eq!(SUPPORTED_METHODS.len(), 5);
    assert!(SUPPORTED_METHODS.contains(&Method::OPTIONS));
    assert!(!SUPPORTED_METHODS.contains(&Method::PATCH));
}

#[test]
fn test_pattern_param_names() {
    let pattern = PathPattern::parse("/threads/{thread}/posts/{id}").unwrap();
    assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["thread", "id"]);
}
