use super::*;
use crate::error::ConfigError;
use http::Method;

#[test]
fn test_root_pattern() {
    let p = PathPattern::parse("/").unwrap();
    assert!(p.segments().is_empty());
    assert!(p.match_path("/").is_some());
    assert!(p.match_path("/x").is_none());
}

#[test]
fn test_parameterized_pattern() {
    let p = PathPattern::parse("/threads/{id}").unwrap();
    let params = p.match_path("/threads/123").unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].0.as_ref(), "id");
    assert_eq!(params[0].1, "123");
    assert_eq!(p.param_names().collect::<Vec<_>>(), vec!["id"]);
}

#[test]
fn test_segment_count_must_match() {
    let p = PathPattern::parse("/a/{b}/c").unwrap();
    assert!(p.match_path("/a/1/c").is_some());
    assert!(p.match_path("/a/1").is_none());
    assert!(p.match_path("/a/1/c/d").is_none());
}

#[test]
fn test_trailing_slash_normalized_on_both_sides() {
    let p = PathPattern::parse("/categories/").unwrap();
    assert_eq!(p.as_str(), "/categories");
    assert!(p.match_path("/categories/").is_some());
    assert!(p.match_path("//categories").is_some());
}

#[test]
fn test_placeholder_value_is_percent_decoded() {
    let p = PathPattern::parse("/tags/{tag}").unwrap();
    let params = p.match_path("/tags/rust%20lang").unwrap();
    assert_eq!(params[0].1, "rust lang");
}

#[test]
fn test_literals_are_case_sensitive() {
    let p = PathPattern::parse("/Threads").unwrap();
    assert!(p.match_path("/threads").is_none());
}

#[test]
fn test_malformed_patterns_rejected() {
    for bad in [
        "/threads/{id",
        "/threads/id}",
        "/threads/{}",
        "/threads/x{id}",
        "/threads/{1id}",
        "/threads/{id}/posts/{id}",
        "threads",
    ] {
        let err = PathPattern::parse(bad).unwrap_err();
        assert!(
            matches!(err, ConfigError::MalformedPattern { .. }),
            "expected malformed pattern for {bad}, got {err:?}"
        );
    }
}

#[test]
fn test_join_paths() {
    assert_eq!(join_paths("", "/"), "/");
    assert_eq!(join_paths("/admin", "/"), "/admin");
    assert_eq!(join_paths("/admin/", "users"), "/admin/users");
    assert_eq!(join_paths("/api", "/v1/threads/"), "/api/v1/threads");
}

#[test]
fn test_add_registers_one_route_per_method() {
    let mut b = RouteTable::builder();
    b.add(
        "/threads/{id}",
        "ThreadController@update",
        &[Method::PUT, Method::POST],
        true,
        false,
    )
    .unwrap();
    let table = b.build().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.routes()[0].method, Method::PUT);
    assert_eq!(table.routes()[1].method, Method::POST);
    assert!(table.iter().all(|r| r.requires_auth && !r.requires_admin));
}

#[test]
fn test_unsupported_method_rejected() {
    let mut b = RouteTable::builder();
    let err = b
        .add("/x", "C@a", &[Method::PATCH], false, false)
        .unwrap_err();
    assert_eq!(err, ConfigError::UnsupportedMethod("PATCH".into()));
    assert!(matches!(
        b.add("/x", "C@a", &[], false, false),
        Err(ConfigError::NoMethods(_))
    ));
}

#[test]
fn test_nested_groups_accumulate_prefix_and_middleware() {
    let mut b = RouteTable::builder();
    b.group(
        GroupOptions::new().prefix("/admin").middleware(["Auth"]),
        |b| {
            b.group(
                GroupOptions::new().prefix("/users").middleware(["Admin"]),
                |b| {
                    b.get("/edit/{id}", "AdminUserController@edit")?
                        .middleware("RateLimit");
                    Ok(())
                },
            )?;
            b.get("/", "AdminDashboardController@index")?;
            Ok(())
        },
    )
    .unwrap();
    b.get("/", "HomeController@index").unwrap();
    let table = b.build().unwrap();

    let edit = &table.routes()[0];
    assert_eq!(edit.pattern.as_str(), "/admin/users/edit/{id}");
    assert_eq!(edit.middleware, vec!["Auth", "Admin", "RateLimit"]);

    let dashboard = &table.routes()[1];
    assert_eq!(dashboard.pattern.as_str(), "/admin");
    assert_eq!(dashboard.middleware, vec!["Auth"]);

    let home = &table.routes()[2];
    assert_eq!(home.pattern.as_str(), "/");
    assert!(home.middleware.is_empty());
}

#[test]
fn test_group_flags_inherited() {
    let mut b = RouteTable::builder();
    b.push_group(GroupOptions::new().prefix("/mod").auth()).unwrap();
    b.push_group(GroupOptions::new().admin()).unwrap();
    b.get("/queue", "ModerationController@queue").unwrap();
    b.pop_group().unwrap();
    b.get("/stats", "ModerationController@stats").unwrap();
    b.pop_group().unwrap();
    let table = b.build().unwrap();
    assert!(table.routes()[0].requires_auth && table.routes()[0].requires_admin);
    assert!(table.routes()[1].requires_auth && !table.routes()[1].requires_admin);
}

#[test]
fn test_flag_checks_take_the_declaring_position() {
    let mut b = RouteTable::builder();
    b.group(
        GroupOptions::new().prefix("/api").middleware(["Cors", "RateLimit"]),
        |b| {
            b.group(GroupOptions::new().auth().middleware(["Moderator"]), |b| {
                b.post("/threads", "Api\\ThreadController@store")?
                    .middleware("Trace");
                Ok(())
            })?;
            b.get("/search", "Api\\SearchController@search")?
                .middleware("Trace")
                .admin();
            Ok(())
        },
    )
    .unwrap();
    let table = b.build().unwrap();

    let store = &table.routes()[0];
    assert_eq!(
        store.middleware,
        vec!["Cors", "RateLimit", "Auth", "Moderator", "Trace"]
    );

    let search = &table.routes()[1];
    assert_eq!(
        search.middleware,
        vec!["Cors", "RateLimit", "Auth", "Admin", "Trace"]
    );
    assert!(search.requires_auth && search.requires_admin);
}

#[test]
fn test_admin_implies_auth_without_duplicate_checks() {
    let mut b = RouteTable::builder();
    b.group(GroupOptions::new().prefix("/admin").middleware(["Auth"]).admin(), |b| {
        b.add("/users/{id}", "AdminController@updateUser", &[Method::PUT], true, true)?;
        Ok(())
    })
    .unwrap();
    let table = b.build().unwrap();
    let route = &table.routes()[0];
    assert_eq!(route.middleware, vec!["Auth", "Admin"]);
    assert!(route.requires_auth && route.requires_admin);
}

#[test]
fn test_malformed_group_prefix_reported_with_prefix() {
    let mut b = RouteTable::builder();
    let err = b
        .group(GroupOptions::new().prefix("/x/{id"), |b| {
            b.get("/posts", "PostController@index")?;
            Ok(())
        })
        .unwrap_err();
    match err {
        ConfigError::MalformedPattern { pattern, .. } => assert_eq!(pattern, "/x/{id"),
        other => panic!("expected malformed pattern, got {other:?}"),
    }
    assert_eq!(b.depth(), 0);
    assert!(b.build().unwrap().is_empty());
}

#[test]
fn test_group_scope_closed_on_error() {
    let mut b = RouteTable::builder();
    let err = b
        .group(GroupOptions::new().prefix("/x"), |b| {
            b.get("/{broken", "C@a")?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, ConfigError::MalformedPattern { .. }));
    assert_eq!(b.depth(), 0);
}

#[test]
fn test_unbalanced_groups_rejected() {
    let mut b = RouteTable::builder();
    assert_eq!(b.pop_group(), Err(ConfigError::GroupUnderflow));
    b.push_group(GroupOptions::new()).unwrap();
    assert_eq!(b.build().unwrap_err(), ConfigError::UnclosedGroups(1));
}

#[test]
fn test_malformed_handler_reference_rejected() {
    let mut b = RouteTable::builder();
    assert!(matches!(
        b.get("/x", "HomeController"),
        Err(ConfigError::MalformedHandlerRef(_))
    ));
}

fn forum_router() -> Router {
    let mut b = RouteTable::builder();
    b.get("/threads/new", "ThreadController@create").unwrap();
    b.get("/threads/{id}", "ThreadController@show").unwrap();
    b.put("/threads/{id}", "ThreadController@update").unwrap();
    b.get("/threads/{id}", "ThreadController@never").unwrap();
    Router::new(b.build().unwrap())
}

#[test]
fn test_first_registered_route_wins() {
    let router = forum_router();
    match router.route(&Method::GET, "/threads/new") {
        RouteOutcome::Matched(m) => {
            assert_eq!(m.route.handler.to_string(), "ThreadController@create");
            assert_eq!(m.index, 0);
            assert!(m.params.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
    match router.route(&Method::GET, "/threads/9") {
        RouteOutcome::Matched(m) => {
            assert_eq!(m.route.handler.to_string(), "ThreadController@show");
            assert_eq!(m.params.get("id"), Some("9"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_method_not_allowed_lists_methods() {
    let router = forum_router();
    match router.route(&Method::DELETE, "/threads/9") {
        RouteOutcome::MethodNotAllowed { allowed } => {
            assert_eq!(allowed, vec![Method::GET, Method::PUT]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_not_found_and_query_string_ignored() {
    let router = forum_router();
    assert!(matches!(
        router.route(&Method::GET, "/does/not/exist"),
        RouteOutcome::NotFound
    ));
    assert!(router.route(&Method::GET, "/threads/9?page=2").is_match());
}
