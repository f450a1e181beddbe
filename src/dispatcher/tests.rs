use super::*;
use crate::config::DispatchConfig;
use crate::error::{DispatchError, MatchError};
use crate::handler::{Binding, HandlerMethod, ReturnType, ReturnValue, ValueType};
use crate::mapping::MappingOptions;
use crate::media::MediaType;
use crate::registry::Registry;
use crate::request::HttpRequest;
use anyhow::anyhow;
use http::{Method, StatusCode};
use std::sync::Arc;

fn text_handler(bean: &str, method: &str, reply: &'static str) -> HandlerMethod {
    HandlerMethod::builder(bean, method)
        .returns(ReturnType::Body(ValueType::String))
        .invoke(move |_| Ok(ReturnValue::text(reply)))
}

fn register(registry: &Registry, paths: &[&str], methods: &[Method], handler: HandlerMethod) {
    let descriptor = registry.mapping(paths).methods(methods).build().unwrap();
    registry.register(descriptor, handler).unwrap();
}

fn request(method: Method, uri: &str) -> HttpRequest {
    HttpRequest::builder(method, uri).build()
}

fn match_error(dispatcher: &Dispatcher, request: &HttpRequest) -> MatchError {
    match dispatcher.lookup(request) {
        Err(e) => e,
        Ok(other) => panic!("expected a match error, got {other:?}"),
    }
}

fn handler_match(dispatcher: &Dispatcher, request: &HttpRequest) -> HandlerMatch {
    match dispatcher.lookup(request) {
        Ok(Lookup::Handler(matched)) => matched,
        other => panic!("expected a handler, got {other:?}"),
    }
}

#[test]
fn test_lookup_fills_scratch() {
    let registry = Arc::new(Registry::default());
    let show = HandlerMethod::builder("ItemController", "show")
        .param("id", ValueType::String, Binding::path_variable())
        .returns(ReturnType::Body(ValueType::String))
        .invoke(|args| Ok(ReturnValue::text(args.str("id").unwrap_or_default())));
    register(&registry, &["/items/{id}"], &[Method::GET], show);
    let dispatcher = Dispatcher::new(Arc::clone(&registry));

    let matched = handler_match(&dispatcher, &request(Method::GET, "/items/42"));
    assert_eq!(matched.handler().id().to_string(), "ItemController#show");
    assert_eq!(matched.scratch().best_pattern, "/items/{id}");
    assert_eq!(matched.scratch().lookup_path, "/items/42");
    assert_eq!(matched.scratch().uri_variable("id"), Some("42"));
    assert!(matched.scratch().producible_media_types.is_empty());

    let response = dispatcher.dispatch(&request(Method::GET, "/items/42")).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body_text(), "42");
}

#[test]
fn test_literal_beats_pattern() {
    let registry = Arc::new(Registry::default());
    register(&registry, &["/items/{id}"], &[Method::GET], text_handler("Items", "show", "show"));
    register(&registry, &["/items/new"], &[Method::GET], text_handler("Items", "form", "form"));
    let dispatcher = Dispatcher::new(registry);

    let response = dispatcher.dispatch(&request(Method::GET, "/items/new")).unwrap();
    assert_eq!(response.body_text(), "form");
    let response = dispatcher.dispatch(&request(Method::GET, "/items/7")).unwrap();
    assert_eq!(response.body_text(), "show");
}

#[test]
fn test_declared_method_beats_more_specific_path() {
    let registry = Arc::new(Registry::default());
    register(&registry, &["/items/{id}"], &[], text_handler("Items", "any", "any"));
    register(&registry, &["/items/**"], &[Method::GET], text_handler("Items", "read", "read"));
    let dispatcher = Dispatcher::new(registry);

    let response = dispatcher.dispatch(&request(Method::GET, "/items/5")).unwrap();
    assert_eq!(response.body_text(), "read");
    let response = dispatcher.dispatch(&request(Method::DELETE, "/items/5")).unwrap();
    assert_eq!(response.body_text(), "any");
}

#[test]
fn test_direct_hit_that_fails_falls_back_to_scan() {
    let registry = Arc::new(Registry::default());
    register(&registry, &["/items/new"], &[Method::POST], text_handler("Items", "create", "create"));
    register(&registry, &["/items/{id}"], &[Method::GET], text_handler("Items", "show", "show"));
    let dispatcher = Dispatcher::new(registry);

    let response = dispatcher.dispatch(&request(Method::GET, "/items/new")).unwrap();
    assert_eq!(response.body_text(), "show");
}

#[test]
fn test_ambiguous_mappings_fail() {
    let registry = Arc::new(Registry::default());
    register(&registry, &["/a/{x}"], &[Method::GET], text_handler("A", "first", "1"));
    register(&registry, &["/a/{y}"], &[Method::GET], text_handler("A", "second", "2"));
    let dispatcher = Dispatcher::new(registry);

    match match_error(&dispatcher, &request(Method::GET, "/a/1")) {
        MatchError::AmbiguousMapping {
            path,
            candidate_a,
            candidate_b,
        } => {
            assert_eq!(path, "/a/1");
            let both = format!("{candidate_a} {candidate_b}");
            assert!(both.contains("A#first"));
            assert!(both.contains("A#second"));
        }
        other => panic!("expected AmbiguousMapping, got {other:?}"),
    }

    let response = dispatcher.handle(&request(Method::GET, "/a/1"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_method_mismatch_wins_over_consumes() {
    let registry = Arc::new(Registry::default());
    let create = registry
        .mapping(&["/x"])
        .methods(&[Method::POST])
        .consumes(&["application/json"])
        .build()
        .unwrap();
    registry.register(create, text_handler("X", "create", "created")).unwrap();
    register(&registry, &["/x"], &[Method::GET], text_handler("X", "show", "shown"));
    let dispatcher = Dispatcher::new(registry);

    let delete = HttpRequest::builder(Method::DELETE, "/x")
        .header("content-type", "application/xml")
        .body("<x/>")
        .build();
    match match_error(&dispatcher, &delete) {
        MatchError::MethodNotAllowed { method, allowed } => {
            assert_eq!(method, Method::DELETE);
            assert_eq!(allowed, vec![Method::GET, Method::POST]);
        }
        other => panic!("expected MethodNotAllowed, got {other:?}"),
    }

    let response = dispatcher.handle(&delete);
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET, POST"));
}

#[test]
fn test_consumes_mismatch() {
    let registry = Arc::new(Registry::default());
    let create = registry
        .mapping(&["/x"])
        .methods(&[Method::POST])
        .consumes(&["application/json"])
        .build()
        .unwrap();
    registry.register(create, text_handler("X", "create", "created")).unwrap();
    let dispatcher = Dispatcher::new(registry);

    let post = HttpRequest::builder(Method::POST, "/x")
        .header("content-type", "application/xml")
        .body("<x/>")
        .build();
    match match_error(&dispatcher, &post) {
        MatchError::UnsupportedMediaType {
            content_type,
            supported,
        } => {
            assert_eq!(content_type.as_deref(), Some("application/xml"));
            assert_eq!(supported, vec![MediaType::application_json()]);
        }
        other => panic!("expected UnsupportedMediaType, got {other:?}"),
    }
}

#[test]
fn test_produces_mismatch() {
    let registry = Arc::new(Registry::default());
    let report = registry
        .mapping(&["/report"])
        .methods(&[Method::GET])
        .produces(&["application/json"])
        .build()
        .unwrap();
    registry.register(report, text_handler("Report", "show", "{}")).unwrap();
    let dispatcher = Dispatcher::new(registry);

    let get = HttpRequest::builder(Method::GET, "/report")
        .header("accept", "text/html")
        .build();
    match match_error(&dispatcher, &get) {
        MatchError::NotAcceptable { producible } => {
            assert_eq!(producible, vec![MediaType::application_json()]);
        }
        other => panic!("expected NotAcceptable, got {other:?}"),
    }
    assert_eq!(dispatcher.handle(&get).status(), StatusCode::NOT_ACCEPTABLE);
}

#[test]
fn test_params_mismatch() {
    let registry = Arc::new(Registry::default());
    let search = registry
        .mapping(&["/search"])
        .methods(&[Method::GET])
        .params(&["q"])
        .build()
        .unwrap();
    registry.register(search, text_handler("Search", "run", "hits")).unwrap();
    let dispatcher = Dispatcher::new(registry);

    match match_error(&dispatcher, &request(Method::GET, "/search?page=2")) {
        MatchError::UnsatisfiedParams { failing, actual } => {
            assert_eq!(failing, vec!["q".to_string()]);
            assert_eq!(actual, vec![("page".to_string(), vec!["2".to_string()])]);
        }
        other => panic!("expected UnsatisfiedParams, got {other:?}"),
    }
    let response = dispatcher.dispatch(&request(Method::GET, "/search?q=rust")).unwrap();
    assert_eq!(response.body_text(), "hits");
}

#[test]
fn test_no_route_and_header_mismatch_are_not_found() {
    let registry = Arc::new(Registry::default());
    let guarded = registry
        .mapping(&["/guarded"])
        .methods(&[Method::GET])
        .headers(&["x-api=1"])
        .build()
        .unwrap();
    registry.register(guarded, text_handler("Guarded", "show", "ok")).unwrap();
    let dispatcher = Dispatcher::new(registry);

    assert!(matches!(
        match_error(&dispatcher, &request(Method::GET, "/missing")),
        MatchError::NoRouteFound { .. }
    ));
    assert!(matches!(
        match_error(&dispatcher, &request(Method::GET, "/guarded")),
        MatchError::NoRouteFound { .. }
    ));
    assert_eq!(
        dispatcher.handle(&request(Method::GET, "/missing")).status(),
        StatusCode::NOT_FOUND
    );
}

#[test]
fn test_options_for_post_only_path() {
    let registry = Arc::new(Registry::default());
    register(&registry, &["/widgets"], &[Method::POST], text_handler("Widgets", "create", "ok"));
    let dispatcher = Dispatcher::new(registry);

    let response = dispatcher.dispatch(&request(Method::OPTIONS, "/widgets")).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.header("allow"), Some("POST, OPTIONS"));
    assert!(response.header("accept-patch").is_none());
    assert!(response.body().is_empty());
}

#[test]
fn test_options_adds_head_for_get_and_accept_patch() {
    let registry = Arc::new(Registry::default());
    register(&registry, &["/docs/{id}"], &[Method::GET], text_handler("Docs", "show", "doc"));
    let patch = registry
        .mapping(&["/docs/{id}"])
        .methods(&[Method::PATCH])
        .consumes(&["application/merge-patch+json"])
        .build()
        .unwrap();
    registry.register(patch, text_handler("Docs", "patch", "patched")).unwrap();
    let dispatcher = Dispatcher::new(registry);

    match dispatcher.lookup(&request(Method::OPTIONS, "/docs/1")).unwrap() {
        Lookup::Options(responder) => {
            assert_eq!(
                responder.allow(),
                &[Method::GET, Method::HEAD, Method::PATCH, Method::OPTIONS]
            );
            assert_eq!(
                responder.accept_patch(),
                &[MediaType::parse("application/merge-patch+json").unwrap()]
            );
            let response = responder.to_response();
            assert_eq!(response.header("allow"), Some("GET, HEAD, PATCH, OPTIONS"));
            assert_eq!(
                response.header("accept-patch"),
                Some("application/merge-patch+json")
            );
        }
        other => panic!("expected an OPTIONS answer, got {other:?}"),
    }
}

#[test]
fn test_options_without_declared_methods_allows_all_but_trace() {
    let registry = Arc::new(Registry::default());
    register(&registry, &["/any"], &[], text_handler("Any", "handle", "ok"));
    let dispatcher = Dispatcher::new(registry);

    let response = dispatcher.dispatch(&request(Method::OPTIONS, "/any")).unwrap();
    assert_eq!(
        response.header("allow"),
        Some("GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS")
    );
}

#[test]
fn test_explicit_options_mapping_is_invoked() {
    let registry = Arc::new(Registry::default());
    register(&registry, &["/widgets"], &[Method::POST], text_handler("Widgets", "create", "ok"));
    register(
        &registry,
        &["/widgets"],
        &[Method::OPTIONS],
        text_handler("Widgets", "options", "custom"),
    );
    let dispatcher = Dispatcher::new(registry);

    let response = dispatcher.dispatch(&request(Method::OPTIONS, "/widgets")).unwrap();
    assert_eq!(response.body_text(), "custom");
}

#[test]
fn test_head_served_by_get_without_body() {
    let registry = Arc::new(Registry::default());
    register(&registry, &["/items"], &[Method::GET], text_handler("Items", "list", "all items"));
    let dispatcher = Dispatcher::new(registry);

    let response = dispatcher.dispatch(&request(Method::HEAD, "/items")).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.content_type(), Some(MediaType::text_plain()));
    assert!(response.body().is_empty());
}

#[test]
fn test_explicit_head_mapping_beats_get() {
    let registry = Arc::new(Registry::default());
    register(&registry, &["/items"], &[Method::GET], text_handler("Items", "list", "list"));
    register(&registry, &["/items"], &[Method::HEAD], text_handler("Items", "head", "head"));
    let dispatcher = Dispatcher::new(registry);

    let matched = handler_match(&dispatcher, &request(Method::HEAD, "/items"));
    assert_eq!(matched.handler().id().method(), "head");
}

#[test]
fn test_handler_errors_and_panics_become_500() {
    let registry = Arc::new(Registry::default());
    register(
        &registry,
        &["/fails"],
        &[Method::GET],
        HandlerMethod::builder("Broken", "fails").invoke(|_| Err(anyhow!("database unavailable"))),
    );
    register(
        &registry,
        &["/panics"],
        &[Method::GET],
        HandlerMethod::builder("Broken", "panics").invoke(|_| panic!("handler bug")),
    );
    let dispatcher = Dispatcher::new(registry);

    match dispatcher.dispatch(&request(Method::GET, "/fails")) {
        Err(DispatchError::Handler(e)) => assert_eq!(e.to_string(), "database unavailable"),
        other => panic!("expected a handler error, got {other:?}"),
    }
    match dispatcher.dispatch(&request(Method::GET, "/panics")) {
        Err(DispatchError::Handler(e)) => assert!(e.to_string().contains("handler bug")),
        other => panic!("expected a handler error, got {other:?}"),
    }
    let response = dispatcher.handle(&request(Method::GET, "/panics"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_narrowed_produces_reaches_scratch() {
    let registry = Arc::new(Registry::default());
    let show = registry
        .mapping(&["/items/{id}"])
        .methods(&[Method::GET])
        .produces(&["application/json", "application/xml"])
        .build()
        .unwrap();
    registry.register(show, text_handler("Items", "show", "x")).unwrap();
    let dispatcher = Dispatcher::new(registry);

    let get = HttpRequest::builder(Method::GET, "/items/1")
        .header("accept", "application/xml")
        .build();
    let matched = handler_match(&dispatcher, &get);
    assert_eq!(
        matched.scratch().producible_media_types,
        vec![MediaType::application_xml()]
    );
}

#[test]
fn test_template_strategy_dispatch() {
    let registry = Arc::new(Registry::new(MappingOptions::template()));
    let show = HandlerMethod::builder("UserController", "show")
        .param("id", ValueType::Integer, Binding::path_variable())
        .invoke(|args| Ok(ReturnValue::body(serde_json::json!({ "id": args.i64("id") }))));
    register(&registry, &["/users/{id}"], &[Method::GET], show);
    register(&registry, &["/files/**"], &[Method::GET], text_handler("Files", "serve", "file"));
    let dispatcher = Dispatcher::new(registry);

    let response = dispatcher.dispatch(&request(Method::GET, "/users/7")).unwrap();
    assert_eq!(response.body_text(), r#"{"id":7}"#);
    let response = dispatcher.dispatch(&request(Method::GET, "/files/a/b.txt")).unwrap();
    assert_eq!(response.body_text(), "file");
}

#[test]
fn test_trailing_slash_match() {
    let options = MappingOptions {
        trailing_slash_match: true,
        ..MappingOptions::default()
    };
    let registry = Arc::new(Registry::new(options));
    register(&registry, &["/items"], &[Method::GET], text_handler("Items", "list", "list"));
    let dispatcher = Dispatcher::new(Arc::clone(&registry));
    assert_eq!(
        dispatcher.dispatch(&request(Method::GET, "/items/")).unwrap().body_text(),
        "list"
    );

    let strict = Arc::new(Registry::default());
    register(&strict, &["/items"], &[Method::GET], text_handler("Items", "list", "list"));
    let dispatcher = Dispatcher::new(strict);
    assert!(matches!(
        match_error(&dispatcher, &request(Method::GET, "/items/")),
        MatchError::NoRouteFound { .. }
    ));
}

#[test]
fn test_builder_applies_config() {
    let registry = Arc::new(Registry::default());
    register(&registry, &["/items"], &[Method::GET], text_handler("Items", "list", "list"));
    let config = DispatchConfig {
        resolver_cache: false,
        slow_lookup_threshold_us: 1,
        ..DispatchConfig::default()
    };
    let dispatcher = Dispatcher::builder(registry).config(config).build();
    assert_eq!(
        dispatcher.dispatch(&request(Method::GET, "/items")).unwrap().body_text(),
        "list"
    );
}

#[test]
fn test_late_registration_is_visible() {
    let registry = Arc::new(Registry::default());
    let dispatcher = Dispatcher::new(Arc::clone(&registry));
    assert!(dispatcher.lookup(&request(Method::GET, "/late")).is_err());
    register(&registry, &["/late"], &[Method::GET], text_handler("Late", "show", "late"));
    assert_eq!(
        dispatcher.dispatch(&request(Method::GET, "/late")).unwrap().body_text(),
        "late"
    );
}
