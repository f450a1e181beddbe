//! Content negotiation and response writing
//!
//! # Test Coverage
//!
//! - Accept-header quality ordering against declared `produces`
//! - 406 from mapping (declared produces) and from writing (no writer)
//! - Response entities, header-only and unit returns
//! - Response-body advice
//! - Streaming and server-sent-event responses fed from another thread

mod common;

use brrtmvc::codec::MessageConverter;
use brrtmvc::dispatcher::Dispatcher;
use brrtmvc::handler::{HandlerMethod, ReturnType, ReturnValue, ValueType};
use brrtmvc::media::MediaType;
use brrtmvc::registry::Registry;
use brrtmvc::request::RequestContext;
use brrtmvc::response::HttpResponse;
use brrtmvc::returns::{ResponseBodyAdvice, ResponseBodyEmitter, ResponseEntity, SseEvent};
use common::controllers::register;
use common::converters::XmlConverter;
use common::requests::{body_json, get, with_accept};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

fn catalog_dispatcher() -> Dispatcher {
    let registry = Arc::new(Registry::default());
    let product = HandlerMethod::builder("CatalogController", "product")
        .returns(ReturnType::Body(ValueType::Json))
        .invoke(|_| Ok(ReturnValue::body(json!({"sku": "X1"}))));
    let descriptor = registry
        .mapping(&["/products/x1"])
        .methods(&[Method::GET])
        .produces(&["application/json", "application/xml"])
        .build()
        .unwrap();
    registry.register(descriptor, product).unwrap();

    let feed = HandlerMethod::builder("CatalogController", "feed")
        .returns(ReturnType::Body(ValueType::Json))
        .invoke(|_| Ok(ReturnValue::body(json!([1, 2]))));
    register(&registry, &["/feed"], &[Method::GET], feed);

    Dispatcher::builder(registry)
        .converter(Arc::new(XmlConverter::default()))
        .build()
}

#[test]
fn test_accept_quality_selects_xml() {
    let dispatcher = catalog_dispatcher();

    let response = dispatcher.handle(&with_accept(
        Method::GET,
        "/products/x1",
        "application/xml;q=1.0, application/json;q=0.5",
    ));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.content_type(), Some(MediaType::application_xml()));
    assert_eq!(response.body_text(), r#"<value>{"sku":"X1"}</value>"#);

    let response = dispatcher.handle(&with_accept(
        Method::GET,
        "/products/x1",
        "application/xml;q=0.2, application/json",
    ));
    assert_eq!(response.content_type(), Some(MediaType::application_json()));
    assert_eq!(body_json(&response), json!({"sku": "X1"}));
}

#[test]
fn test_wildcard_accept_uses_first_declared_type() {
    let dispatcher = catalog_dispatcher();
    let response = dispatcher.handle(&get("/products/x1"));
    assert_eq!(response.content_type(), Some(MediaType::application_json()));
}

#[test]
fn test_not_acceptable_from_mapping_and_from_writer() {
    let dispatcher = catalog_dispatcher();

    // declared produces rule the mapping out
    let response = dispatcher.handle(&with_accept(Method::GET, "/products/x1", "text/html"));
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    assert_eq!(
        body_json(&response)["producible_types"],
        json!(["application/json", "application/xml"])
    );

    // nothing declared, but no writer produces text/html for JSON values
    let response = dispatcher.handle(&with_accept(Method::GET, "/feed", "text/html"));
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    let producible = body_json(&response)["producible_types"].clone();
    assert!(producible.as_array().unwrap().contains(&json!("application/json")));
}

#[test]
fn test_entity_headers_and_unit_returns() {
    let registry = Arc::new(Registry::default());
    let created = HandlerMethod::builder("WidgetController", "create")
        .returns(ReturnType::Entity(ValueType::Json))
        .invoke(|_| {
            Ok(ReturnValue::Entity(
                ResponseEntity::new(StatusCode::CREATED)
                    .header("location", "/widgets/9")
                    .with_body(json!({"id": 9})),
            ))
        });
    let removed = HandlerMethod::builder("WidgetController", "remove")
        .returns(ReturnType::Entity(ValueType::Json))
        .invoke(|_| Ok(ReturnValue::Entity(ResponseEntity::no_content())));
    let probe = HandlerMethod::builder("WidgetController", "probe")
        .returns(ReturnType::Headers)
        .invoke(|_| {
            let mut headers = HeaderMap::new();
            headers.insert("x-widget-count", HeaderValue::from_static("9"));
            Ok(ReturnValue::Headers(headers))
        });
    let touch = HandlerMethod::builder("WidgetController", "touch")
        .returns(ReturnType::Unit)
        .invoke(|_| Ok(ReturnValue::Unit));
    register(&registry, &["/widgets"], &[Method::POST], created);
    register(&registry, &["/widgets/9"], &[Method::DELETE], removed);
    register(&registry, &["/widgets/9"], &[Method::HEAD], probe);
    register(&registry, &["/widgets/9/touch"], &[Method::PUT], touch);
    let dispatcher = Dispatcher::new(registry);

    let response = dispatcher.handle(&brrtmvc::HttpRequest::builder(Method::POST, "/widgets").build());
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.header("location"), Some("/widgets/9"));
    assert_eq!(body_json(&response), json!({"id": 9}));

    let response = dispatcher.handle(&brrtmvc::HttpRequest::builder(Method::DELETE, "/widgets/9").build());
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.body().is_empty());

    let response = dispatcher.handle(&brrtmvc::HttpRequest::builder(Method::HEAD, "/widgets/9").build());
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.header("x-widget-count"), Some("9"));

    let response = dispatcher.handle(&brrtmvc::HttpRequest::builder(Method::PUT, "/widgets/9/touch").build());
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.body().is_empty());
}

/// Wraps JSON bodies in `{"data": ...}` and tags the response.
#[derive(Debug)]
struct EnvelopeAdvice;

impl ResponseBodyAdvice for EnvelopeAdvice {
    fn supports(&self, _return_type: &ReturnType, converter: &dyn MessageConverter) -> bool {
        converter.name() == "JsonMessageConverter"
    }

    fn before_body_write(
        &self,
        body: Value,
        _content_type: &MediaType,
        _converter: &dyn MessageConverter,
        _context: &RequestContext<'_>,
        response: &mut HttpResponse,
    ) -> Value {
        response.set_header("x-enveloped", "true");
        json!({ "data": body })
    }
}

#[test]
fn test_response_body_advice_wraps_json_only() {
    let registry = Arc::new(Registry::default());
    let stats = HandlerMethod::builder("StatsController", "stats")
        .returns(ReturnType::Body(ValueType::Json))
        .invoke(|_| Ok(ReturnValue::body(json!({"hits": 3}))));
    let motd = HandlerMethod::builder("StatsController", "motd")
        .returns(ReturnType::Body(ValueType::String))
        .invoke(|_| Ok(ReturnValue::text("hello")));
    register(&registry, &["/stats"], &[Method::GET], stats);
    register(&registry, &["/motd"], &[Method::GET], motd);
    let dispatcher = Dispatcher::builder(registry)
        .response_body_advice(Arc::new(EnvelopeAdvice))
        .build();

    let response = dispatcher.handle(&get("/stats"));
    assert_eq!(body_json(&response), json!({"data": {"hits": 3}}));
    assert_eq!(response.header("x-enveloped"), Some("true"));

    let response = dispatcher.handle(&get("/motd"));
    assert_eq!(response.body_text(), "hello");
    assert_eq!(response.header("x-enveloped"), None);
}

fn frames(response: &mut HttpResponse) -> Vec<String> {
    let stream = response.take_stream().expect("streaming response");
    stream
        .iter()
        .map(|frame| String::from_utf8(frame).unwrap())
        .collect()
}

#[test]
fn test_server_sent_events_from_worker_thread() {
    let registry = Arc::new(Registry::default());
    let ticks = HandlerMethod::builder("ClockController", "ticks")
        .returns(ReturnType::Emitter)
        .invoke(|_| {
            let emitter = ResponseBodyEmitter::sse();
            let producer = emitter.clone();
            std::thread::spawn(move || {
                for n in 1..=3 {
                    if producer
                        .send_event(SseEvent::data(json!({"n": n})).id(n.to_string()))
                        .is_err()
                    {
                        return;
                    }
                }
                producer.complete();
            });
            Ok(ReturnValue::Emitter(emitter))
        });
    register(&registry, &["/ticks"], &[Method::GET], ticks);
    let dispatcher = Dispatcher::new(registry);

    let mut response = dispatcher.handle(&with_accept(Method::GET, "/ticks", "text/event-stream"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.content_type(), Some(MediaType::text_event_stream()));
    assert_eq!(
        frames(&mut response),
        vec![
            "id: 1\ndata: {\"n\":1}\n\n",
            "id: 2\ndata: {\"n\":2}\n\n",
            "id: 3\ndata: {\"n\":3}\n\n",
        ]
    );
}

#[test]
fn test_plain_emitter_streams_json_values() {
    let registry = Arc::new(Registry::default());
    let export = HandlerMethod::builder("ExportController", "rows")
        .returns(ReturnType::Emitter)
        .invoke(|_| {
            let emitter = ResponseBodyEmitter::new();
            emitter.send(json!({"row": 1}))?;
            emitter.send(json!({"row": 2}))?;
            emitter.complete();
            Ok(ReturnValue::Emitter(emitter))
        });
    register(&registry, &["/export"], &[Method::GET], export);
    let dispatcher = Dispatcher::new(registry);

    let mut response = dispatcher.handle(&get("/export"));
    assert_eq!(response.content_type(), Some(MediaType::application_json()));
    assert_eq!(frames(&mut response), vec![r#"{"row":1}"#, r#"{"row":2}"#]);
}
