#![allow(dead_code)]

//! Shared fixtures for the integration tests.

/// Registries pre-populated with a small item catalogue.
pub mod controllers {
    use brrtmvc::handler::{Binding, HandlerMethod, ReturnType, ReturnValue, ValueType};
    use brrtmvc::mapping::MappingOptions;
    use brrtmvc::registry::Registry;
    use http::Method;
    use serde_json::json;
    use std::sync::Arc;

    /// Register `handler` under `paths` restricted to `methods`.
    pub fn register(registry: &Registry, paths: &[&str], methods: &[Method], handler: HandlerMethod) {
        let descriptor = registry
            .mapping(paths)
            .methods(methods)
            .build()
            .expect("descriptor");
        registry.register(descriptor, handler).expect("registration");
    }

    /// A handler that always answers `reply` as text.
    pub fn text_handler(bean: &str, method: &str, reply: &'static str) -> HandlerMethod {
        HandlerMethod::builder(bean, method)
            .returns(ReturnType::Body(ValueType::String))
            .invoke(move |_| Ok(ReturnValue::text(reply)))
    }

    /// `GET /items/{id}` echoing the id as text.
    pub fn show_item() -> HandlerMethod {
        HandlerMethod::builder("ItemController", "show")
            .param("id", ValueType::String, Binding::path_variable())
            .returns(ReturnType::Body(ValueType::String))
            .invoke(|args| Ok(ReturnValue::text(args.str("id").unwrap_or_default())))
    }

    /// `GET /items` listing items as JSON, optionally limited by `?limit=`.
    pub fn list_items() -> HandlerMethod {
        HandlerMethod::builder("ItemController", "list")
            .param(
                "limit",
                ValueType::optional(ValueType::Integer),
                Binding::request_param(),
            )
            .returns(ReturnType::Body(ValueType::Json))
            .invoke(|args| {
                let items = vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})];
                let limit = args
                    .i64("limit")
                    .and_then(|l| usize::try_from(l).ok())
                    .unwrap_or(items.len());
                Ok(ReturnValue::body(json!(items.into_iter().take(limit).collect::<Vec<_>>())))
            })
    }

    /// `POST /items` echoing the JSON body with an assigned id.
    pub fn create_item() -> HandlerMethod {
        HandlerMethod::builder("ItemController", "create")
            .param("item", ValueType::Json, Binding::request_body())
            .returns(ReturnType::Body(ValueType::Json))
            .invoke(|args| {
                let mut item = args.value("item").cloned().unwrap_or_default();
                item["id"] = json!(100);
                Ok(ReturnValue::body(item))
            })
    }

    /// The item catalogue under the default (parsed) strategy.
    pub fn item_registry() -> Arc<Registry> {
        item_registry_with(MappingOptions::default())
    }

    pub fn item_registry_with(options: MappingOptions) -> Arc<Registry> {
        let registry = Arc::new(Registry::new(options));
        register(&registry, &["/items/{id}"], &[Method::GET], show_item());
        register(&registry, &["/items"], &[Method::GET], list_items());
        let create = registry
            .mapping(&["/items"])
            .methods(&[Method::POST])
            .consumes(&["application/json"])
            .build()
            .expect("descriptor");
        registry.register(create, create_item()).expect("registration");
        registry
    }
}

/// An XML body writer for JSON-typed values.
pub mod converters {
    use brrtmvc::codec::{ConversionError, MessageConverter};
    use brrtmvc::handler::ValueType;
    use brrtmvc::media::MediaType;
    use serde_json::Value;

    #[derive(Debug)]
    pub struct XmlConverter {
        supported: Vec<MediaType>,
    }

    impl Default for XmlConverter {
        fn default() -> Self {
            Self {
                supported: vec![MediaType::application_xml()],
            }
        }
    }

    impl MessageConverter for XmlConverter {
        fn name(&self) -> &str {
            "XmlConverter"
        }

        fn supported_media_types(&self) -> &[MediaType] {
            &self.supported
        }

        fn can_read(&self, _target: &ValueType, _media_type: Option<&MediaType>) -> bool {
            false
        }

        fn read(
            &self,
            _target: &ValueType,
            _body: &[u8],
            _media_type: Option<&MediaType>,
        ) -> Result<Value, ConversionError> {
            Err(ConversionError::new(self.name(), "read not supported"))
        }

        fn can_write(&self, value_type: &ValueType, media_type: Option<&MediaType>) -> bool {
            *value_type.nested() == ValueType::Json
                && media_type.map_or(true, |m| {
                    m.is_wildcard_type() || self.supported.iter().any(|s| s.is_compatible_with(m))
                })
        }

        fn write(&self, value: &Value, _media_type: &MediaType) -> Result<Vec<u8>, ConversionError> {
            Ok(format!("<value>{value}</value>").into_bytes())
        }
    }
}

/// Request shorthands.
pub mod requests {
    use brrtmvc::request::HttpRequest;
    use http::Method;

    pub fn get(uri: &str) -> HttpRequest {
        HttpRequest::builder(Method::GET, uri).build()
    }

    pub fn with_accept(method: Method, uri: &str, accept: &str) -> HttpRequest {
        HttpRequest::builder(method, uri).header("accept", accept).build()
    }

    pub fn json_body(method: Method, uri: &str, body: &str) -> HttpRequest {
        HttpRequest::builder(method, uri)
            .header("content-type", "application/json")
            .body(body.as_bytes().to_vec())
            .build()
    }

    pub fn body_json(response: &brrtmvc::HttpResponse) -> serde_json::Value {
        serde_json::from_slice(response.body()).expect("json body")
    }
}

/// Capture formatted `tracing` output for assertions.
pub mod logs {
    use std::io::Write;
    use std::sync::{Arc, Mutex, PoisonError};

    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub fn contents(&self) -> String {
            let buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a thread-local subscriber writing into the returned
    /// buffer.
    pub fn capture<R>(f: impl FnOnce() -> R) -> (R, CapturedLogs) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, logs)
    }
}
