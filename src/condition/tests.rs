use super::*;
use crate::media::FixedContentNegotiator;
use crate::media::MediaType;
use crate::pattern::TemplatePathMatcher;
use http::Method;
use std::cmp::Ordering;
use std::sync::Arc;

fn get(uri: &str) -> HttpRequest {
    HttpRequest::builder(Method::GET, uri).build()
}

fn methods(list: &[Method]) -> RequestMethodsCondition {
    RequestMethodsCondition::new(list.iter().cloned())
}

fn consumes(list: &[&str]) -> ConsumesCondition {
    ConsumesCondition::new(list.iter().map(|e| MediaTypeExpression::parse(e).unwrap()).collect())
}

fn produces(list: &[&str]) -> ProducesCondition {
    ProducesCondition::new(
        list.iter().map(|e| MediaTypeExpression::parse(e).unwrap()).collect(),
        Arc::new(crate::media::HeaderContentNegotiator),
    )
}

#[test]
fn test_methods_empty_matches_all_but_options() {
    let empty = RequestMethodsCondition::default();
    assert!(empty.matching_condition(&get("/")).is_some());
    let options = HttpRequest::builder(Method::OPTIONS, "/").build();
    assert!(empty.matching_condition(&options).is_none());
}

#[test]
fn test_methods_narrow_to_request_method() {
    let condition = methods(&[Method::GET, Method::POST]);
    let post = HttpRequest::builder(Method::POST, "/").build();
    assert_eq!(condition.matching_condition(&post).unwrap().methods(), &[Method::POST]);
    let head = HttpRequest::builder(Method::HEAD, "/").build();
    assert_eq!(condition.matching_condition(&head).unwrap().methods(), &[Method::GET]);
    let delete = HttpRequest::builder(Method::DELETE, "/").build();
    assert!(condition.matching_condition(&delete).is_none());
}

#[test]
fn test_methods_compare() {
    let request = get("/");
    let explicit = methods(&[Method::GET]);
    let implicit = RequestMethodsCondition::default();
    assert_eq!(explicit.compare_to(&implicit, &request), Ordering::Less);
    assert_eq!(implicit.compare_to(&explicit, &request), Ordering::Greater);
    let head = methods(&[Method::HEAD]);
    assert_eq!(head.compare_to(&explicit, &request), Ordering::Less);
}

#[test]
fn test_methods_combine_is_associative_union() {
    let a = methods(&[Method::GET]);
    let b = methods(&[Method::POST, Method::GET]);
    let c = methods(&[Method::DELETE]);
    let left = a.combine(&b).combine(&c);
    let right = a.combine(&b.combine(&c));
    assert_eq!(left, right);
    assert_eq!(left.to_string(), "[GET || POST || DELETE]");
}

#[test]
fn test_params_expressions() {
    let condition = ParamsCondition::parse(&["page", "!debug", "sort=asc", "mode!=raw"]).unwrap();
    assert!(condition
        .matching_condition(&get("/?page=1&sort=asc"))
        .is_some());
    assert!(condition
        .matching_condition(&get("/?page=1&sort=asc&debug=1"))
        .is_none());
    assert!(condition
        .matching_condition(&get("/?page=1&sort=desc"))
        .is_none());
    assert!(condition
        .matching_condition(&get("/?page=1&sort=asc&mode=raw"))
        .is_none());
    assert_eq!(
        condition.failing_expressions(&get("/?sort=desc")),
        vec!["page".to_string(), "sort=asc".to_string()]
    );
}

#[test]
fn test_params_parse_errors() {
    assert!(ParamsCondition::parse(&["=x"]).is_err());
    assert!(ParamsCondition::parse(&["!a=1"]).is_err());
}

#[test]
fn test_params_combine_is_associative_union() {
    let a = ParamsCondition::parse(&["a"]).unwrap();
    let b = ParamsCondition::parse(&["b=1", "a"]).unwrap();
    let c = ParamsCondition::parse(&["!c"]).unwrap();
    assert_eq!(a.combine(&b).combine(&c), a.combine(&b.combine(&c)));
    assert_eq!(a.combine(&b).combine(&c).len(), 3);
}

#[test]
fn test_params_compare_prefers_more_and_valued_expressions() {
    let request = get("/?a=1&b=2");
    let one = ParamsCondition::parse(&["a"]).unwrap();
    let two = ParamsCondition::parse(&["a", "b"]).unwrap();
    let valued = ParamsCondition::parse(&["a=1"]).unwrap();
    assert_eq!(two.compare_to(&one, &request), Ordering::Less);
    assert_eq!(valued.compare_to(&one, &request), Ordering::Less);
    assert_eq!(one.compare_to(&one, &request), Ordering::Equal);
}

#[test]
fn test_headers_case_insensitive_and_media_headers_dropped() {
    let condition = HeadersCondition::parse(&["X-Api-Version=2", "Accept=text/plain"]).unwrap();
    assert_eq!(condition.len(), 1);
    let request = HttpRequest::builder(Method::GET, "/")
        .header("x-api-version", "2")
        .build();
    assert!(condition.matching_condition(&request).is_some());
    assert!(condition.matching_condition(&get("/")).is_none());
}

#[test]
fn test_headers_combine_is_associative_union() {
    let a = HeadersCondition::parse(&["X-A"]).unwrap();
    let b = HeadersCondition::parse(&["x-b=1"]).unwrap();
    let c = HeadersCondition::parse(&["!X-C", "X-A"]).unwrap();
    assert_eq!(a.combine(&b).combine(&c), a.combine(&b.combine(&c)));
}

#[test]
fn test_consumes_matching() {
    let condition = consumes(&["application/json", "text/*"]);
    let json = HttpRequest::builder(Method::POST, "/")
        .header("Content-Type", "application/json;charset=UTF-8")
        .body("{}")
        .build();
    let narrowed = condition.matching_condition(&json).unwrap();
    assert_eq!(narrowed.consumable_media_types(), vec![MediaType::application_json()]);

    let xml = HttpRequest::builder(Method::POST, "/")
        .header("Content-Type", "application/xml")
        .body("<a/>")
        .build();
    assert!(condition.matching_condition(&xml).is_none());

    let garbage = HttpRequest::builder(Method::POST, "/")
        .header("Content-Type", "garbage")
        .body("x")
        .build();
    assert!(condition.matching_condition(&garbage).is_none());
}

#[test]
fn test_consumes_missing_content_type_is_octet_stream() {
    let request = HttpRequest::builder(Method::POST, "/").body("raw").build();
    assert!(consumes(&["application/octet-stream"])
        .matching_condition(&request)
        .is_some());
    assert!(consumes(&["application/json"])
        .matching_condition(&request)
        .is_none());
}

#[test]
fn test_consumes_negated_expression() {
    let condition = consumes(&["!application/xml"]);
    let json = HttpRequest::builder(Method::POST, "/")
        .header("Content-Type", "application/json")
        .body("{}")
        .build();
    assert!(condition.matching_condition(&json).is_some());
}

#[test]
fn test_consumes_optional_body() {
    let condition = consumes(&["application/json"]).with_body_required(false);
    let request = HttpRequest::builder(Method::POST, "/").build();
    let narrowed = condition.matching_condition(&request).unwrap();
    assert!(narrowed.is_empty());
    assert!(consumes(&["application/json"])
        .matching_condition(&request)
        .is_none());
}

#[test]
fn test_consumes_and_produces_override_on_combine() {
    let type_level = consumes(&["application/json", "application/xml"]);
    let method_level = consumes(&["text/plain"]);
    assert_eq!(type_level.combine(&method_level), method_level);
    assert_eq!(type_level.combine(&ConsumesCondition::default()), type_level);

    let type_level = produces(&["application/json"]);
    let method_level = produces(&["application/xml", "text/plain"]);
    assert_eq!(type_level.combine(&method_level), method_level);
    assert_eq!(
        type_level.combine(&ProducesCondition::default()),
        type_level
    );
}

#[test]
fn test_consumes_compare() {
    let request = get("/");
    let specific = consumes(&["text/plain"]);
    let wildcard = consumes(&["text/*"]);
    assert_eq!(specific.compare_to(&wildcard, &request), Ordering::Less);
    assert_eq!(
        ConsumesCondition::default().compare_to(&wildcard, &request),
        Ordering::Greater
    );
}

#[test]
fn test_produces_matching() {
    let condition = produces(&["application/json", "application/xml"]);
    let request = HttpRequest::builder(Method::GET, "/")
        .header("Accept", "application/xml")
        .build();
    let narrowed = condition.matching_condition(&request).unwrap();
    assert_eq!(narrowed.producible_media_types(), vec![MediaType::application_xml()]);

    let request = HttpRequest::builder(Method::GET, "/")
        .header("Accept", "text/html")
        .build();
    assert!(condition.matching_condition(&request).is_none());

    let request = HttpRequest::builder(Method::GET, "/")
        .header("Accept", "bogus")
        .build();
    assert!(condition.matching_condition(&request).is_none());
}

#[test]
fn test_produces_negated_falls_back_to_wildcard() {
    let condition = produces(&["!application/json"]);
    let request = HttpRequest::builder(Method::GET, "/")
        .header("Accept", "application/json, */*;q=0.1")
        .build();
    let narrowed = condition.matching_condition(&request).unwrap();
    assert!(narrowed.is_empty());
}

#[test]
fn test_produces_compare_follows_accept_order() {
    let request = HttpRequest::builder(Method::GET, "/")
        .header("Accept", "application/xml, application/json;q=0.5")
        .build();
    let json = produces(&["application/json"]);
    let xml = produces(&["application/xml"]);
    assert_eq!(xml.compare_to(&json, &request), Ordering::Less);
    assert_eq!(json.compare_to(&xml, &request), Ordering::Greater);

    let any = ProducesCondition::default();
    let request = get("/");
    assert_eq!(json.compare_to(&any, &request), Ordering::Greater);
    assert_eq!(any.compare_to(&json, &request), Ordering::Less);
}

#[test]
fn test_produces_uses_configured_negotiator() {
    let negotiator = Arc::new(FixedContentNegotiator::new(vec![MediaType::application_xml()]));
    let condition = ProducesCondition::new(
        vec![MediaTypeExpression::parse("application/json").unwrap()],
        negotiator,
    );
    assert!(condition.matching_condition(&get("/")).is_none());
}

#[test]
fn test_path_parsed_matching_sorts_best_first() {
    let condition = PathCondition::parsed(&["/hotels/{hotel}", "/hotels/new", "/hotels/**"], false).unwrap();
    let narrowed = condition.matching_condition("/hotels/new").unwrap();
    assert_eq!(narrowed.patterns(), vec!["/hotels/new", "/hotels/{hotel}", "/hotels/**"]);
    assert!(condition.matching_condition("/motels/1").is_none());
}

#[test]
fn test_path_template_matching() {
    let matcher = Arc::new(TemplatePathMatcher::new());
    let condition = PathCondition::template(&["/a/**/z", "/a/{b}/z"], matcher, false).unwrap();
    let narrowed = condition.matching_condition("/a/b/z").unwrap();
    assert_eq!(narrowed.patterns(), vec!["/a/{b}/z", "/a/**/z"]);
}

#[test]
fn test_path_empty_matches_root() {
    let condition = PathCondition::parsed::<&str>(&[], false).unwrap();
    assert!(condition.matching_condition("").is_some());
    assert!(condition.matching_condition("/").is_some());
    assert!(condition.matching_condition("/x").is_none());
    assert_eq!(condition.direct_paths(), vec!["".to_string(), "/".to_string()]);
}

#[test]
fn test_path_trailing_slash() {
    let strict = PathCondition::parsed(&["/items/{id}"], false).unwrap();
    assert!(strict.matching_condition("/items/1/").is_none());
    let lenient = PathCondition::parsed(&["/items/{id}"], true).unwrap();
    assert!(lenient.matching_condition("/items/1/").is_some());
    let extracted = lenient.extract("/items/{id}", "/items/1/").unwrap();
    assert_eq!(extracted.variables[0].1, "1");
}

#[test]
fn test_path_combine_cartesian() {
    let type_level = PathCondition::parsed(&["/a", "/b"], false).unwrap();
    let method_level = PathCondition::parsed(&["/x", "/y"], false).unwrap();
    let combined = type_level.combine(&method_level).unwrap();
    assert_eq!(combined.patterns(), vec!["/a/x", "/a/y", "/b/x", "/b/y"]);

    let empty = PathCondition::parsed::<&str>(&[], false).unwrap();
    assert_eq!(empty.combine(&method_level).unwrap(), method_level);
    assert_eq!(type_level.combine(&empty).unwrap(), type_level);
}

#[test]
fn test_path_combine_across_strategies_fails() {
    let parsed = PathCondition::parsed(&["/a"], false).unwrap();
    let template = PathCondition::template(&["/b"], Arc::new(TemplatePathMatcher::new()), false).unwrap();
    assert!(parsed.combine(&template).is_err());
}

#[test]
fn test_path_compare_prefers_more_patterns_on_tie() {
    let one = PathCondition::parsed(&["/a/{x}"], false).unwrap();
    let two = PathCondition::parsed(&["/a/{x}", "/a/{y}"], false).unwrap();
    let one = one.matching_condition("/a/1").unwrap();
    let two = two.matching_condition("/a/1").unwrap();
    assert_eq!(two.compare_to(&one, "/a/1"), Ordering::Less);
}

#[test]
fn test_path_direct_paths() {
    let condition = PathCondition::parsed(&["/items", "/items/{id}"], false).unwrap();
    assert_eq!(condition.direct_paths(), vec!["/items".to_string()]);
}

#[derive(Debug)]
struct TenantCondition(&'static str);

impl std::fmt::Display for TenantCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tenant={}", self.0)
    }
}

impl CustomCondition for TenantCondition {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn combine(&self, other: &dyn CustomCondition) -> Arc<dyn CustomCondition> {
        match other.as_any().downcast_ref::<TenantCondition>() {
            Some(other) => Arc::new(TenantCondition(other.0)),
            None => Arc::new(TenantCondition(self.0)),
        }
    }

    fn matching_condition(&self, request: &HttpRequest) -> Option<Arc<dyn CustomCondition>> {
        (request.header("x-tenant") == Some(self.0)).then(|| Arc::new(TenantCondition(self.0)) as Arc<dyn CustomCondition>)
    }

    fn compare_to(&self, _other: &dyn CustomCondition, _request: &HttpRequest) -> Ordering {
        Ordering::Equal
    }
}

#[test]
fn test_custom_condition_holder() {
    let holder = CustomConditionHolder::new(Arc::new(TenantCondition("acme")));
    let request = HttpRequest::builder(Method::GET, "/")
        .header("X-Tenant", "acme")
        .build();
    assert!(holder.matching_condition(&request).is_some());
    assert!(holder.matching_condition(&get("/")).is_none());
    assert_eq!(
        holder.compare_to(&CustomConditionHolder::default(), &request),
        Ordering::Less
    );
    assert_eq!(holder.to_string(), "tenant=acme");
    assert_eq!(
        holder.combine(&CustomConditionHolder::new(Arc::new(TenantCondition("other")))).to_string(),
        "tenant=other"
    );
}

#[test]
fn test_matching_is_idempotent() {
    let condition = ParamsCondition::parse(&["a"]).unwrap();
    let request = get("/?a=1");
    assert_eq!(
        condition.matching_condition(&request),
        condition.matching_condition(&request)
    );
    let produces = produces(&["application/json", "text/plain"]);
    let request = HttpRequest::builder(Method::GET, "/")
        .header("Accept", "text/plain")
        .build();
    assert_eq!(
        produces.matching_condition(&request),
        produces.matching_condition(&request)
    );
}
