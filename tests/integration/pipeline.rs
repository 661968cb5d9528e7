//! The whole two-phase flow on the quotes fixture.

use anyhow::Result;
use std::sync::Arc;

use ssify::cache::{CacheSet, MemoryCache};
use ssify::config::SsifyConfig;
use ssify::core::{RequestContext, SsifyError};
use ssify::header::VARS_NEEDED_HEADER;
use ssify::pipeline::{Pipeline, Response};
use ssify::test_utils::fixtures::{
    CSRF_META, QUOTES, SEED_META, count, quotes_page, quotes_registry, quotes_router,
    quotes_router_with_caches,
};
use ssify::test_utils::init_test_logging;

fn rendering_config() -> SsifyConfig {
    SsifyConfig {
        render: true,
        ..SsifyConfig::default()
    }
}

fn request(seed: u64) -> RequestContext {
    RequestContext::new("/").with_language("en").with_meta(SEED_META, seed.to_string())
}

#[test]
fn test_fresh_request_renders_picked_quote() -> Result<()> {
    init_test_logging(None);
    let router = Arc::new(quotes_router());
    let registry = Arc::new(quotes_registry());
    let pipeline = Pipeline::from_config(registry, router.clone(), &rendering_config());

    let mut ctx = request(5);
    let body = quotes_page(&router, &mut ctx)?;
    let response = pipeline.process_response(&ctx, Response::new(body))?;

    assert_eq!(
        response.body,
        format!("<h1>{} quotes</h1><p>Quote 1 of {}</p>", QUOTES.len(), QUOTES.len())
    );
    Ok(())
}

#[test]
fn test_without_render_body_carries_directives() -> Result<()> {
    let router = Arc::new(quotes_router());
    let registry = Arc::new(quotes_registry());
    let pipeline = Pipeline::from_config(registry, router.clone(), &SsifyConfig::default());

    let mut ctx = request(0);
    let body = quotes_page(&router, &mut ctx)?;
    let response = pipeline.process_response(&ctx, Response::new(body.clone()))?;

    let id = count().identifier().to_string();
    assert!(response.body.contains(&format!("<!--#set var='{id}' value='4'-->")));
    assert!(response.body.ends_with(&body));
    assert!(body.contains(&format!("<!--#include file='/en/random-quote/${{{id}}}/'-->")));
    // The count plus the rehashed pick.
    assert_eq!(response.body.matches("<!--#set ").count(), 2);
    Ok(())
}

#[test]
fn test_cached_page_is_replayed_with_new_values() -> Result<()> {
    let router = Arc::new(quotes_router());
    let registry = Arc::new(quotes_registry());
    let pipeline = Pipeline::from_config(registry, router.clone(), &rendering_config());

    let mut ctx = request(1);
    let mut response = Response::new(quotes_page(&router, &mut ctx)?);
    pipeline.prepare_for_cache(&ctx, &mut response);
    let cached = response.clone();
    assert!(cached.header(VARS_NEEDED_HEADER).is_some());

    let first = pipeline.process_response(&ctx, response)?;
    assert!(first.body.ends_with("<p>Quote 1 of 4</p>"));
    assert!(first.header(VARS_NEEDED_HEADER).is_none());

    // A cache hit: the view does not run, so the context has no variables.
    let replay = request(6);
    let second = pipeline.process_response(&replay, cached)?;
    assert!(second.body.ends_with("<p>Quote 2 of 4</p>"));
    Ok(())
}

#[test]
fn test_fragment_cache_serves_second_include() -> Result<()> {
    let store = Arc::new(MemoryCache::new());
    let caches = CacheSet::new().with_store("ssify", store.clone());
    let router = Arc::new(quotes_router_with_caches(caches));
    let registry = Arc::new(quotes_registry());
    let pipeline = Pipeline::from_config(registry, router.clone(), &rendering_config());

    for (seed, expected) in [(2, "Quote 2 of 4"), (3, "Quote 3 of 4")] {
        let mut ctx = request(seed);
        let body = quotes_page(&router, &mut ctx)?;
        let response = pipeline.process_response(&ctx, Response::new(body))?;
        assert!(response.body.contains(expected), "{}", response.body);
    }
    assert_eq!(store.len(), 1);
    Ok(())
}

#[test]
fn test_csrf_form_without_language() -> Result<()> {
    let router = Arc::new(quotes_router());
    let registry = Arc::new(quotes_registry());
    let pipeline = Pipeline::from_config(registry, router.clone(), &rendering_config());

    let mut ctx = RequestContext::new("/contact/").with_meta(CSRF_META, "t0k3n");
    let body = router.include(&mut ctx, "csrf_form", Default::default())?;
    assert_eq!(body, "<!--#include file='/form/'-->");

    let response = pipeline.process_response(&ctx, Response::new(body))?;
    assert_eq!(response.body, "<form><input name='csrf' value='t0k3n'></form>");
    Ok(())
}

#[test]
fn test_verbose_rendering_keeps_directives() -> Result<()> {
    let router = Arc::new(quotes_router());
    let config = SsifyConfig {
        render: true,
        render_verbose: true,
        ..SsifyConfig::default()
    };
    let pipeline = Pipeline::from_config(Arc::new(quotes_registry()), router.clone(), &config);

    let mut ctx = request(0);
    let body = quotes_page(&router, &mut ctx)?;
    let response = pipeline.process_response(&ctx, Response::new(body))?;
    assert!(
        response.body.contains("<!--#end-include file='/en/random-quote/"),
        "{}",
        response.body
    );
    assert!(response.body.contains("Quote "));
    Ok(())
}

#[test]
fn test_invalid_cached_header_is_reported() {
    let pipeline = Pipeline::from_config(
        Arc::new(quotes_registry()),
        Arc::new(quotes_router()),
        &SsifyConfig::default(),
    );
    let mut response = Response::new("body");
    response.set_header(VARS_NEEDED_HEADER, "not json");

    let err = pipeline.process_response(&RequestContext::new("/"), response).unwrap_err();
    assert!(matches!(err.downcast_ref::<SsifyError>(), Some(SsifyError::InvalidHeader { .. })));
}
