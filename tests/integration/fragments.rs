//! Included fragments served through the router.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use ssify::cache::{CacheSet, FragmentCache, MemoryCache};
use ssify::config::SsifyConfig;
use ssify::core::{RequestContext, SsifyError};
use ssify::fragments::{IncludedFragment, Router};
use ssify::interpreter::{FragmentDispatcher, Interpreter};
use ssify::test_utils::fixtures::{QUOTES, count, pick, quotes_router, quotes_router_with_caches};
use ssify::variables::{Arg, ExpectType, ssi_expect};

fn args(pairs: &[(&str, Arg)]) -> BTreeMap<String, Arg> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn test_include_literal_quote_per_language() {
    let router = quotes_router();
    for lang in ["en", "pl"] {
        let mut ctx = RequestContext::new("/").with_language(lang);
        let statement = router
            .include(&mut ctx, "quote", args(&[("number", Arg::from(2i64))]))
            .unwrap();
        assert_eq!(statement, format!("<!--#include file='/{lang}/quote/2/'-->"));

        let mut fragment_ctx = RequestContext::new(format!("/{lang}/quote/2/"));
        let html = router.dispatch(&mut fragment_ctx).unwrap();
        assert_eq!(html, format!("<blockquote lang='{lang}'>{}</blockquote>", QUOTES[2]));
    }
}

#[test]
fn test_unsupported_language_is_not_found() {
    let mut ctx = RequestContext::new("/de/quote/0/");
    let err = quotes_router().dispatch(&mut ctx).unwrap_err();
    assert!(matches!(err.downcast_ref::<SsifyError>(), Some(SsifyError::IncludeNotFound { .. })));
}

#[test]
fn test_declared_expectation_matches_fragment_variable() {
    let router = quotes_router();
    let mut page = RequestContext::new("/").with_language("en");
    router.include(&mut page, "random_quote", args(&[("limit", Arg::from(count()))])).unwrap();

    let declared = pick(ssi_expect(count(), ExpectType::Int).unwrap());
    assert!(page.vars_needed.contains(declared.identifier()));
    assert!(!declared.is_concrete());

    // The fragment, rendered for the substituted path, uses the concrete form.
    let mut fragment = RequestContext::new("/en/random-quote/4/");
    let html = router.dispatch(&mut fragment).unwrap();
    assert_eq!(html, format!("<p>Quote {} of 4</p>", pick(4i64)));
}

#[test]
fn test_rendered_fragment_is_written_to_every_store() {
    let first = Arc::new(MemoryCache::new());
    let second = Arc::new(MemoryCache::new());
    let caches = CacheSet::new()
        .with_store("ssify", first.clone())
        .with_store("local", second.clone());
    let router = quotes_router_with_caches(caches);

    let mut ctx = RequestContext::new("/pl/quote/0/");
    let html = router.dispatch(&mut ctx).unwrap();
    assert_eq!(first.get("/pl/quote/0/"), Some(html.clone()));
    assert_eq!(second.get("/pl/quote/0/"), Some(html));

    router.caches().flush(Some(&["/pl/quote/0/".to_string()]));
    assert!(first.is_empty() && second.is_empty());
}

#[test]
fn test_undeclared_fragment_variable_fails() {
    let router = Router::new(vec!["en".to_string()]).route(
        "sneaky",
        "/sneaky/",
        IncludedFragment::new(|ctx, _| Ok(ctx.need(count()).to_string())).use_lang(false),
    );
    let interpreter = Interpreter::new(Arc::new(router));

    let err = interpreter
        .process("<!--#include virtual='/sneaky/'-->", &RequestContext::new("/"))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SsifyError>(),
        Some(SsifyError::UndeclaredVariables { path, .. }) if path == "/sneaky/"
    ));
}

#[test]
fn test_router_and_caches_from_config() {
    let config =
        SsifyConfig::from_toml("languages = [\"pl\"]\ncache_aliases = [\"local\"]\n").unwrap();
    let ssify_store = Arc::new(MemoryCache::new());
    let local_store = Arc::new(MemoryCache::new());
    let mut available: HashMap<String, Arc<dyn FragmentCache>> = HashMap::new();
    available.insert("ssify".to_string(), ssify_store.clone());
    available.insert("local".to_string(), local_store.clone());

    let caches = CacheSet::from_config(&available, &config).unwrap();
    assert_eq!(caches.aliases(), vec!["local"]);

    let router = Router::from_config(&config, caches)
        .route("hello", "/{lang}/hello/", IncludedFragment::new(|_, _| Ok("cześć".to_string())));
    router.dispatch(&mut RequestContext::new("/pl/hello/")).unwrap();
    assert!(router.dispatch(&mut RequestContext::new("/en/hello/")).is_err());

    assert_eq!(local_store.get("/pl/hello/").as_deref(), Some("cześć"));
    assert!(ssify_store.is_empty());

    let missing = SsifyConfig::from_toml("cache_aliases = [\"redis\"]\n").unwrap();
    let err = CacheSet::from_config(&available, &missing).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SsifyError>(),
        Some(SsifyError::UnknownCacheAlias { alias }) if alias == "redis"
    ));
}
