//! A quotes site wired through ssify.
//!
//! The page shows how many quotes there are and includes one of them, picked per
//! request. The pick depends on the count, so it is declared with an expectation and
//! resolved in a second round.
//!
//! The pick is deterministic: `seed % limit`, with `seed` read from the request
//! metadata (default `0`).

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::cache::CacheSet;
use crate::computation::Registry;
use crate::core::RequestContext;
use crate::fragments::{IncludedFragment, Router};
use crate::variables::{Arg, ExpectType, Variable, ssi_expect};

pub const QUOTES: &[&str] = &[
    "Simplicity is prerequisite for reliability.",
    "Premature optimization is the root of all evil.",
    "Talk is cheap. Show me the code.",
    "There are only two hard things in computer science.",
];

pub const COUNT: &str = "quotes.count";
pub const PICK: &str = "quotes.pick";
pub const CSRF_TOKEN: &str = "quotes.csrf_token";

/// Metadata key the pick is seeded from.
pub const SEED_META: &str = "seed";

/// Metadata key holding the CSRF token.
pub const CSRF_META: &str = "csrf";

/// The number of quotes.
pub fn count() -> Variable {
    Variable::new(COUNT)
}

/// A quote number below `limit`.
pub fn pick(limit: impl Into<Arg>) -> Variable {
    Variable::new(PICK).kwarg("limit", limit)
}

/// The request's CSRF token.
pub fn csrf_token() -> Variable {
    Variable::new(CSRF_TOKEN)
}

/// Computations behind [`count`], [`pick`] and [`csrf_token`].
pub fn quotes_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(COUNT, |_, _, _| Ok(json!(QUOTES.len())))
        .register(PICK, |ctx, _, kwargs| {
            let limit = kwargs
                .get("limit")
                .and_then(Value::as_u64)
                .filter(|limit| *limit > 0)
                .ok_or_else(|| anyhow!("{PICK} needs a positive integer limit"))?;
            let seed = match ctx.meta.get(SEED_META) {
                Some(seed) => seed.parse::<u64>()?,
                None => 0,
            };
            Ok(json!(seed % limit))
        })
        .register(CSRF_TOKEN, |ctx, _, _| {
            Ok(json!(ctx.meta.get(CSRF_META).cloned().unwrap_or_default()))
        });
    registry
}

/// Routes for the quotes site, writing rendered fragments to `caches`.
///
/// - `quote`: `/{lang}/quote/{number}/`, one quote
/// - `random_quote`: `/{lang}/random-quote/{limit}/`, echoes a [`pick`] below `limit`
/// - `csrf_form`: `/form/`, a form echoing [`csrf_token`], without a language
pub fn quotes_router_with_caches(caches: CacheSet) -> Router {
    let quote = IncludedFragment::new(|ctx, kwargs| {
        let text = kwargs["number"]
            .parse::<usize>()
            .ok()
            .and_then(|number| QUOTES.get(number))
            .ok_or_else(|| anyhow!("No quote number {}", kwargs["number"]))?;
        let lang = ctx.language.clone().unwrap_or_default();
        Ok(format!("<blockquote lang='{lang}'>{text}</blockquote>"))
    });

    let random_quote = IncludedFragment::new(|ctx, kwargs| {
        let limit = ssi_expect(kwargs["limit"].as_str(), ExpectType::Int)?;
        let picked = ctx.need(pick(limit));
        Ok(format!("<p>Quote {picked} of {}</p>", kwargs["limit"]))
    })
    .declares(|kwargs: &BTreeMap<String, Arg>| {
        let limit = kwargs.get("limit").cloned().ok_or_else(|| anyhow!("limit is required"))?;
        Ok(vec![pick(ssi_expect(limit, ExpectType::Int)?)])
    });

    let csrf_form = IncludedFragment::new(|ctx, _| {
        let token = ctx.need(csrf_token());
        Ok(format!("<form><input name='csrf' value='{token}'></form>"))
    })
    .use_lang(false)
    .declares(|_| Ok(vec![csrf_token()]));

    Router::new(vec!["en".to_string(), "pl".to_string()])
        .with_caches(caches)
        .route("quote", "/{lang}/quote/{number}/", quote)
        .route("random_quote", "/{lang}/random-quote/{limit}/", random_quote)
        .route("csrf_form", "/form/", csrf_form)
}

/// [`quotes_router_with_caches`] without caches.
pub fn quotes_router() -> Router {
    quotes_router_with_caches(CacheSet::new())
}

/// Render the quotes page for `ctx`, registering the variables it needs.
pub fn quotes_page(router: &Router, ctx: &mut RequestContext) -> Result<String> {
    let count = ctx.need(count());
    let mut kwargs = BTreeMap::new();
    kwargs.insert("limit".to_string(), Arg::from(count.clone()));
    let random_quote = router.include(ctx, "random_quote", kwargs)?;
    Ok(format!("<h1>{count} quotes</h1>{random_quote}"))
}
