//! Included fragments: views rendered once, cached by path, and served by includes.
//!
//! A page that wants a piece of per-request content (one random quote out of a few,
//! say) renders an include directive pointing at a fragment URL instead of the content
//! itself. Everything the fragment depends on must be in that URL: included fragments
//! never see the including page's language negotiation, cookies, or sessions.
//!
//! # Declarations
//!
//! A fragment may use SSI variables, but the values are set by the *including* page.
//! So every variable a fragment uses must be declared by a function of the fragment's
//! URL arguments ([`IncludedFragment::declares`]). The including page calls the same
//! function (through [`Router::include`]) with its own arguments, which may be
//! variables, and registers the result with its request context.
//!
//! [`ssi_expect`](crate::variables::ssi_expect) makes one declaration function serve
//! both sides: fed the fragment's string arguments it builds concrete variables, and
//! fed the including page's variables it builds expectations of them, which resolve to
//! the same identifiers.
//!
//! Rendering checks the declarations: a used variable that was not declared is an
//! error; a declared variable that was not used is logged as a warning.

mod router;

pub use router::Router;

use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::CacheSet;
use crate::core::{RequestContext, SsifyError};
use crate::variables::{Arg, Variable};

/// Renders a fragment from its URL arguments.
pub type ViewFn =
    dyn Fn(&mut RequestContext, &BTreeMap<String, String>) -> Result<String> + Send + Sync;

/// Lists the variables a fragment uses, given its URL arguments.
pub type DeclareFn = dyn Fn(&BTreeMap<String, Arg>) -> Result<Vec<Variable>> + Send + Sync;

/// URL argument carrying the fragment's language.
pub const LANG_ARG: &str = "lang";

/// A view whose output is included with SSI.
#[derive(Clone)]
pub struct IncludedFragment {
    view: Arc<ViewFn>,
    declares: Option<Arc<DeclareFn>>,
    use_lang: bool,
    timeout: Option<Duration>,
}

impl IncludedFragment {
    /// Wrap a view. Language binding is on; the cache's default timeout applies.
    pub fn new<F>(view: F) -> Self
    where
        F: Fn(&mut RequestContext, &BTreeMap<String, String>) -> Result<String>
            + Send
            + Sync
            + 'static,
    {
        Self {
            view: Arc::new(view),
            declares: None,
            use_lang: true,
            timeout: None,
        }
    }

    /// Whether the route must carry a `lang` argument selecting the language.
    #[must_use]
    pub const fn use_lang(mut self, use_lang: bool) -> Self {
        self.use_lang = use_lang;
        self
    }

    /// How long the rendered output stays cached.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Declare the variables the fragment uses.
    #[must_use]
    pub fn declares<F>(mut self, declares: F) -> Self
    where
        F: Fn(&BTreeMap<String, Arg>) -> Result<Vec<Variable>> + Send + Sync + 'static,
    {
        self.declares = Some(Arc::new(declares));
        self
    }

    /// Whether the fragment is bound to a language argument.
    pub const fn uses_lang(&self) -> bool {
        self.use_lang
    }

    /// Variables the fragment declares for these arguments (without `lang`).
    pub fn declared_vars(&self, kwargs: &BTreeMap<String, Arg>) -> Result<Vec<Variable>> {
        match &self.declares {
            Some(declares) => declares(kwargs),
            None => Ok(Vec::new()),
        }
    }

    /// Render the fragment at `ctx.path` and store the output in `caches`.
    ///
    /// # Errors
    ///
    /// - [`SsifyError::NoLangField`] when language binding is on and `kwargs` has no `lang`
    /// - [`SsifyError::IncludeNotFound`] when `lang` is not one of `languages`
    /// - [`SsifyError::UndeclaredVariables`] when the view used undeclared variables
    pub fn render(
        &self,
        ctx: &mut RequestContext,
        mut kwargs: BTreeMap<String, String>,
        languages: &[String],
        caches: &CacheSet,
    ) -> Result<String> {
        let previous_language = if self.use_lang {
            let lang = kwargs.remove(LANG_ARG).ok_or_else(|| SsifyError::NoLangField {
                path: ctx.path.clone(),
            })?;
            if !languages.contains(&lang) {
                return Err(SsifyError::IncludeNotFound {
                    path: ctx.full_path(),
                }
                .into());
            }
            Some(ctx.language.replace(lang))
        } else {
            None
        };

        ctx.vars_needed.clear();
        let rendered = (self.view)(ctx, &kwargs);
        if let Some(language) = previous_language {
            ctx.language = language;
        }
        let output = rendered?;

        self.check_declarations(ctx, &kwargs)?;
        ctx.vars_needed.clear();

        debug!("Caching included fragment {}", ctx.path);
        caches.set(&ctx.path, &output, self.timeout);
        Ok(output)
    }

    fn check_declarations(
        &self,
        ctx: &mut RequestContext,
        kwargs: &BTreeMap<String, String>,
    ) -> Result<()> {
        let args = kwargs
            .iter()
            .map(|(name, value)| (name.clone(), Arg::from(value.as_str())))
            .collect::<BTreeMap<_, _>>();

        for declared in self.declared_vars(&args)? {
            if ctx.vars_needed.remove(declared.identifier()).is_none() {
                warn!(
                    "The fragment at '{}' declares SSI variable {} but does not use it",
                    ctx.path,
                    declared.describe()
                );
            }
        }

        if ctx.vars_needed.is_empty() {
            Ok(())
        } else {
            Err(SsifyError::UndeclaredVariables {
                path: ctx.path.clone(),
                variables: ctx.vars_needed.iter().map(Variable::describe).collect(),
            }
            .into())
        }
    }
}

impl fmt::Debug for IncludedFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludedFragment")
            .field("use_lang", &self.use_lang)
            .field("timeout", &self.timeout)
            .field("declares", &self.declares.is_some())
            .finish_non_exhaustive()
    }
}
