use tracing::span::Entered;
use tracing::Span;

/// Per-component logging handle.
///
/// Built once in `main` and handed to each client at construction time, so
/// every event a component emits carries its `component` field without any
/// global logger state. Cloning is cheap; clones share the same span.
#[derive(Debug, Clone)]
pub struct Logger {
    span: Span,
}

impl Logger {
    /// Root handle for a process or script run.
    pub fn root(app: &'static str) -> Self {
        Self {
            span: tracing::info_span!("app", name = app),
        }
    }

    /// A handle with no component span. Events still reach the subscriber,
    /// just without a `component` field.
    pub fn disabled() -> Self {
        Self { span: Span::none() }
    }

    /// Child handle tagged with a component name, e.g. `vcenter` or `evs`.
    pub fn component(&self, name: &'static str) -> Self {
        Self {
            span: tracing::info_span!(parent: &self.span, "component", component = name),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Enter the component span for the lifetime of the returned guard.
    pub fn enter(&self) -> Entered<'_> {
        self.span.enter()
    }

    pub fn in_scope<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.span.in_scope(f)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::disabled()
    }
}
