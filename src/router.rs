//! Radix-tree request router.
//!
//! One radix tree keyed by path. Every path owns an *endpoint*, resolved once
//! per matched request into the handler for the request's verb plus the
//! handler identities whose annotations govern logging:
//!
//! | Endpoint | Registered with | Verb lookup | Annotation candidates |
//! |---|---|---|---|
//! | function | [`Router::on`] | verb → function | the function |
//! | view | [`Router::view`] | verb → method | method, then view |
//! | view set | [`Router::viewset`] | verb → action → handler | action, then view set |

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{Annotation, AnnotationRegistry, HandlerId};

struct Registered {
    id: HandlerId,
    handler: BoxedHandler,
}

enum Endpoint {
    /// Registration order; a verb without a handler falls back to every
    /// handler on the path for its annotations.
    Function(Vec<(Method, Registered)>),
    View {
        class: HandlerId,
        methods: HashMap<Method, Registered>,
    },
    ViewSet {
        class: HandlerId,
        routes: HashMap<Method, String>,
        actions: HashMap<String, Registered>,
    },
}

impl Endpoint {
    fn extract(&self, method: &Method) -> (Option<BoxedHandler>, Vec<HandlerId>) {
        let (registered, class) = match self {
            Self::Function(handlers) => {
                let registered = handlers.iter().find(|(m, _)| m == method).map(|(_, r)| r);
                if registered.is_none() {
                    return (None, handlers.iter().map(|(_, r)| r.id).collect());
                }
                (registered, None)
            }
            Self::View { class, methods } => (methods.get(method), Some(*class)),
            Self::ViewSet { class, routes, actions } => {
                (routes.get(method).and_then(|action| actions.get(action)), Some(*class))
            }
        };

        let handler = registered.map(|r| Arc::clone(&r.handler));
        let candidates = registered.map(|r| r.id).into_iter().chain(class).collect();
        (handler, candidates)
    }
}

/// What [`Router::resolve`] found for a request.
pub(crate) struct RouteMatch {
    /// `None` when the path matched but the verb has no handler.
    pub(crate) handler: Option<BoxedHandler>,
    pub(crate) params: HashMap<String, String>,
    /// Handler identities to consult for annotations, most specific first.
    pub(crate) candidates: Vec<HandlerId>,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Registration methods return `self` so calls chain naturally.
///
/// # Panics
///
/// Registration panics on an invalid path pattern, on binding two endpoint
/// kinds to one path, and on conflicting logging annotations. All of these
/// are startup-time programming errors.
pub struct Router {
    tree: MatchitRouter<usize>,
    paths: HashMap<String, usize>,
    endpoints: Vec<Endpoint>,
    annotations: AnnotationRegistry,
}

impl Router {
    pub fn new() -> Self {
        Self {
            tree: MatchitRouter::new(),
            paths: HashMap::new(),
            endpoints: Vec::new(),
            annotations: AnnotationRegistry::new(),
        }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use reqlog::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    pub fn on<H: Handler>(mut self, method: Method, path: &str, handler: H) -> Self {
        let id = self.annotations.register(type_name::<H>());
        let registered = Registered { id, handler: handler.into_boxed_handler() };
        match self.endpoint_mut(path, || Endpoint::Function(Vec::new())) {
            Endpoint::Function(handlers) => match handlers.iter_mut().find(|(m, _)| *m == method) {
                Some((_, slot)) => *slot = registered,
                None => handlers.push((method, registered)),
            },
            _ => panic!("route `{path}` is already bound to a view"),
        }
        self
    }

    /// [`on`](Router::on) plus an [`Annotation`] for that handler.
    pub fn on_annotated<H: Handler>(
        self,
        method: Method,
        path: &str,
        handler: H,
        annotation: Annotation,
    ) -> Self {
        let method_for_annotation = method.clone();
        self.on(method, path, handler).annotate(method_for_annotation, path, annotation)
    }

    /// Attach one more annotation to the function handler behind
    /// `method` + `path`.
    pub fn annotate(mut self, method: Method, path: &str, annotation: Annotation) -> Self {
        if let Err(e) = self.try_annotate(method, path, annotation) {
            panic!("{e}");
        }
        self
    }

    /// Non-panicking [`annotate`](Router::annotate).
    pub fn try_annotate(&mut self, method: Method, path: &str, annotation: Annotation) -> Result<(), Error> {
        let id = self.paths.get(path)
            .and_then(|&index| match &self.endpoints[index] {
                Endpoint::Function(handlers) => {
                    handlers.iter().find(|(m, _)| *m == method).map(|(_, r)| r.id)
                }
                _ => None,
            })
            .ok_or_else(|| Error::Route(format!("no function handler registered for {method} `{path}`")))?;
        self.annotations.annotate(id, annotation)?;
        Ok(())
    }

    /// Register a class-style view: one handler per verb, optionally
    /// annotated per method and as a whole.
    pub fn view(mut self, path: &str, view: View) -> Self {
        let class = self.annotations.register(view.name.clone());
        let mut methods = HashMap::new();
        for (method, name, handler) in view.methods {
            let id = self.annotations.register(format!("{}.{name}", view.name));
            methods.insert(method, Registered { id, handler });
        }

        self.apply(class, view.annotations);
        for (method, annotation) in view.method_annotations {
            let id = methods.get(&method)
                .map(|r| r.id)
                .unwrap_or_else(|| panic!("view `{}` has no {method} handler to annotate", view.name));
            self.apply(id, [annotation]);
        }

        self.bind_unique(path, Endpoint::View { class, methods });
        self
    }

    /// Register a view set: named actions plus a verb → action table.
    pub fn viewset(mut self, path: &str, set: ViewSet) -> Self {
        let class = self.annotations.register(set.name.clone());
        let mut actions = HashMap::new();
        for (action, handler) in set.actions {
            let id = self.annotations.register(format!("{}.{action}", set.name));
            actions.insert(action, Registered { id, handler });
        }

        self.apply(class, set.annotations);
        for (action, annotation) in set.action_annotations {
            let id = actions.get(&action)
                .map(|r| r.id)
                .unwrap_or_else(|| panic!("view set `{}` has no action `{action}`", set.name));
            self.apply(id, [annotation]);
        }
        for (method, action) in &set.routes {
            assert!(
                actions.contains_key(action),
                "view set `{}` routes {method} to unknown action `{action}`",
                set.name,
            );
        }

        self.bind_unique(path, Endpoint::ViewSet { class, routes: set.routes, actions });
        self
    }

    pub fn annotations(&self) -> &AnnotationRegistry {
        &self.annotations
    }

    /// Resolves a request path to its endpoint. `None` means no route
    /// matched, which is not an error.
    pub(crate) fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let matched = self.tree.at(path).ok()?;
        let (handler, candidates) = self.endpoints[*matched.value].extract(method);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some(RouteMatch { handler, params, candidates })
    }

    fn apply(&mut self, id: HandlerId, annotations: impl IntoIterator<Item = Annotation>) {
        for annotation in annotations {
            if let Err(e) = self.annotations.annotate(id, annotation) {
                panic!("{e}");
            }
        }
    }

    fn endpoint_mut(&mut self, path: &str, make: impl FnOnce() -> Endpoint) -> &mut Endpoint {
        let index = match self.paths.get(path) {
            Some(&index) => index,
            None => self.insert(path, make()),
        };
        &mut self.endpoints[index]
    }

    fn bind_unique(&mut self, path: &str, endpoint: Endpoint) {
        assert!(!self.paths.contains_key(path), "route `{path}` is already bound");
        self.insert(path, endpoint);
    }

    fn insert(&mut self, path: &str, endpoint: Endpoint) -> usize {
        let index = self.endpoints.len();
        self.tree
            .insert(path, index)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self.endpoints.push(endpoint);
        self.paths.insert(path.to_owned(), index);
        index
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// A class-style view: one handler per HTTP verb.
///
/// ```rust
/// # use reqlog::{Annotation, Request, Response, View};
/// # use http::Method;
/// # async fn show(_: Request) -> Response { Response::text("") }
/// # async fn update(_: Request) -> Response { Response::text("") }
/// let accounts = View::new("AccountView")
///     .method(Method::GET, "get", show)
///     .method(Method::PUT, "put", update)
///     .annotate_method(Method::PUT, Annotation::no_logging_because("account data"));
/// ```
pub struct View {
    name: String,
    methods: Vec<(Method, String, BoxedHandler)>,
    annotations: Vec<Annotation>,
    method_annotations: Vec<(Method, Annotation)>,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            annotations: Vec::new(),
            method_annotations: Vec::new(),
        }
    }

    /// `name` is the method's name within the view, used in diagnostics.
    pub fn method(mut self, method: Method, name: &str, handler: impl Handler) -> Self {
        self.methods.push((method, name.to_owned(), handler.into_boxed_handler()));
        self
    }

    /// Annotate the view as a whole. Methods with their own annotation
    /// ignore this one.
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn annotate_method(mut self, method: Method, annotation: Annotation) -> Self {
        self.method_annotations.push((method, annotation));
        self
    }
}

/// A view set: named actions reached through a verb → action table.
///
/// ```rust
/// # use reqlog::{Annotation, Request, Response, ViewSet};
/// # use http::Method;
/// # async fn list(_: Request) -> Response { Response::text("") }
/// # async fn create(_: Request) -> Response { Response::text("") }
/// let widgets = ViewSet::new("WidgetViewSet")
///     .action("list", list)
///     .action("create", create)
///     .route(Method::GET, "list")
///     .route(Method::POST, "create")
///     .annotate_action("list", Annotation::log().no_response_because("large listing"));
/// ```
pub struct ViewSet {
    name: String,
    actions: Vec<(String, BoxedHandler)>,
    routes: HashMap<Method, String>,
    annotations: Vec<Annotation>,
    action_annotations: Vec<(String, Annotation)>,
}

impl ViewSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            routes: HashMap::new(),
            annotations: Vec::new(),
            action_annotations: Vec::new(),
        }
    }

    pub fn action(mut self, name: &str, handler: impl Handler) -> Self {
        self.actions.push((name.to_owned(), handler.into_boxed_handler()));
        self
    }

    /// Dispatch `method` to the action called `action`.
    pub fn route(mut self, method: Method, action: &str) -> Self {
        self.routes.insert(method, action.to_owned());
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn annotate_action(mut self, action: &str, annotation: Annotation) -> Self {
        self.action_annotations.push((action.to_owned(), annotation));
        self
    }
}
