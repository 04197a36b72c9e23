//! Behavioural tests for the multiplexer front: precedence, method
//! dispatch, redirects, parameter capture, middleware ordering, and the
//! not-found fallbacks.

use futures::executor::block_on;
use http::{header, Method, Request, Response, StatusCode};
use hyper::Body;
use segmux::{Handler, Middleware, Next, ServeMux};

/// A handler that responds with a fixed tag, so tests can tell which
/// handler ran.
fn tag(name: &'static str) -> impl Handler {
    move |_: Request<Body>| {
        futures::future::ok::<_, hyper::Error>(Response::new(Body::from(name)))
    }
}

/// A handler that responds with the value of one path parameter.
fn echo_param(name: &'static str) -> impl Handler {
    move |req: Request<Body>| {
        let value = segmux::path_param(&req, name);
        futures::future::ok::<_, hyper::Error>(Response::new(Body::from(value)))
    }
}

/// A middleware that wraps the downstream response body in `name(...)`.
fn wrap(name: &'static str) -> impl Middleware {
    move |req: Request<Body>, next: Next| async move {
        let res = next.run(req).await?;
        let body = hyper::body::to_bytes(res.into_body()).await?;
        Ok::<_, hyper::Error>(Response::new(Body::from(format!(
            "{}({})",
            name,
            String::from_utf8_lossy(&body)
        ))))
    }
}

fn request(mux: &ServeMux, method: Method, path: &str) -> Response<Body> {
    let req = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    block_on(mux.dispatch(req)).unwrap()
}

fn get(mux: &ServeMux, path: &str) -> Response<Body> {
    request(mux, Method::GET, path)
}

fn body_string(res: Response<Body>) -> String {
    let bytes = block_on(hyper::body::to_bytes(res.into_body())).unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn matched_pattern(mux: &ServeMux, method: Method, path: &str) -> String {
    let req = Request::builder()
        .method(method)
        .uri(path)
        .body(())
        .unwrap();
    let (_, pattern) = mux.handler_for(&req);
    pattern
}

#[test]
fn literal_beats_param() {
    let mut mux = ServeMux::new();
    mux.route("/users/:id/info").get(tag("wrong"));
    mux.route("/users/jim/info").get(tag("right"));
    mux.route("/users/:id/detail").get(tag("wrong"));

    assert_eq!(body_string(get(&mux, "/users/jim/info")), "right");
    assert_eq!(
        matched_pattern(&mux, Method::GET, "/users/jim/info"),
        "/users/jim/info"
    );
}

#[test]
fn literal_match_binds_no_params() {
    let mut mux = ServeMux::new();
    mux.route("/users/:id/info").get(tag("wrong"));
    mux.route("/users/jim/info").get(echo_param("id"));

    // the literal branch won, so :id must stay unbound
    assert_eq!(body_string(get(&mux, "/users/jim/info")), "");
}

#[test]
fn literal_beats_wildcard() {
    let mut mux = ServeMux::new();
    mux.route("/users/*").get(tag("wrong"));
    mux.route("/users/john").get(tag("right"));

    assert_eq!(body_string(get(&mux, "/users/john")), "right");
    assert_eq!(
        matched_pattern(&mux, Method::GET, "/users/john"),
        "/users/john"
    );
}

#[test]
fn param_beats_wildcard() {
    let mut mux = ServeMux::new();
    mux.route("/users/*").get(tag("wrong"));
    mux.route("/users/:id").get(echo_param("id"));

    assert_eq!(body_string(get(&mux, "/users/john")), "john");
    assert_eq!(
        matched_pattern(&mux, Method::GET, "/users/john"),
        "/users/:id"
    );
}

#[test]
fn trailing_slash_redirects() {
    let mux = ServeMux::new();

    let res = get(&mux, "/users/");
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(res.headers()[header::LOCATION], "/users");
}

#[test]
fn trailing_slash_redirect_keeps_query() {
    let mux = ServeMux::new();

    let res = get(&mux, "/users/?page=2");
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(res.headers()[header::LOCATION], "/users?page=2");
}

#[test]
fn root_is_never_redirected() {
    let mux = ServeMux::new();

    let res = get(&mux, "/");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[test]
fn sibling_routes_stay_distinct() {
    let mut mux = ServeMux::new();
    mux.route("/a").get(tag("right"));
    mux.route("/b").get(tag("wrong"));

    assert_eq!(body_string(get(&mux, "/a")), "right");
    assert_eq!(matched_pattern(&mux, Method::GET, "/a"), "/a");
}

#[test]
fn literal_selection_after_param() {
    let mut mux = ServeMux::new();
    mux.route("/base/:id/a").get(echo_param("id"));
    mux.route("/base/:id/b").get(tag("wrong"));

    assert_eq!(body_string(get(&mux, "/base/llama/a")), "llama");
    assert_eq!(
        matched_pattern(&mux, Method::GET, "/base/llama/a"),
        "/base/:id/a"
    );
}

#[test]
fn exact_method_wins() {
    let mut mux = ServeMux::new();
    mux.route("/a").post(tag("right"));
    mux.route("/a").get(tag("wrong"));

    assert_eq!(body_string(request(&mux, Method::POST, "/a")), "right");
}

#[test]
fn any_catches_unregistered_methods() {
    let mut mux = ServeMux::new();
    mux.route("/a").post(tag("wrong"));
    mux.route("/a").get(tag("wrong"));
    mux.route("/a").any(tag("right"));

    assert_eq!(body_string(request(&mux, Method::DELETE, "/a")), "right");
}

#[test]
fn head_falls_back_on_get() {
    let mut mux = ServeMux::new();
    mux.route("/a").post(tag("wrong"));
    mux.route("/a").get(tag("right"));

    assert_eq!(body_string(request(&mux, Method::HEAD, "/a")), "right");
    assert_eq!(matched_pattern(&mux, Method::HEAD, "/a"), "/a");
}

#[test]
fn head_at_root() {
    let mut mux = ServeMux::new();
    mux.route("/").get(tag("right"));

    assert_eq!(body_string(request(&mux, Method::HEAD, "/")), "right");
    assert_eq!(matched_pattern(&mux, Method::HEAD, "/"), "/");
}

#[test]
fn wildcard_matches_single_segment() {
    let mut mux = ServeMux::new();
    mux.route("/a/*").get(tag("right"));
    mux.route("/b").get(tag("wrong"));

    assert_eq!(body_string(get(&mux, "/a/llama")), "right");
    assert_eq!(matched_pattern(&mux, Method::GET, "/a/llama"), "/a/*");
}

#[test]
fn wildcard_matches_whole_subtree() {
    let mut mux = ServeMux::new();
    mux.route("/a/*").get(tag("right"));

    assert_eq!(body_string(get(&mux, "/a/llama/4/5")), "right");
    assert_eq!(matched_pattern(&mux, Method::GET, "/a/llama/4/5"), "/a/*");
}

#[test]
fn wildcard_captures_nothing() {
    let mut mux = ServeMux::new();
    mux.route("/a/*").get(|req: Request<Body>| {
        let count = segmux::path_params(&req).len();
        futures::future::ok::<_, hyper::Error>(Response::new(Body::from(count.to_string())))
    });

    assert_eq!(body_string(get(&mux, "/a/llama/4/5")), "0");
}

#[test]
fn options_handler_covers_subtree() {
    let mut mux = ServeMux::new();
    mux.route("/a").options(tag("right"));
    mux.route("/a/b").get(tag("wrong"));

    assert_eq!(body_string(request(&mux, Method::OPTIONS, "/a/b")), "right");
    assert_eq!(matched_pattern(&mux, Method::OPTIONS, "/a/b"), "/a/b");
}

#[test]
fn matching_uses_raw_encoded_segments() {
    let mut mux = ServeMux::new();
    mux.route("/users/:id/info").get(echo_param("id"));

    // %2F must not be treated as a separator, but the captured value is
    // decoded
    assert_eq!(body_string(get(&mux, "/users/ji%2Fm/info")), "ji/m");
    assert_eq!(
        matched_pattern(&mux, Method::GET, "/users/ji%2Fm/info"),
        "/users/:id/info"
    );
}

#[test]
fn undecodable_param_is_bad_request() {
    let mut mux = ServeMux::new();
    mux.route("/users/:id").get(tag("wrong"));

    let res = get(&mux, "/users/%ff");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn route_redirect_permanent() {
    let mut mux = ServeMux::new();
    mux.route("/redir").redirect("/redirect", true);

    let res = get(&mux, "/redir");
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(res.headers()[header::LOCATION], "/redirect");
}

#[test]
fn route_redirect_temporary() {
    let mut mux = ServeMux::new();
    mux.route("/redir").redirect("/redirect", false);

    let res = get(&mux, "/redir");
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(res.headers()[header::LOCATION], "/redirect");
}

#[test]
fn node_without_handlers_is_not_found() {
    let mut mux = ServeMux::new();
    // create the node but register nothing on it
    mux.route("/empty");

    let res = get(&mux, "/empty");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[test]
fn unmatched_path_is_not_found() {
    let mux = ServeMux::new();

    let res = get(&mux, "/found");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(res), "404 page not found\n");
}

#[test]
fn deepest_not_found_wins() {
    let mut mux = ServeMux::new();
    mux.not_found(tag("root"));
    mux.route("/api").not_found(tag("api"));

    assert_eq!(body_string(get(&mux, "/api/missing")), "api");
    assert_eq!(body_string(get(&mux, "/missing")), "root");
}

#[test]
fn method_not_allowed_lists_methods() {
    let mut mux = ServeMux::new();
    mux.route("/a").get(tag("get"));
    mux.route("/a").put(tag("put"));

    let res = request(&mux, Method::POST, "/a");
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[header::ALLOW], "GET, PUT");
}

#[test]
fn generated_options_lists_methods() {
    let mut mux = ServeMux::new();
    mux.route("/a").get(tag("get"));
    mux.route("/a").post(tag("post"));

    let res = request(&mux, Method::OPTIONS, "/a");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::ALLOW], "GET, POST");
}

#[test]
fn handle_registers_for_every_method() {
    let mut mux = ServeMux::new();
    mux.handle("/a", tag("right"));

    assert_eq!(body_string(request(&mux, Method::GET, "/a")), "right");
    assert_eq!(body_string(request(&mux, Method::POST, "/a")), "right");
    assert_eq!(matched_pattern(&mux, Method::POST, "/a"), "/a");
}

#[test]
fn middleware_on_root_sees_all_requests() {
    let mut mux = ServeMux::new();
    mux.middleware("/", wrap("mid"));
    mux.handle("/", tag("handler"));

    let req = Request::get("/").body(()).unwrap();
    let (_, middleware, _) = mux.handler_and_middleware(&req);
    assert_eq!(middleware.len(), 1);

    assert_eq!(body_string(get(&mux, "/")), "mid(handler)");
}

#[test]
fn middleware_runs_in_attachment_order() {
    let mut mux = ServeMux::new();
    mux.route("/")
        .middleware(wrap("m1"))
        .get(tag("handler"))
        .middleware(wrap("m2"));

    assert_eq!(body_string(get(&mux, "/")), "m1(m2(handler))");
}

#[test]
fn middleware_aggregates_along_descent() {
    let mut mux = ServeMux::new();
    mux.middleware("/", wrap("m1"));
    mux.middleware("/a", wrap("m2"));
    mux.route("/a").get(tag("h"));

    assert_eq!(body_string(get(&mux, "/a")), "m1(m2(h))");
}

#[test]
fn middleware_runs_for_not_found() {
    let mut mux = ServeMux::new();
    mux.middleware("/", wrap("mid"));

    assert_eq!(
        body_string(get(&mux, "/nothing")),
        "mid(404 page not found\n)"
    );
}

#[test]
fn host_tree_takes_precedence() {
    let mut mux = ServeMux::new();
    mux.handle("/a", tag("default"));
    mux.handle_host("example.com", "/a", tag("host"));

    // absolute-form request URI carries the authority
    assert_eq!(body_string(get(&mux, "http://example.com/a")), "host");
    assert_eq!(body_string(get(&mux, "/a")), "default");
}

#[test]
fn host_header_selects_tree() {
    let mut mux = ServeMux::new();
    mux.handle("/a", tag("default"));
    mux.handle_host("example.com", "/a", tag("host"));

    let req = Request::builder()
        .method(Method::GET)
        .uri("/a")
        .header(header::HOST, "example.com")
        .body(Body::empty())
        .unwrap();
    assert_eq!(
        body_string(block_on(mux.dispatch(req)).unwrap()),
        "host"
    );

    // unknown hosts fall back to the default tree
    let req = Request::builder()
        .method(Method::GET)
        .uri("/a")
        .header(header::HOST, "other.com")
        .body(Body::empty())
        .unwrap();
    assert_eq!(
        body_string(block_on(mux.dispatch(req)).unwrap()),
        "default"
    );
}

#[test]
fn matched_pattern_is_published() {
    let mut mux = ServeMux::new();
    mux.route("/users/:id").get(|req: Request<Body>| {
        let pattern = segmux::matched_pattern(&req);
        futures::future::ok::<_, hyper::Error>(Response::new(Body::from(pattern)))
    });

    assert_eq!(body_string(get(&mux, "/users/7")), "/users/:id");
}

#[test]
fn path_params_returns_a_snapshot() {
    let mut mux = ServeMux::new();
    mux.route("/repos/:owner/:repo").get(|req: Request<Body>| {
        let mut params = segmux::path_params(&req);
        // mutating the snapshot must not affect later reads
        params.insert("owner".to_string(), "clobbered".to_string());
        let owner = segmux::path_param(&req, "owner");
        let repo = segmux::path_param(&req, "repo");
        futures::future::ok::<_, hyper::Error>(Response::new(Body::from(format!(
            "{}/{}",
            owner, repo
        ))))
    });

    assert_eq!(body_string(get(&mux, "/repos/rust-lang/rust")), "rust-lang/rust");
}

#[test]
fn accessors_default_outside_dispatch() {
    let req = Request::get("/a").body(()).unwrap();
    assert_eq!(segmux::path_param(&req, "id"), "");
    assert!(segmux::path_params(&req).is_empty());
    assert_eq!(segmux::matched_pattern(&req), "");
}

#[test]
fn display_lists_registered_routes() {
    let mut mux = ServeMux::new();
    mux.route("/a").get(tag("h")).post(tag("h"));
    mux.route("/users/:id").get(tag("h"));
    mux.handle_host("example.com", "/b", tag("h"));

    let listing = mux.to_string();
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(
        lines,
        [
            "/\t[NOT_FOUND]",
            "/a\t[GET, POST]",
            "/users/:id\t[GET]",
            "example.com/b\t[ANY]",
        ]
    );
}

#[test]
fn parallel_matches_are_independent() {
    let mut mux = ServeMux::new();
    mux.route("/users/:id").get(echo_param("id"));
    let mux = &mux;

    std::thread::scope(|scope| {
        for i in 0..8 {
            scope.spawn(move || {
                for _ in 0..50 {
                    let path = format!("/users/{}", i);
                    let res = get(mux, &path);
                    assert_eq!(body_string(res), i.to_string());
                }
            });
        }
    });
}
