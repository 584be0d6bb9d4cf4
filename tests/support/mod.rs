#![allow(dead_code)]

//! Local axum server for exercising the real fetcher without network access.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct Route {
    pub status: StatusCode,
    pub body: String,
    pub delay: Option<Duration>,
}

impl Route {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("valid status code"),
            body: String::from("{\"error\":true}"),
            delay: None,
        }
    }

    pub fn slow(delay: Duration, body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
            delay: Some(delay),
        }
    }
}

async fn respond(route: Route) -> impl IntoResponse {
    if let Some(delay) = route.delay {
        tokio::time::sleep(delay).await;
    }
    (
        route.status,
        [(header::CONTENT_TYPE, "application/json")],
        route.body,
    )
}

/// Serves `routes` (keyed by path, e.g. `/users`) on an ephemeral port. Unknown paths answer 404.
pub async fn serve(routes: Vec<(&str, Route)>) -> SocketAddr {
    let app = routes
        .into_iter()
        .fold(Router::new(), |app, (path, route)| {
            app.route(path, get(move || respond(route.clone())))
        });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });
    addr
}

pub const USERS: &str = r#"[{"id":1,"name":"Leanne Graham","email":"Sincere@april.biz"},{"id":2,"name":"Ervin Howell","email":"Shanna@melissa.tv"}]"#;
pub const POSTS: &str = r#"[{"id":1,"title":"a","body":"b","userId":1},{"id":2,"title":"c","body":"d","userId":1}]"#;
pub const COMMENTS: &str = r#"[{"id":1,"name":"n","email":"e","body":"b","postId":1},{"id":2,"name":"n","email":"e","body":"b","postId":2}]"#;
pub const ALBUMS: &str = r#"[{"id":5,"title":"a","userId":2}]"#;
pub const PHOTOS: &str = r#"[{"id":1,"title":"p","url":"u","thumbnailUrl":"t","albumId":5}]"#;
pub const TODOS: &str = r#"[{"id":1,"title":"t","completed":true,"userId":2}]"#;

/// Every standard collection, served successfully.
pub fn standard_routes() -> Vec<(&'static str, Route)> {
    vec![
        ("/users", Route::ok(USERS)),
        ("/posts", Route::ok(POSTS)),
        ("/comments", Route::ok(COMMENTS)),
        ("/albums", Route::ok(ALBUMS)),
        ("/photos", Route::ok(PHOTOS)),
        ("/todos", Route::ok(TODOS)),
    ]
}
