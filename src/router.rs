use std::path::Path;

use crate::request::Request;

/// Resource served for `/`, and the only one that receives the chat splice.
pub const ROOT_RESOURCE: &str = "index.html";

pub const SUBMIT_PATH: &str = "/chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Path contains `..`.
    Forbidden,
    /// `POST /chat`.
    Submit,
    Resource(String),
}

/// Pick the handler for a parsed request. The traversal guard runs before
/// anything else, whatever the method.
pub fn route(request: &Request<'_>) -> Route {
    if request.path.contains("..") {
        return Route::Forbidden;
    }

    if request.method == "POST" && request.path == SUBMIT_PATH {
        return Route::Submit;
    }

    Route::Resource(resource_name(&request.path))
}

/// Map a request path to a resource name: query and fragment are dropped,
/// `/` becomes [`ROOT_RESOURCE`] and any other path loses its leading slash.
pub fn resource_name(path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    let path = path.split('#').next().unwrap_or(path);

    if path == "/" {
        ROOT_RESOURCE.to_string()
    } else {
        path.strip_prefix('/').unwrap_or(path).to_string()
    }
}

pub fn is_template(name: &str) -> bool {
    name == ROOT_RESOURCE
}

pub fn content_type(name: &str) -> ContentType {
    match Path::new(name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("css") => ContentType::Css,
        _ => ContentType::Html,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Css,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Html => "text/html",
            ContentType::Css => "text/css",
        }
    }
}
