use http::Method;
use minijinja::{context, Environment};
use tracing::warn;

use crate::error::DispatchError;
use crate::message::{Request, Response, HEADER_ALLOW};

const NOT_FOUND_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><title>404 Not Found</title></head>
<body>
<h1>Not Found</h1>
<p>No resource is mapped to <code>{{ path }}</code>.</p>
</body>
</html>
"#;

const METHOD_NOT_ALLOWED_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><title>405 Method Not Allowed</title></head>
<body>
<h1>Method Not Allowed</h1>
<p><code>{{ method }}</code> is not supported by this resource.
Allowed: <code>{{ allowed }}</code>.</p>
</body>
</html>
"#;

const SERVER_ERROR_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><title>500 Internal Server Error</title></head>
<body>
<h1>Internal Server Error</h1>
<p>The server failed to process the request.</p>
</body>
</html>
"#;

/// Converts classified failures into terminal responses.
///
/// The response shape depends on the request's declared acceptance of HTML:
/// clients accepting `text/html` get a rendered error page, everything else
/// gets a bare status response. A `MethodNotAllowed` failure discloses the
/// resource's supported operations in the `Allow` header either way.
///
/// The built-in pages can be replaced per status via the template setters.
pub struct ErrorResponder {
    env: Environment<'static>,
}

impl Default for ErrorResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorResponder {
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();
        add_template(&mut env, "404", NOT_FOUND_TEMPLATE.to_string());
        add_template(&mut env, "405", METHOD_NOT_ALLOWED_TEMPLATE.to_string());
        add_template(&mut env, "500", SERVER_ERROR_TEMPLATE.to_string());
        Self { env }
    }

    /// Replace the not-found page. The template sees `path`.
    pub fn set_not_found_template(&mut self, source: impl Into<String>) {
        add_template(&mut self.env, "404", source.into());
    }

    /// Replace the method-not-allowed page. The template sees `method` and
    /// `allowed`.
    pub fn set_method_not_allowed_template(&mut self, source: impl Into<String>) {
        add_template(&mut self.env, "405", source.into());
    }

    /// Replace the server-error page. The template sees no variables.
    pub fn set_server_error_template(&mut self, source: impl Into<String>) {
        add_template(&mut self.env, "500", source.into());
    }

    /// Build the terminal response for a classified failure.
    #[must_use]
    pub fn respond(&self, error: &DispatchError, request: Option<&Request>) -> Response {
        let accepts_html = request.map(Request::accepts_html).unwrap_or(false);

        match error {
            DispatchError::ResourceNotFound { path } => {
                if accepts_html {
                    if let Some(markup) = self.render("404", context! { path => path }) {
                        return Response::html(404, markup);
                    }
                }
                Response::new(404)
            }
            DispatchError::MethodNotAllowed { method, allowed } => {
                let allowed_list = format_allowed(allowed);
                let mut response = if accepts_html {
                    match self.render(
                        "405",
                        context! { method => method.as_str(), allowed => &allowed_list },
                    ) {
                        Some(markup) => Response::html(405, markup),
                        None => Response::new(405),
                    }
                } else {
                    Response::new(405)
                };
                response.set_header(HEADER_ALLOW, allowed_list);
                response
            }
            other => {
                warn!(error = %other, "unclassified failure converted to server error");
                if accepts_html {
                    if let Some(markup) = self.render("500", context! {}) {
                        return Response::html(500, markup);
                    }
                }
                Response::new(500)
            }
        }
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Option<String> {
        let template = match self.env.get_template(name) {
            Ok(template) => template,
            Err(error) => {
                warn!(template = name, error = %error, "error template missing");
                return None;
            }
        };
        match template.render(ctx) {
            Ok(markup) => Some(markup),
            Err(error) => {
                warn!(template = name, error = %error, "error template failed to render");
                None
            }
        }
    }
}

fn add_template(env: &mut Environment<'static>, name: &'static str, source: String) {
    if let Err(error) = env.add_template_owned(name, source) {
        warn!(template = name, error = %error, "error template rejected; keeping previous");
    }
}

fn format_allowed(allowed: &[Method]) -> String {
    allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
