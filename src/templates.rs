use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;

pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(error) => {
                let message = format!("Failed to render template: {error:?}");
                tracing::error!("{message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

/// Page asking a human to test staging before the commit is marked as tested.
#[derive(Template)]
#[template(path = "confirm.html")]
pub struct ConfirmTemplate {
    /// Operator-supplied, may contain HTML.
    pub test_action: String,
    pub form_action: String,
}

impl ConfirmTemplate {
    pub fn new(default_test: Option<&str>, form_action: String) -> Self {
        let test_action = match default_test {
            Some(test) => format!("{test} on staging, then click this button."),
            None => "Then click this button.".to_string(),
        };
        Self {
            test_action,
            form_action,
        }
    }
}
