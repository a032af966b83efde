use microblog_models::{users::User, Connection, MicroblogRocket};

use crate::templates::Html;
use rocket::http::{Method, Status};
use rocket::request::Request;
use rocket::response::{self, content::Html as HtmlCt, Responder, Response};
use std::collections::{btree_map::BTreeMap, hash_map::DefaultHasher};
use std::hash::Hasher;

pub fn escape(s: &str) -> String {
    askama_escape::escape(s, askama_escape::Html).to_string()
}

/// Everything a page needs to render its layout: the database, the logged in user,
/// and the flash message left by the previous request.
pub type BaseContext<'a> = &'a (&'a Connection, Option<User>, Option<(String, String)>);

pub trait IntoContext {
    fn to_context(&self) -> (&Connection, Option<User>, Option<(String, String)>);
}

impl IntoContext for MicroblogRocket {
    fn to_context(&self) -> (&Connection, Option<User>, Option<(String, String)>) {
        (&*self.conn, self.user.clone(), self.flash_msg.clone())
    }
}

#[derive(Debug)]
pub struct Ructe(pub Vec<u8>);

impl<'r> Responder<'r> for Ructe {
    fn respond_to(self, r: &Request<'_>) -> response::Result<'r> {
        //if method is not Get or page contain a form, no caching
        if r.method() != Method::Get || self.0.windows(6).any(|w| w == b"<form ") {
            return HtmlCt(self.0).respond_to(r);
        }
        let mut hasher = DefaultHasher::new();
        hasher.write(&self.0);
        let etag = format!("{:x}", hasher.finish());
        if r.headers()
            .get("If-None-Match")
            .any(|s| s.len() > 2 && s[1..s.len() - 1] == etag)
        {
            Response::build()
                .status(Status::NotModified)
                .raw_header("ETag", format!("\"{}\"", etag))
                .ok()
        } else {
            Response::build()
                .merge(HtmlCt(self.0).respond_to(r)?)
                .raw_header("ETag", format!("\"{}\"", etag))
                .ok()
        }
    }
}

#[macro_export]
macro_rules! render {
    ($group:tt :: $page:tt ( $( $param:expr ),* ) ) => {
        {
            use crate::templates;

            let mut res = vec![];
            templates::$group::$page(
                &mut res,
                $(
                    $param
                ),*
            ).unwrap();
            Ructe(res)
        }
    }
}

pub fn flash_class(kind: &str) -> &'static str {
    match kind {
        "error" => "flash error",
        "success" => "flash success",
        _ => "flash",
    }
}

/// Encodes a user name (or any other value) to be used as one segment of a link.
pub fn url_segment(s: &str) -> String {
    crate::utils::encode(s)
}

/// Previous/next links for a listing. `total` is the number of pages.
pub fn paginate(page: i32, total: i32) -> Html<String> {
    let mut res = String::new();
    res.push_str(r#"<nav class="pagination">"#);
    if page > 1 {
        res.push_str(&format!(
            r#"<a class="newer" href="?page={}">Newer posts</a>"#,
            page - 1
        ));
    }
    if page < total {
        res.push_str(&format!(
            r#"<a class="older" href="?page={}">Older posts</a>"#,
            page + 1
        ));
    }
    res.push_str("</nav>");
    Html(res)
}

/// A builder type to generate `<input>` tags in a type-safe way.
///
/// # Example
///
/// This example uses all options, but you don't have to specify everything.
///
/// ```ignore
/// # let current_email = "foo@bar.baz";
/// Input::new("email", "Your email address")
///     .input_type("email")
///     .default(current_email)
///     .optional()
///     .details("We won't use it for advertising.")
///     .set_prop("class", "email-input")
///     .html();
/// ```
pub struct Input {
    /// The name of the input (`name` and `id` in HTML).
    name: String,
    /// The description of this field.
    label: String,
    /// The `type` of the input (`text`, `email`, `password`, etc).
    input_type: String,
    /// The default value for this input field.
    default: Option<String>,
    /// `true` if this field is not required (will add a little badge next to the label).
    optional: bool,
    /// A small message to display next to the label.
    details: Option<String>,
    /// Additional HTML properties.
    props: BTreeMap<String, String>,
    /// The error message to show next to this field.
    error: Option<String>,
}

impl Input {
    /// Creates a new input with a given name.
    pub fn new(name: impl ToString, label: impl ToString) -> Input {
        Input {
            name: name.to_string(),
            label: label.to_string(),
            input_type: "text".into(),
            default: None,
            optional: false,
            details: None,
            props: BTreeMap::new(),
            error: None,
        }
    }

    /// Set the `type` of this input.
    pub fn input_type(mut self, t: impl ToString) -> Input {
        self.input_type = t.to_string();
        self
    }

    /// Marks this field as optional.
    pub fn optional(mut self) -> Input {
        self.optional = true;
        self
    }

    /// Fills the input with a default value (useful for edition form, to show the current values).
    pub fn default(mut self, val: impl ToString) -> Input {
        self.default = Some(val.to_string());
        self
    }

    /// Adds additional information next to the label.
    pub fn details(mut self, text: impl ToString) -> Input {
        self.details = Some(text.to_string());
        self
    }

    /// Defines an additional HTML property.
    ///
    /// This method can be called multiple times for the same input.
    pub fn set_prop(mut self, key: impl ToString, val: impl ToString) -> Input {
        self.props.insert(key.to_string(), val.to_string());
        self
    }

    /// Shows an error message
    pub fn error(mut self, errs: &validator::ValidationErrors) -> Input {
        if let Some(field_errs) = errs.clone().field_errors().get(self.name.as_str()) {
            self.error = field_errs
                .first()
                .and_then(|e| e.message.clone())
                .map(|m| m.to_string());
        }
        self
    }

    /// Returns the HTML markup for this field.
    pub fn html(mut self) -> Html<String> {
        if !self.optional {
            self = self.set_prop("required", true);
        }

        Html(format!(
            r#"
                <label for="{name}">
                    {label}
                    {optional}
                    {details}
                </label>
                {error}
                <input type="{kind}" id="{name}" name="{name}" value="{val}" {props}/>
                "#,
            name = self.name,
            label = self.label,
            kind = self.input_type,
            optional = if self.optional {
                "<small>Optional</small>".to_owned()
            } else {
                String::new()
            },
            details = self
                .details
                .map(|d| format!("<small>{}</small>", escape(&d)))
                .unwrap_or_default(),
            error = self
                .error
                .map(|e| format!(r#"<p class="error">{}</p>"#, escape(&e)))
                .unwrap_or_default(),
            val = escape(&self.default.unwrap_or_default()),
            props = self
                .props
                .into_iter()
                .fold(String::new(), |mut res, (key, val)| {
                    res.push_str(&format!("{}=\"{}\" ", key, escape(&val)));
                    res
                })
        ))
    }
}

/// Errors attached to the whole form rather than to one field.
pub fn form_errors(errs: &validator::ValidationErrors) -> Html<String> {
    let mut res = String::new();
    if let Some(form_errs) = errs.clone().field_errors().get("__all__") {
        for err in form_errs.iter() {
            if let Some(ref message) = err.message {
                res.push_str(&format!(r#"<p class="error">{}</p>"#, escape(message)));
            }
        }
    }
    Html(res)
}
