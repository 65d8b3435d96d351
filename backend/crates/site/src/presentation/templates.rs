//! Template Environment
//!
//! Pages are minijinja templates embedded at compile time. Every page
//! extends `base.html` and receives the shared context built by the
//! handlers (flash, CSRF token, authentication state, current year).

use std::sync::LazyLock;

use axum::response::Html;
use chrono::{DateTime, Utc};
use minijinja::{Environment, Value};

use crate::error::SiteResult;

static ENV: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.add_filter("human_date", human_date);

    for (name, source) in [
        ("base.html", include_str!("../templates/base.html")),
        ("home.html", include_str!("../templates/home.html")),
        ("view.html", include_str!("../templates/view.html")),
        ("create.html", include_str!("../templates/create.html")),
        ("signup.html", include_str!("../templates/signup.html")),
        ("login.html", include_str!("../templates/login.html")),
    ] {
        env.add_template(name, source)
            .expect("embedded template parses");
    }

    env
});

/// Render a page template with the given context
pub fn render(name: &str, ctx: Value) -> SiteResult<Html<String>> {
    let template = ENV.get_template(name)?;
    Ok(Html(template.render(ctx)?))
}

/// Format an RFC 3339 timestamp for display, e.g. "02 Jan 2026 at 15:04"
fn human_date(value: String) -> String {
    match DateTime::parse_from_rfc3339(&value) {
        Ok(dt) => dt
            .with_timezone(&Utc)
            .format("%d %b %Y at %H:%M")
            .to_string(),
        Err(_) => value,
    }
}
