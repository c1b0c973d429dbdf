// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-rendered list and detail pages.
//!
//! Every request reads the collection afresh and the response is marked
//! `no-store`. A collection that can't be read renders the same empty
//! state as one with no records.

use crate::db::collections;
use crate::models::{Business, BusinessType, Review};
use crate::routes::reviews::reviews_for;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::Value;
use std::sync::Arc;

/// Text shown when a category has no records.
pub const EMPTY_STATE: &str = "Be the first to add one";

pub fn routes() -> Router<Arc<AppState>> {
    BusinessType::ALL.into_iter().fold(
        Router::new().route("/", get(index_page)),
        |router, kind| {
            let base = format!("/{}", kind.plural());
            router
                .route(
                    &base,
                    get(move |state: State<Arc<AppState>>| list_page(state, kind)),
                )
                .route(
                    &format!("{base}/{{id}}"),
                    get(move |state: State<Arc<AppState>>, id: Path<String>| {
                        detail_page(state, kind, id)
                    }),
                )
        },
    )
}

fn page_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CACHE_CONTROL, "no-store")], Html(body)).into_response()
}

async fn index_page() -> Response {
    let mut body = String::from("<ul class=\"categories\">");
    for kind in BusinessType::ALL {
        body.push_str(&format!(
            "<li><a href=\"/{}\">{}</a></li>",
            kind.plural(),
            kind.display_name()
        ));
    }
    body.push_str("</ul>");
    page_response(StatusCode::OK, layout("CrewIntel", &body))
}

async fn list_page(State(state): State<Arc<AppState>>, kind: BusinessType) -> Response {
    let records = match state.collections.load::<Business>(kind.collection()).await {
        Ok(collection) => collection.records,
        Err(e) => {
            tracing::error!(error = %e, kind = %kind, "Failed to load collection for page");
            Vec::new()
        }
    };

    page_response(StatusCode::OK, render_list(kind, &records))
}

async fn detail_page(
    State(state): State<Arc<AppState>>,
    kind: BusinessType,
    Path(id): Path<String>,
) -> Response {
    let business = match state.collections.get::<Business>(kind.collection(), &id).await {
        Ok(Some(business)) => business,
        Ok(None) => return not_found_page(kind),
        Err(e) => {
            tracing::error!(error = %e, kind = %kind, id = %id, "Failed to load record for page");
            return not_found_page(kind);
        }
    };

    let reviews = match state.collections.load::<Review>(collections::REVIEWS).await {
        Ok(collection) => reviews_for(collection.records, kind, &business.id),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load reviews for page");
            Vec::new()
        }
    };

    page_response(StatusCode::OK, render_detail(kind, &business, &reviews))
}

fn not_found_page(kind: BusinessType) -> Response {
    let body = format!(
        "<h1>Not found</h1><p>That listing doesn't exist.</p><p><a href=\"/{}\">Back to {}</a></p>",
        kind.plural(),
        escape_html(kind.display_name())
    );
    page_response(StatusCode::NOT_FOUND, layout("Not found", &body))
}

/// Grid of cards for one category.
pub fn render_list(kind: BusinessType, records: &[Business]) -> String {
    let title = kind.display_name();
    let mut body = format!("<h1>{}</h1>", escape_html(title));

    if records.is_empty() {
        body.push_str(&format!(
            "<p class=\"empty\">No {} yet. {EMPTY_STATE}!</p>",
            escape_html(&title.to_lowercase())
        ));
        return layout(title, &body);
    }

    body.push_str("<div class=\"grid\">");
    for business in records {
        body.push_str(&format!(
            "<a class=\"card\" href=\"/{}/{}\"><h2>{}</h2>",
            kind.plural(),
            urlencoding::encode(&business.id),
            escape_html(&business.name)
        ));
        if let Some(code) = &business.airport_code {
            body.push_str(&format!("<p class=\"code\">{}</p>", escape_html(code)));
        }
        if let Some(city) = &business.city {
            body.push_str(&format!("<p>{}</p>", escape_html(city)));
        }
        if let Some(address) = &business.address {
            body.push_str(&format!("<p>{}</p>", escape_html(address)));
        }
        body.push_str("</a>");
    }
    body.push_str("</div>");

    layout(title, &body)
}

/// One record with its extra attributes and reviews.
pub fn render_detail(kind: BusinessType, business: &Business, reviews: &[Review]) -> String {
    let mut body = format!(
        "<p><a href=\"/{}\">{}</a></p><h1>{}</h1><dl>",
        kind.plural(),
        escape_html(kind.display_name()),
        escape_html(&business.name)
    );

    let known = [
        ("Airport", business.airport_code.as_deref()),
        ("City", business.city.as_deref()),
        ("Address", business.address.as_deref()),
    ];
    for (label, value) in known {
        if let Some(value) = value {
            body.push_str(&format!("<dt>{label}</dt><dd>{}</dd>", escape_html(value)));
        }
    }
    for (key, value) in &business.extra {
        if let Some(text) = scalar_text(value) {
            body.push_str(&format!(
                "<dt>{}</dt><dd>{}</dd>",
                escape_html(key),
                escape_html(&text)
            ));
        }
    }
    body.push_str("</dl><h2>Reviews</h2>");

    if reviews.is_empty() {
        body.push_str("<p class=\"empty\">No reviews yet.</p>");
    } else {
        body.push_str("<ul class=\"reviews\">");
        for review in reviews {
            body.push_str(&format!(
                "<li><span class=\"rating\">{}/5</span>",
                review.rating
            ));
            if let Some(comment) = &review.comment {
                body.push_str(&format!("<p>{}</p>", escape_html(comment)));
            }
            body.push_str(&format!(
                "<time>{}</time></li>",
                escape_html(&review.created_at)
            ));
        }
        body.push_str("</ul>");
    }

    layout(&business.name, &body)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{} | CrewIntel</title><style>{STYLE}</style></head>\
         <body><header><a href=\"/\">CrewIntel</a></header><main>{body}</main></body></html>",
        escape_html(title)
    )
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;color:#1f2933}\
header{background:#102a43;padding:1rem}header a{color:#fff;text-decoration:none;font-weight:600}\
main{max-width:960px;margin:0 auto;padding:1rem}\
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(220px,1fr));gap:1rem}\
.card{display:block;border:1px solid #d9e2ec;border-radius:8px;padding:1rem;color:inherit;text-decoration:none}\
.code{font-weight:600;color:#486581}.empty{color:#627d98}";

/// Minimal HTML escaping for text and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
