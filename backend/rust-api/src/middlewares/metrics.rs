use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Path segments whose next segment is a caller-chosen identifier.
const COLLECTIONS: &[&str] = &["sessions", "questions", "concepts", "lessons", "topics"];

const ID_PLACEHOLDER: &str = "{id}";

/// Counts requests and observes latency, labelled by method and route shape.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().as_str().to_owned();
    let route = route_label(req.uri().path());

    let response = next.run(req).await;

    let status = response.status();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), route.as_str(), status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method.as_str(), route.as_str()])
        .observe(started.elapsed().as_secs_f64());

    response
}

/// Replaces identifiers with `{id}` so label cardinality stays bounded:
/// any segment after a collection name, plus anything shaped like a UUID
/// or a number.
fn route_label(path: &str) -> String {
    let mut previous = "";
    path.split('/')
        .map(|segment| {
            let identifier = (!segment.is_empty() && COLLECTIONS.contains(&previous))
                || looks_like_uuid(segment)
                || is_number(segment);
            previous = if identifier { "" } else { segment };
            if identifier {
                ID_PLACEHOLDER
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn looks_like_uuid(segment: &str) -> bool {
    segment.len() == 36 && segment.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

fn is_number(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
