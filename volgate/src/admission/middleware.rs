//! axum wiring for the admission gate.

use super::controller::AdmissionController;
use crate::protocol::RequestClass;
use crate::request_id::{issue_request_id, RequestId, RequestIdIssuer};
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use http::StatusCode;
use std::sync::Arc;
use tracing::warn;

/// Middleware applying the admission contract to each request.
///
/// Mutating requests must get a permit before the handler runs; a 202
/// response records the job under the request's issued id. Status checks
/// always run and may release a job's record afterwards. Everything else
/// passes through.
pub async fn admission_middleware(
    State(controller): State<Arc<AdmissionController>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let class = RequestClass::classify(
        request.method(),
        &path,
        controller.config().async_actions(),
    );

    match class {
        RequestClass::Mutating => {
            let permit = match controller.try_admit() {
                Ok(permit) => permit,
                Err(rejected) => return rejected.into_response(),
            };
            let request_id = request.extensions().get::<RequestId>().cloned();

            let response = next.run(request).await;

            if response.status() == StatusCode::ACCEPTED {
                match request_id {
                    Some(id) => permit.accept(&id),
                    None => {
                        warn!(path = %path, "Accepted response without issued request id, job not tracked");
                    }
                }
            }
            response
        }
        RequestClass::StatusCheck => {
            let response = next.run(request).await;
            controller.observe_status(&path, response.status(), response.headers());
            response
        }
        RequestClass::Other => next.run(request).await,
    }
}

/// Wraps `router` with the request-id issuer and the admission gate.
///
/// The issuer is the outer layer so the identifier exists by the time the
/// gate and the handler see the request.
pub fn apply_admission(router: Router, controller: Arc<AdmissionController>) -> Router {
    let issuer = Arc::new(RequestIdIssuer::new(
        controller.config().async_actions().to_vec(),
    ));
    router
        .layer(middleware::from_fn_with_state(controller, admission_middleware))
        .layer(middleware::from_fn_with_state(issuer, issue_request_id))
}
