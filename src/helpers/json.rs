use actix_web::{HttpResponse, Responder};
use serde::Serialize;

/// Success envelope shared by every REST route: `{message, item}` or `{message, list}`.
/// Failures go through `ChatError` and carry `{error}` instead.
#[derive(Serialize)]
pub(crate) struct JsonResponse<T> {
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) item: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) list: Option<Vec<T>>,
}

pub(crate) struct JsonResponseBuilder<T>
where
    T: Serialize,
{
    item: Option<T>,
    list: Option<Vec<T>>,
}

impl<T> JsonResponseBuilder<T>
where
    T: Serialize,
{
    pub(crate) fn set_item(mut self, item: T) -> Self {
        self.item = Some(item);
        self
    }

    pub(crate) fn set_list(mut self, list: Vec<T>) -> Self {
        self.list = Some(list);
        self
    }

    fn into_body(self, message: &str) -> JsonResponse<T> {
        let message = if message.trim().is_empty() {
            String::from("Success")
        } else {
            message.to_string()
        };

        JsonResponse {
            message,
            item: self.item,
            list: self.list,
        }
    }

    pub(crate) fn ok(self, message: &str) -> impl Responder {
        HttpResponse::Ok().json(self.into_body(message))
    }

    pub(crate) fn created(self, message: &str) -> impl Responder {
        HttpResponse::Created().json(self.into_body(message))
    }
}

impl<T> JsonResponse<T>
where
    T: Serialize,
{
    pub(crate) fn build() -> JsonResponseBuilder<T> {
        JsonResponseBuilder {
            item: None,
            list: None,
        }
    }
}
