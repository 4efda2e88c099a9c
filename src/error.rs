use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::{DishId, Key};
use crate::nutrition::LookupError;

/// Everything the API can report back to a client.
///
/// Error responses do not carry an object: the body is a bare integer code
/// that clients compare against literally, see [`ServiceError::code`].
#[derive(Debug, Error)]
pub(crate) enum ServiceError {
    #[error("request body must be application/json")]
    UnsupportedMediaType,

    #[error("malformed request body: {0}")]
    InvalidBody(String),

    #[error("dish `{0}` already exists")]
    DuplicateDish(String),

    #[error("meal `{0}` already exists")]
    DuplicateMeal(String),

    #[error("`{0}` is not a recognised food")]
    UnknownFood(String),

    #[error("nutrition lookup failed: {0}")]
    NutritionUnavailable(#[from] LookupError),

    #[error("dish {0} not found")]
    DishNotFound(Key),

    #[error("meal {0} not found")]
    MealNotFound(Key),

    #[error("meal references dish #{0} which does not exist")]
    UnknownDishReference(DishId),
}

impl ServiceError {
    pub(crate) fn code(&self) -> i32 {
        match self {
            ServiceError::UnsupportedMediaType => 0,
            ServiceError::InvalidBody(_) => -1,
            ServiceError::DuplicateDish(_) | ServiceError::DuplicateMeal(_) => -2,
            ServiceError::UnknownFood(_) => -3,
            ServiceError::NutritionUnavailable(_) => -4,
            ServiceError::DishNotFound(_) | ServiceError::MealNotFound(_) => -5,
            ServiceError::UnknownDishReference(_) => -6,
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServiceError::InvalidBody(_)
            | ServiceError::DuplicateDish(_)
            | ServiceError::DuplicateMeal(_)
            | ServiceError::UnknownFood(_)
            | ServiceError::UnknownDishReference(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NutritionUnavailable(LookupError::Rejected) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::NutritionUnavailable(_) => StatusCode::BAD_GATEWAY,
            ServiceError::DishNotFound(_) | ServiceError::MealNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::warn!("{}", self);
        } else {
            log::debug!("rejected request: {}", self);
        }
        HttpResponse::build(self.status_code()).json(self.code())
    }
}
