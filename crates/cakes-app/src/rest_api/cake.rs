use axum::routing::get;
use cakes_dal::cake::CakeFields;
use garde::Validate;
use serde::{Deserialize, Deserializer};

use crate::state::AppState;

/// Optional text in payload, keeps apart missing (or null) value and value,
/// which is empty after trimming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OptionalText {
    #[default]
    Absent,
    Blank,
    Filled(String),
}

impl<'de> Deserialize<'de> for OptionalText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(match value {
            None => OptionalText::Absent,
            Some(s) => match s.trim() {
                "" => OptionalText::Blank,
                trimmed => OptionalText::Filled(trimmed.to_string()),
            },
        })
    }
}

impl OptionalText {
    /// Blank collapses to `None`, so call only on validated values.
    pub fn into_option(self) -> Option<String> {
        match self {
            OptionalText::Filled(s) => Some(s),
            OptionalText::Absent | OptionalText::Blank => None,
        }
    }
}

fn not_blank(value: &OptionalText, _ctx: &()) -> garde::Result {
    match value {
        OptionalText::Blank => Err(garde::Error::new("cannot be empty")),
        _ => Ok(()),
    }
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.trim().to_string())
}

/// Body of create and update requests.
#[derive(Debug, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CakePayload {
    #[serde(deserialize_with = "trimmed")]
    #[garde(length(min = 1))]
    pub title: String,
    #[serde(default)]
    #[garde(custom(not_blank))]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub description: OptionalText,
    #[garde(range(min = 0.0, max = 5.0))]
    pub rating: f32,
    #[serde(default)]
    #[garde(custom(not_blank))]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub image: OptionalText,
}

impl From<CakePayload> for CakeFields {
    fn from(payload: CakePayload) -> Self {
        CakeFields {
            title: payload.title,
            description: payload.description.into_option(),
            rating: payload.rating,
            image: payload.image.into_option(),
        }
    }
}

mod crud_api {
    use axum::{
        extract::{Path, Query},
        response::IntoResponse,
        Json,
    };
    use axum_extra::extract::WithRejection;
    use http::{header, StatusCode};

    use super::CakePayload;
    #[cfg_attr(not(feature = "openapi"), allow(unused_imports))]
    use crate::{
        error::{ApiError, ApiResult, ErrorBody},
        paging::Paging,
        service::{CakeDeleted, CakeMutation, CakePage, CakeService, CakeView},
        validate::Garde,
    };

    #[cfg_attr(feature = "openapi",  utoipa::path(get, path = "", tag = "Cake", operation_id = "listCakes",
        params(Paging), responses(
            (status = StatusCode::OK, description = "Cakes paginated, best rated first", body = CakePage),
            (status = StatusCode::BAD_REQUEST, description = "Invalid paging", body = ErrorBody))))]
    pub async fn list(
        cakes: CakeService,
        Garde(Query(paging)): Garde<Query<Paging>>,
    ) -> ApiResult<impl IntoResponse> {
        let page = cakes.list(paging.page(), paging.page_size()).await?;
        Ok((StatusCode::OK, Json(page)))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/{id}", tag = "Cake", operation_id = "getCake",
        params(("id" = i64, Path, description = "Cake id")), responses(
            (status = StatusCode::OK, description = "Get one", body = CakeView),
            (status = StatusCode::NOT_FOUND, description = "No such cake", body = ErrorBody))))]
    pub async fn get(
        WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
        cakes: CakeService,
    ) -> ApiResult<impl IntoResponse> {
        let record = cakes.get_detail(id).await?;
        Ok((StatusCode::OK, Json(record)))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(post, path = "", tag = "Cake", operation_id = "createCake",
        request_body = CakePayload, responses(
            (status = StatusCode::OK, description = "Created cake", body = CakeMutation),
            (status = StatusCode::BAD_REQUEST, description = "Invalid cake", body = ErrorBody))))]
    pub async fn create(
        cakes: CakeService,
        Garde(Json(payload)): Garde<Json<CakePayload>>,
    ) -> ApiResult<impl IntoResponse> {
        let (id, record) = cakes.create(payload.into()).await?;
        Ok((
            StatusCode::OK,
            [(header::LOCATION, format!("/cakes/{id}"))],
            Json(record),
        ))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(put, path = "/{id}", tag = "Cake", operation_id = "updateCake",
        params(("id" = i64, Path, description = "Cake id")), request_body = CakePayload, responses(
            (status = StatusCode::OK, description = "Updated cake", body = CakeMutation),
            (status = StatusCode::NOT_FOUND, description = "No such cake", body = ErrorBody))))]
    pub async fn update(
        WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
        cakes: CakeService,
        Garde(Json(payload)): Garde<Json<CakePayload>>,
    ) -> ApiResult<impl IntoResponse> {
        let record = cakes.update(id, payload.into()).await?;
        Ok((StatusCode::OK, Json(record)))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(delete, path = "/{id}", tag = "Cake", operation_id = "deleteCake",
        params(("id" = i64, Path, description = "Cake id")), responses(
            (status = StatusCode::OK, description = "Deleted cake", body = CakeDeleted),
            (status = StatusCode::NOT_FOUND, description = "No such cake", body = ErrorBody))))]
    pub async fn delete(
        WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
        cakes: CakeService,
    ) -> ApiResult<impl IntoResponse> {
        let record = cakes.delete(id).await?;
        Ok((StatusCode::OK, Json(record)))
    }
}

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(
    crud_api::list,
    crud_api::get,
    crud_api::create,
    crud_api::update,
    crud_api::delete
))]
struct ApiDocs;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ApiDocs::openapi()
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(crud_api::list).post(crud_api::create))
        .route(
            "/{id}",
            get(crud_api::get)
                .put(crud_api::update)
                .delete(crud_api::delete),
        )
}
