use anyhow::Result;
use utoipa_swagger_ui::SwaggerUi;

/// Swagger UI served at `/docs`, backed by the merged OpenAPI document.
pub fn create_swagger_ui(openapi: utoipa::openapi::OpenApi) -> Result<SwaggerUi> {
    Ok(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi))
}
