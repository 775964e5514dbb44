use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wikiroster API",
        version = "0.3.0",
        description = "Read-only API over tournament rosters ingested from wiki pages."
    ),
    paths(
        crate::routes::list_tournaments,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::TournamentResponse,
        crate::dto::TeamResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "tournaments", description = "Stored tournament records"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
