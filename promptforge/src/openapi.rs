//! OpenAPI documentation, served with RapiDoc at `/docs`.

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::generations::create_generation,
        crate::api::handlers::generations::get_generation,
        crate::api::handlers::generations::list_generations,
        crate::api::handlers::generations::create_free_image,
        crate::api::handlers::generations::list_free_models,
        crate::api::handlers::credits::get_balance,
        crate::api::handlers::admin::list_users,
        crate::api::handlers::admin::update_user_credits,
        crate::api::handlers::webhooks::identity_webhook,
    ),
    components(schemas(
        crate::api::models::generations::GenerationKind,
        crate::api::models::generations::GenerationStatus,
        crate::api::models::generations::GenerationCreate,
        crate::api::models::generations::GenerationCreateResponse,
        crate::api::models::generations::GenerationResponse,
        crate::api::models::generations::GenerationStatusResponse,
        crate::api::models::generations::GenerationListResponse,
        crate::api::models::generations::FreeImageCreate,
        crate::api::models::generations::FreeImageResponse,
        crate::api::models::generations::FreeImageModel,
        crate::api::models::generations::FreeImageModelsResponse,
        crate::api::models::credits::BalanceResponse,
        crate::api::models::admin::AdminUserResponse,
        crate::api::models::admin::CreditUpdateRequest,
        crate::api::models::users::CurrentUser,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "generations", description = "Generation job management"),
        (name = "credits", description = "Credit ledger"),
        (name = "admin", description = "Admin surface"),
        (name = "webhooks", description = "Identity provider webhooks"),
    ),
    info(
        title = "promptforge",
        description = "Credit-metered prompt-to-media generation service",
    )
)]
pub struct ApiDoc;

/// Registers the trusted identity headers as the documented auth scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "IdentityHeaders",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-identity-user"))),
            );
        }
    }
}
