//! OpenAPI/Utoipa configuration.

use crate::api::{account::ACCOUNT_TAG, health::MISC_TAG};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

/// Security addon for OpenAPI documentation.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    #[tracing::instrument(skip(self, openapi))]
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let bearer = HttpBuilder::new()
            .scheme(HttpAuthScheme::Bearer)
            .bearer_format("JWT")
            .description(Some(
                "Use the token returned by `/api/account/login`: `Authorization: Bearer {token}`.",
            ))
            .build();
        components.add_security_scheme("Authorization", SecurityScheme::Http(bearer));
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Account Gateway API",
        version = "1.0.0",
        description = "Account registration, password login and signed bearer token issuance."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = ACCOUNT_TAG, description = "Account registration and login endpoints")
    )
)]
pub struct ApiDoc;
