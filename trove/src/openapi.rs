//! OpenAPI documentation assembly.
//!
//! The rendered docs are served at `/docs`.

use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "trove",
        description = "Self-hostable personal asset tracking - garage, armory, and humidor in one place"
    ),
    paths(
        handlers::auth::get_registration_info,
        handlers::auth::register,
        handlers::auth::get_login_info,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::get_profile,
        handlers::auth::update_profile,
        handlers::garage::list_vehicles,
        handlers::garage::create_vehicle,
        handlers::garage::get_vehicle,
        handlers::garage::update_vehicle,
        handlers::garage::update_odometer,
        handlers::garage::add_service_log,
        handlers::garage::dispose_vehicle,
        handlers::armory::list_guns,
        handlers::armory::create_gun,
        handlers::armory::get_gun,
        handlers::armory::update_gun,
        handlers::armory::add_accessory,
        handlers::armory::add_range_session,
        handlers::armory::dispose_gun,
        handlers::humidor::list_cigars,
        handlers::humidor::create_cigar,
        handlers::humidor::get_cigar,
        handlers::humidor::update_cigar,
        handlers::humidor::add_smoking_session,
        handlers::humidor::dispose_cigar,
        handlers::humidor::community_catalog,
        handlers::humidor::add_from_catalog,
        handlers::humidor::catalog_options,
        handlers::analytics::dashboard,
        handlers::billing::billing_info,
        handlers::billing::create_checkout,
        handlers::billing::customer_portal,
        handlers::billing::webhook_handler,
    ),
    components(schemas(
        models::auth::LoginInfo,
        models::auth::RegistrationInfo,
        models::users::UserResponse,
        models::analytics::AnalyticsSummary,
        models::analytics::GarageStats,
        models::analytics::ArmoryStats,
        models::analytics::HumidorStats,
        handlers::billing::BillingInfo,
    )),
    tags(
        (name = "authentication", description = "Registration, login, and profile management"),
        (name = "garage", description = "Vehicles, service logs, and mileage alerts"),
        (name = "armory", description = "Guns, accessories, and range sessions"),
        (name = "humidor", description = "Cigars, smoking sessions, and the community catalog"),
        (name = "analytics", description = "Per-user aggregate views"),
        (name = "billing", description = "Subscription billing proxy"),
    )
)]
pub struct ApiDoc;
