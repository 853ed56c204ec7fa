use axum::middleware::from_fn_with_state;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::middleware::{identify, require_auth};
use crate::state::AppState;

pub fn routes(state: &AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes(state))
        .nest("/users", user_routes(state))
        .nest("/discussions", discussion_routes(state))
        .nest("/images", image_routes())
}

/// Routes that need an authenticated caller.
fn guarded(state: &AppState, router: OpenApiRouter<AppState>) -> OpenApiRouter<AppState> {
    router.route_layer(from_fn_with_state(state.clone(), require_auth))
}

fn auth_routes(state: &AppState) -> OpenApiRouter<AppState> {
    guarded(
        state,
        OpenApiRouter::new().routes(routes!(handlers::auth::login)),
    )
}

fn user_routes(state: &AppState) -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new()
        .routes(routes!(handlers::user::signup))
        .routes(routes!(handlers::user::get_user))
        .routes(routes!(handlers::discussion::list_user_discussions))
        .routes(routes!(handlers::discussion::user_relative_feed));

    let identified = OpenApiRouter::new()
        .routes(routes!(handlers::user::list_users))
        .route_layer(from_fn_with_state(state.clone(), identify));

    let private = guarded(
        state,
        OpenApiRouter::new().routes(routes!(handlers::user::update_user)),
    );

    public.merge(identified).merge(private)
}

fn discussion_routes(state: &AppState) -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new()
        .routes(routes!(handlers::discussion::list_discussions))
        .routes(routes!(handlers::discussion::relative_feed));

    let private = guarded(
        state,
        OpenApiRouter::new()
            .routes(routes!(handlers::discussion::create_discussion))
            .routes(routes!(handlers::discussion::delete_discussion)),
    );

    let upload = guarded(
        state,
        OpenApiRouter::new().routes(routes!(handlers::attachment::upload_attachment)),
    )
    .layer(handlers::attachment::attachment_upload_body_limit(
        state.config.storage.max_attachment_size,
    ));

    public.merge(private).merge(upload)
}

fn image_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::image::get_attachment_image))
        .routes(routes!(handlers::image::get_profile_image))
}
