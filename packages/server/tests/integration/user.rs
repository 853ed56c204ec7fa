use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;

use ::common::{BlobName, BlobStore};

use crate::common::{PASSWORD, PDF, PNG, TestApp, routes};

mod signup {
    use super::*;

    #[tokio::test]
    async fn valid_signup_is_saved() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                routes::USERS,
                &json!({"username": "alice", "display_name": "Alice W.", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["message"], "User saved");
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_user("alice").await;

        let res = app
            .post(
                routes::USERS,
                &json!({"username": "alice", "display_name": "Other Alice", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "USERNAME_TAKEN");
        assert!(res.body["validation_errors"]["username"].is_string());
    }

    #[tokio::test]
    async fn every_missing_field_is_reported() {
        let app = TestApp::spawn().await;

        let res = app.post(routes::USERS, &json!({})).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        let errors = &res.body["validation_errors"];
        assert!(errors["username"].is_string());
        assert!(errors["display_name"].is_string());
        assert!(errors["password"].is_string());
    }

    #[tokio::test]
    async fn weak_password_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                routes::USERS,
                &json!({"username": "alice", "display_name": "Alice W.", "password": "alllowercase1"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["validation_errors"]["password"].is_string());
        assert!(res.body["validation_errors"].get("username").is_none());
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn anonymous_listing_includes_everyone_in_id_order() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob1").await;

        let res = app.get(routes::USERS).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.ids(), vec![alice.id, bob.id]);
        assert_eq!(res.body["pagination"]["total"], 2);
        assert!(res.body["data"][0].get("password").is_none());
    }

    #[tokio::test]
    async fn authenticated_listing_excludes_the_caller() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob1").await;

        let res = app.get_as(routes::USERS, &alice).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.ids(), vec![bob.id]);
    }

    #[tokio::test]
    async fn page_parameters_are_clamped() {
        let app = TestApp::spawn().await;
        app.create_user("alice").await;

        let res = app
            .get(&format!("{}?page=-3&size=1000", routes::USERS))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["page"], 0);
        assert_eq!(res.body["pagination"]["size"], 100);

        let res = app.get(&format!("{}?size=-1", routes::USERS)).await;
        assert_eq!(res.body["pagination"]["size"], 10);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::user("nobody")).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn user_can_rename_themselves() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app
            .put_as(&routes::user("alice"), &json!({"display_name": "Alice Renamed"}), &alice)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["display_name"], "Alice Renamed");
        assert!(res.body["image"].is_null());
    }

    #[tokio::test]
    async fn cannot_update_someone_else() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        app.create_user("bob1").await;

        let res = app
            .put_as(&routes::user("bob1"), &json!({"display_name": "Hijacked"}), &alice)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn profile_image_is_stored_served_and_replaced() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let body = json!({"display_name": "Alice W.", "image": STANDARD.encode(PNG)});

        let first = app.put_as(&routes::user("alice"), &body, &alice).await;
        assert_eq!(first.status, 200, "{}", first.text);
        let first_name = first.body["image"].as_str().unwrap().to_string();

        let served = app.get(&routes::profile_image(&first_name)).await;
        assert_eq!(served.status, 200);
        assert_eq!(served.headers["content-type"], "image/png");

        let second = app.put_as(&routes::user("alice"), &body, &alice).await;
        let second_name = second.body["image"].as_str().unwrap().to_string();
        assert_ne!(first_name, second_name);

        let old = BlobName::parse(&first_name).unwrap();
        assert!(!app.profile_images.exists(&old).await.unwrap());
        assert_eq!(app.get(&routes::profile_image(&first_name)).await.status, 404);
    }

    #[tokio::test]
    async fn non_image_profile_picture_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app
            .put_as(
                &routes::user("alice"),
                &json!({"display_name": "Alice W.", "image": STANDARD.encode(PDF)}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 415);
        assert_eq!(res.body["code"], "UNSUPPORTED_MEDIA_TYPE");
    }

    #[tokio::test]
    async fn invalid_base64_is_a_field_error() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app
            .put_as(
                &routes::user("alice"),
                &json!({"display_name": "Alice W.", "image": "***"}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["validation_errors"]["image"].is_string());
    }
}
