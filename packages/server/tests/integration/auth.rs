use serde_json::json;

use crate::common::{TestApp, TestResponse, routes};

mod login {
    use super::*;

    #[tokio::test]
    async fn basic_credentials_yield_a_token_and_profile() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app.post_as(routes::LOGIN, &json!({}), &alice).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(res.body["user"]["id"], alice.id);
        assert_eq!(res.body["user"]["username"], "alice");
        assert!(res.body["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;
        let mut alice = app.create_user("alice").await;
        alice.password = "N0tMyPassword".into();

        let res = app.post_as(routes::LOGIN, &json!({}), &alice).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_user_is_rejected_like_a_wrong_password() {
        let app = TestApp::spawn().await;
        let mut ghost = app.create_user("ghost").await;
        ghost.username = "nobody".into();

        let res = app.post_as(routes::LOGIN, &json!({}), &ghost).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn missing_credentials_are_rejected() {
        let app = TestApp::spawn().await;

        let res = app.post(routes::LOGIN, &json!({})).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod bearer {
    use super::*;

    #[tokio::test]
    async fn issued_token_authenticates_requests() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let login = app.post_as(routes::LOGIN, &json!({}), &alice).await;
        let token = login.body["token"].as_str().unwrap().to_string();

        let res = app
            .client
            .post(app.url(routes::DISCUSSIONS))
            .bearer_auth(&token)
            .json(&json!({ "content": "Posted with a bearer token" }))
            .send()
            .await
            .unwrap();
        let res = TestResponse::from_response(res).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn malformed_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(app.url(routes::DISCUSSIONS))
            .bearer_auth("not-a-jwt")
            .json(&json!({ "content": "Should never be stored" }))
            .send()
            .await
            .unwrap();
        let res = TestResponse::from_response(res).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn unsupported_scheme_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .get_with_header(routes::USERS, "Authorization", "Digest abc")
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}
