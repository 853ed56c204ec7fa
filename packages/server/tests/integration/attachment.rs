use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use forum_server::attachment::reclaim_orphans;
use forum_server::entity::file_attachment;

use crate::common::{GIF, PDF, PNG, TestApp, routes};

/// Backdate an attachment's upload time.
async fn age(app: &TestApp, attachment_id: i64, by: chrono::Duration) {
    file_attachment::Entity::update_many()
        .col_expr(
            file_attachment::Column::CreatedAt,
            Expr::value(Utc::now() - by),
        )
        .filter(file_attachment::Column::Id.eq(attachment_id))
        .exec(&app.db)
        .await
        .expect("Failed to backdate attachment");
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn image_is_stored_unbound_under_a_generated_name() {
        let app = TestApp::spawn().await;
        let bob = app.create_user("bob1").await;

        let res = app.upload_as("../../etc/passwd.png", PNG, &bob).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["file_type"], "image/png");
        let name = res.body["name"].as_str().unwrap();
        assert_eq!(name.len(), 32);
        assert!(!name.contains("passwd"));

        let record = app.attachment_record(res.id()).await.unwrap();
        assert_eq!(record.discussion_id, None);
        assert!(app.attachment_blob_exists(name).await);
    }

    #[tokio::test]
    async fn type_comes_from_content_not_filename() {
        let app = TestApp::spawn().await;
        let bob = app.create_user("bob1").await;

        let gif = app.upload_as("looks-like.png", GIF, &bob).await;
        assert_eq!(gif.status, 201);
        assert_eq!(gif.body["file_type"], "image/gif");

        let pdf = app.upload_as("innocent.png", PDF, &bob).await;
        assert_eq!(pdf.status, 415);
        assert_eq!(pdf.body["code"], "UNSUPPORTED_MEDIA_TYPE");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn().await;
        let bob = app.create_user("bob1").await;
        let mut big = PNG.to_vec();
        big.resize(64 * 1024 + 1, 0);

        let res = app.upload_as("big.png", &big, &bob).await;

        assert_eq!(res.status, 400);
        assert!(
            file_attachment::Entity::find()
                .all(&app.db)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn upload_requires_authentication() {
        let app = TestApp::spawn().await;
        let part = reqwest::multipart::Part::bytes(PNG.to_vec()).file_name("a.png");
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = app
            .client
            .post(app.url(routes::UPLOAD))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 401);
    }
}

mod binding {
    use super::*;

    #[tokio::test]
    async fn creating_a_discussion_binds_the_attachment() {
        let app = TestApp::spawn().await;
        let bob = app.create_user("bob1").await;
        let (attachment_id, name) = app.upload_png(&bob).await;

        let res = app
            .post_as(
                routes::DISCUSSIONS,
                &json!({"content": "Look at this picture", "attachment_id": attachment_id}),
                &bob,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["attachment"]["id"], attachment_id);
        assert_eq!(res.body["attachment"]["name"], name.as_str());
        let record = app.attachment_record(attachment_id).await.unwrap();
        assert_eq!(record.discussion_id, Some(res.id()));
    }

    #[tokio::test]
    async fn attachment_cannot_be_bound_twice() {
        let app = TestApp::spawn().await;
        let bob = app.create_user("bob1").await;
        let (attachment_id, _) = app.upload_png(&bob).await;
        let body = json!({"content": "Look at this picture", "attachment_id": attachment_id});

        let first = app.post_as(routes::DISCUSSIONS, &body, &bob).await;
        assert_eq!(first.status, 201);

        let second = app.post_as(routes::DISCUSSIONS, &body, &bob).await;
        assert_eq!(second.status, 409);
        assert_eq!(second.body["code"], "CONFLICT");

        let record = app.attachment_record(attachment_id).await.unwrap();
        assert_eq!(record.discussion_id, Some(first.id()));
        let list = app.get(routes::DISCUSSIONS).await;
        assert_eq!(list.ids(), vec![first.id()]);
    }
}

mod reclaim {
    use super::*;

    #[tokio::test]
    async fn bound_attachment_survives_any_retention_window() {
        let app = TestApp::spawn().await;
        let bob = app.create_user("bob1").await;
        let (attachment_id, name) = app.upload_png(&bob).await;
        app.post_as(
            routes::DISCUSSIONS,
            &json!({"content": "Bob's picture post", "attachment_id": attachment_id}),
            &bob,
        )
        .await;
        age(&app, attachment_id, chrono::Duration::days(30)).await;

        let report = reclaim_orphans(&app.db, &*app.attachments, chrono::Duration::zero())
            .await
            .unwrap();

        assert_eq!(report.removed, 0);
        assert!(app.attachment_record(attachment_id).await.is_some());
        assert!(app.attachment_blob_exists(&name).await);
    }

    #[tokio::test]
    async fn only_unbound_attachments_past_retention_are_removed() {
        let app = TestApp::spawn().await;
        let bob = app.create_user("bob1").await;
        let (old_id, old_name) = app.upload_png(&bob).await;
        let (young_id, young_name) = app.upload_png(&bob).await;
        age(&app, old_id, chrono::Duration::hours(2)).await;

        let report = reclaim_orphans(&app.db, &*app.attachments, chrono::Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(report.removed, 1);
        assert!(app.attachment_record(old_id).await.is_none());
        assert!(!app.attachment_blob_exists(&old_name).await);
        assert!(app.attachment_record(young_id).await.is_some());
        assert!(app.attachment_blob_exists(&young_name).await);
    }

    #[tokio::test]
    async fn reclaimed_attachment_can_no_longer_be_bound() {
        let app = TestApp::spawn().await;
        let bob = app.create_user("bob1").await;
        let (attachment_id, _) = app.upload_png(&bob).await;
        age(&app, attachment_id, chrono::Duration::hours(2)).await;
        reclaim_orphans(&app.db, &*app.attachments, chrono::Duration::hours(1))
            .await
            .unwrap();

        let res = app
            .post_as(
                routes::DISCUSSIONS,
                &json!({"content": "Too late for that file", "attachment_id": attachment_id}),
                &bob,
            )
            .await;

        assert_eq!(res.status, 404);
    }
}

mod serving {
    use super::*;

    #[tokio::test]
    async fn image_is_served_with_detected_type_and_etag() {
        let app = TestApp::spawn().await;
        let bob = app.create_user("bob1").await;
        let (_, name) = app.upload_png(&bob).await;

        let res = app.get(&routes::attachment_image(&name)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.headers["content-type"], "image/png");
        let etag = res.headers["etag"].to_str().unwrap().to_string();
        assert_eq!(etag, format!("\"{name}\""));

        let cached = app
            .get_with_header(&routes::attachment_image(&name), "If-None-Match", &etag)
            .await;
        assert_eq!(cached.status, 304);
    }

    #[tokio::test]
    async fn unknown_or_malformed_names_are_not_found() {
        let app = TestApp::spawn().await;

        for name in ["0123456789abcdef0123456789abcdef", "..%2F..%2Fconfig"] {
            let res = app.get(&routes::attachment_image(name)).await;
            assert_eq!(res.status, 404, "{name}");
        }
    }

    #[tokio::test]
    async fn record_lookup_by_name_matches_upload() {
        let app = TestApp::spawn().await;
        let bob = app.create_user("bob1").await;
        let (attachment_id, name) = app.upload_png(&bob).await;

        let record = app.attachment_by_name(&name).await.unwrap();

        assert_eq!(record.id, attachment_id);
        assert_eq!(record.file_type, "image/png");
    }
}
